//! pca9685_driver.rs — servo and LED control across one or more PCA9685 chips on an I2C bus
//!
//! Chips are registered lazily: the first operation naming an address creates its
//! [`ChipConfig`] and runs the full bring-up at the default 50 Hz (or at the frequency
//! given to [`Pca9685Driver::init`]). Calibration lives in the driver and survives
//! [`Pca9685Driver::reset`].
//!
//! # Example
//!
//! ```ignore
//! let mut servos = Pca9685Driver::new(i2c, Delay);
//! servos.set_servo_limits(1, 6.0, 24.0, None, 0x40)?;
//! servos.set_standard_servo_angle(1, 90, 0x40)?;
//! servos.set_continuous_servo_speed(2, -50, 0x40)?;
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::diagnostics::{DiagnosticsSink, NoDiagnostics};
use super::pca9685_address::{ChipAddress, ChipAddressError};
use super::pca9685_chip::{ChipConfig, clamp_channel, initialize_chip};
use super::pca9685_registers::{
    PCA9685_DEFAULT_FREQUENCY_HZ, Register, clamp_pin, clamp_step, read_channel, read_register,
    write_channel,
};
use super::servo::{Position, PulseTime, SERVO_DEFAULT_ANGLE, ServoCalibration};
use super::servo_pulse::{
    clamp_angle, clamp_speed, continuous_servo_step, duty_cycle_step, standard_servo_step,
};
use crate::{HeaplessString, format_heapless};

/// Chips a driver can track unless a capacity is chosen explicitly.
pub const PCA9685_DEFAULT_REGISTRY_CAPACITY: usize = 4;

const TRACE_LINE_CHARS: usize = 96;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pca9685Error<E> {
    #[error("I2C transfer to PCA9685 failed")]
    Bus(E),
    #[error("Invalid chip address: {0}")]
    InvalidAddress(#[from] ChipAddressError),
    #[error("Chip registry is full: {capacity} chips already registered")]
    RegistryFull { capacity: usize },
}

pub struct Pca9685Driver<
    I,
    D,
    L = NoDiagnostics,
    const CHIPS: usize = PCA9685_DEFAULT_REGISTRY_CAPACITY,
> {
    i2c: I,
    delay: D,
    chips: heapless::Vec<ChipConfig, CHIPS>,
    diagnostics: L,
    debug_enabled: bool,
}

impl<I: I2c, D: DelayNs> Pca9685Driver<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_registry_capacity(i2c, delay)
    }

    /// Driver that can track up to `N` chips.
    pub fn with_registry_capacity<const N: usize>(
        i2c: I,
        delay: D,
    ) -> Pca9685Driver<I, D, NoDiagnostics, N> {
        Pca9685Driver {
            i2c,
            delay,
            chips: heapless::Vec::new(),
            diagnostics: NoDiagnostics,
            debug_enabled: false,
        }
    }
}

#[cfg(feature = "embassy")]
impl<I: I2c> Pca9685Driver<I, embassy_time::Delay> {
    pub fn new_with_embassy_delay(i2c: I) -> Self {
        Self::new(i2c, embassy_time::Delay)
    }
}

impl<I, D, L, const CHIPS: usize> Pca9685Driver<I, D, L, CHIPS>
where
    I: I2c,
    D: DelayNs,
    L: DiagnosticsSink,
{
    /// Send trace lines to `sink` instead. Registered chips are kept.
    pub fn with_diagnostics<L2: DiagnosticsSink>(self, sink: L2) -> Pca9685Driver<I, D, L2, CHIPS> {
        Pca9685Driver {
            i2c: self.i2c,
            delay: self.delay,
            chips: self.chips,
            diagnostics: sink,
            debug_enabled: self.debug_enabled,
        }
    }

    /// Turn tracing to the diagnostics sink on or off.
    pub fn set_debug(&mut self, enabled: bool) {
        self.debug_enabled = enabled;
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    /// Every chip registered so far, in registration order.
    pub fn chips(&self) -> impl Iterator<Item = &ChipConfig> {
        self.chips.iter()
    }

    /// Configuration for `address`, registering and initializing the chip at 50 Hz
    /// if this is the first time the address is used.
    pub fn get_chip_config(&mut self, address: u8) -> Result<&ChipConfig, Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        Ok(&self.chips[index])
    }

    /// (Re)initialize a chip at `frequency_hz`, clamped to [40, 1000] Hz.
    ///
    /// The new frequency is stored for later resets. Servo calibration is kept.
    pub fn init(&mut self, address: u8, frequency_hz: u16) -> Result<(), Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        self.trace(format_args!(
            "Init chip at address {:#04x} to {}Hz",
            address.get(),
            frequency_hz
        ));
        match self.find_chip(address) {
            Some(index) => {
                let chip = &mut self.chips[index];
                chip.set_frequency(frequency_hz);
                initialize_chip(&mut self.i2c, &mut self.delay, chip).map_err(Pca9685Error::Bus)
            }
            None => self.register_chip(address, frequency_hz).map(|_| ()),
        }
    }

    /// Re-run bring-up with the chip's stored frequency, keeping servo calibration.
    pub fn reset(&mut self, address: u8) -> Result<(), Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        match self.find_chip(address) {
            Some(index) => {
                let chip = &mut self.chips[index];
                info!("PCA9685 {=u8:#x}: reset at {=u16} Hz", address.get(), chip.frequency());
                initialize_chip(&mut self.i2c, &mut self.delay, chip).map_err(Pca9685Error::Bus)
            }
            // a fresh chip is initialized as part of registering it
            None => self.register_chip(address, PCA9685_DEFAULT_FREQUENCY_HZ).map(|_| ()),
        }
    }

    /// Write raw on/off steps to a pin (0..=15). Pin and steps are clamped.
    ///
    /// The address is validated but the chip is not registered.
    pub fn set_pin_pulse_range(
        &mut self,
        pin: u8,
        on_step: u16,
        off_step: u16,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        self.write_pin(address, clamp_pin(pin), clamp_step(on_step), clamp_step(off_step))
    }

    /// Drive LED `led` (1..=16) at `duty_percent` (0..=100) of the period.
    pub fn set_led_duty_cycle(
        &mut self,
        led: u8,
        duty_percent: u8,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        let pin = clamp_channel(led) - 1;
        self.write_pin(address, pin, 0, duty_cycle_step(duty_percent))
    }

    /// Move a positional servo to `angle` degrees, clamped to 0..=180.
    pub fn set_standard_servo_angle(
        &mut self,
        channel: u8,
        angle: i32,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        let angle = clamp_angle(angle);
        let chip = &mut self.chips[index];
        let chip_address = chip.address();
        let frequency = chip.frequency();
        let servo = chip.servo_mut(channel);
        let step = standard_servo_step(frequency, servo.calibration(), angle);
        servo.set_position(Position::Standard(angle));
        let pin = servo.pin();
        self.write_pin(chip_address, pin, 0, step)
    }

    /// Run a continuous-rotation servo at `speed` percent, clamped to -100..=100.
    /// Zero stops it at the calibrated mid pulse.
    pub fn set_continuous_servo_speed(
        &mut self,
        channel: u8,
        speed: i32,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        let speed = clamp_speed(speed);
        let chip = &mut self.chips[index];
        let chip_address = chip.address();
        let frequency = chip.frequency();
        let servo = chip.servo_mut(channel);
        let step = continuous_servo_step(frequency, servo.calibration(), speed);
        servo.set_position(Position::Continuous(speed));
        let pin = servo.pin();
        self.write_pin(chip_address, pin, 0, step)
    }

    /// Turn a positional servo by `delta` degrees from its last angle (90 if none).
    pub fn change_standard_servo_angle(
        &mut self,
        channel: u8,
        delta: i32,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        let current = self.chips[index]
            .servo(channel)
            .position()
            .angle()
            .unwrap_or(SERVO_DEFAULT_ANGLE);
        self.set_standard_servo_angle(channel, i32::from(current).saturating_add(delta), address)
    }

    /// Change a continuous servo's speed by `delta` percent from its last speed (0 if none).
    pub fn change_continuous_servo_speed(
        &mut self,
        channel: u8,
        delta: i32,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        let current = self.chips[index].servo(channel).position().speed().unwrap_or(0);
        self.set_continuous_servo_speed(channel, i32::from(current).saturating_add(delta), address)
    }

    /// Replace a channel's calibration. Negative or non-finite bounds become 0; `mid`
    /// defaults to the midpoint. Bounds in reverse order are kept and invert the servo's motion.
    pub fn set_servo_limits(
        &mut self,
        channel: u8,
        min: PulseTime,
        max: PulseTime,
        mid: Option<PulseTime>,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let bounds = ServoCalibration::from_offsets(min, max, None).sanitized();
        let calibration = ServoCalibration::from_offsets(bounds.min, bounds.max, mid);
        self.set_servo_calibration(channel, calibration, address)
    }

    /// Apply a whole calibration, e.g. one of the [`ServoCalibration`] presets.
    ///
    /// Stored through [`ServoCalibration::sanitized`], like [`Self::set_servo_limits`].
    pub fn set_servo_calibration(
        &mut self,
        channel: u8,
        calibration: ServoCalibration,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        let channel = clamp_channel(channel);
        let calibration = calibration.sanitized();
        self.chips[index].servo_mut(channel).set_calibration(calibration);
        if !calibration.is_ordered() {
            warn!(
                "servo {=u8}: limits {=f32}/{=f32}/{=f32} are not ascending",
                channel,
                calibration.min,
                calibration.mid,
                calibration.max
            );
        }
        self.trace(format_args!(
            "setServoLimits({}, {}, {}, {}, {:#04x})",
            channel,
            calibration.min,
            calibration.max,
            calibration.mid,
            address
        ));
        Ok(())
    }

    /// Route a channel to a different physical pin (clamped to 0..=15).
    pub fn set_servo_pin(
        &mut self,
        channel: u8,
        pin: u8,
        address: u8,
    ) -> Result<(), Pca9685Error<I::Error>> {
        let index = self.chip_index(address)?;
        self.chips[index].servo_mut(channel).set_pin(clamp_pin(pin));
        Ok(())
    }

    /// Read back the on/off steps of a pin.
    pub fn read_pin_pulse_range(
        &mut self,
        pin: u8,
        address: u8,
    ) -> Result<(u16, u16), Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        read_channel(&mut self.i2c, address.get(), clamp_pin(pin)).map_err(Pca9685Error::Bus)
    }

    pub fn read_register(
        &mut self,
        address: u8,
        register: Register,
    ) -> Result<u8, Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        read_register(&mut self.i2c, address.get(), register.addr()).map_err(Pca9685Error::Bus)
    }

    fn find_chip(&self, address: ChipAddress) -> Option<usize> {
        self.chips.iter().position(|chip| chip.address() == address)
    }

    fn chip_index(&mut self, address: u8) -> Result<usize, Pca9685Error<I::Error>> {
        let address = ChipAddress::new(address)?;
        match self.find_chip(address) {
            Some(index) => {
                self.trace(format_args!("Returning chip {}", index));
                Ok(index)
            }
            None => self.register_chip(address, PCA9685_DEFAULT_FREQUENCY_HZ),
        }
    }

    /// Create and initialize a chip. It is only added once bring-up succeeded.
    fn register_chip(
        &mut self,
        address: ChipAddress,
        frequency_hz: u16,
    ) -> Result<usize, Pca9685Error<I::Error>> {
        if self.chips.is_full() {
            return Err(Pca9685Error::RegistryFull { capacity: CHIPS });
        }
        self.trace(format_args!("Creating new chip for address {:#04x}", address.get()));

        let mut chip = ChipConfig::new(address, frequency_hz);
        initialize_chip(&mut self.i2c, &mut self.delay, &mut chip).map_err(Pca9685Error::Bus)?;
        info!("PCA9685 {=u8:#x}: registered at {=u16} Hz", address.get(), chip.frequency());

        let index = self.chips.len();
        self.chips
            .push(chip)
            .map_err(|_| Pca9685Error::RegistryFull { capacity: CHIPS })?;
        Ok(index)
    }

    fn write_pin(
        &mut self,
        address: ChipAddress,
        pin: u8,
        on_step: u16,
        off_step: u16,
    ) -> Result<(), Pca9685Error<I::Error>> {
        self.trace(format_args!(
            "setPinPulseRange({}, {}, {}, {:#04x})",
            pin,
            on_step,
            off_step,
            address.get()
        ));
        write_channel(&mut self.i2c, address.get(), pin, on_step, off_step)
            .map_err(Pca9685Error::Bus)
    }

    fn trace(&mut self, args: core::fmt::Arguments<'_>) {
        if !self.debug_enabled {
            return;
        }
        let line: HeaplessString<TRACE_LINE_CHARS> = format_heapless(args);
        self.diagnostics.log(&line);
    }
}
