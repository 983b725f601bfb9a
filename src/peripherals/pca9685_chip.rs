//! pca9685_chip.rs — per-chip configuration and the sleep/prescale/wake/restart bring-up
use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::pca9685_address::ChipAddress;
use super::pca9685_registers::{
    MODE1_RESTART, MODE1_SLEEP, MODE1_WAKE, PCA9685_CHANNELS, PCA9685_OSCILLATOR_SETTLE_US,
    Register, clamp_frequency, prescale_for, write_register,
};
use super::servo::ServoConfig;

/// Where a registered chip is in its bring-up.
///
/// Unregistered chips have no [`ChipConfig`] at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipState {
    /// Oscillator stopped; the prescaler may be written.
    Asleep,
    /// Sleep bit cleared, restart not yet written.
    Awake,
    /// Oscillator running and PWM outputs restarted.
    Running,
}

/// Operating frequency and 16 servo slots of one chip.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipConfig {
    address: ChipAddress,
    frequency: u16,
    state: ChipState,
    servos: [ServoConfig; PCA9685_CHANNELS],
}

impl ChipConfig {
    pub(crate) fn new(address: ChipAddress, frequency: u16) -> Self {
        let mut id = 0u8;
        let servos = [(); PCA9685_CHANNELS].map(|_| {
            id += 1;
            ServoConfig::new(id)
        });
        Self {
            address,
            frequency: clamp_frequency(frequency),
            state: ChipState::Asleep,
            servos,
        }
    }

    pub fn address(&self) -> ChipAddress {
        self.address
    }

    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    pub fn state(&self) -> ChipState {
        self.state
    }

    pub fn servos(&self) -> &[ServoConfig; PCA9685_CHANNELS] {
        &self.servos
    }

    /// Servo slot for a 1-based channel; out of range channels are clamped to 1..=16.
    pub fn servo(&self, channel: u8) -> &ServoConfig {
        &self.servos[channel_index(channel)]
    }

    pub(crate) fn servo_mut(&mut self, channel: u8) -> &mut ServoConfig {
        &mut self.servos[channel_index(channel)]
    }

    pub(crate) fn set_frequency(&mut self, frequency: u16) {
        self.frequency = clamp_frequency(frequency);
    }

    pub(crate) fn set_state(&mut self, state: ChipState) {
        self.state = state;
    }
}

/// Clamp a 1-based channel number to 1..=16.
pub fn clamp_channel(channel: u8) -> u8 {
    channel.clamp(1, PCA9685_CHANNELS as u8)
}

fn channel_index(channel: u8) -> usize {
    (clamp_channel(channel) - 1) as usize
}

/// Bring-up step marker: MODE1 has the sleep bit set.
pub struct Asleep;
/// Bring-up step marker: sleep bit cleared, waiting for restart.
pub struct Awake;

/// A chip part way through bring-up.
///
/// The prescaler can only be written from [`Asleep`], which is the chip's own
/// requirement for PRESCALE.
pub struct BringUp<'a, I, S> {
    i2c: &'a mut I,
    address: u8,
    _state: PhantomData<S>,
}

impl<'a, I: I2c> BringUp<'a, I, Asleep> {
    /// Put the chip to sleep (MODE1 = sleep).
    pub fn sleep(i2c: &'a mut I, address: ChipAddress) -> Result<Self, I::Error> {
        let address = address.get();
        write_register(i2c, address, Register::Mode1.addr(), MODE1_SLEEP)?;
        Ok(Self {
            i2c,
            address,
            _state: PhantomData,
        })
    }

    pub fn write_prescale(&mut self, frequency_hz: u16) -> Result<u8, I::Error> {
        let prescale = prescale_for(frequency_hz);
        write_register(self.i2c, self.address, Register::Prescale.addr(), prescale)?;
        Ok(prescale)
    }

    /// Zero the broadcast on/off registers, turning every channel off.
    pub fn clear_all_channels(&mut self) -> Result<(), I::Error> {
        for register in [
            Register::AllLedOnL,
            Register::AllLedOnH,
            Register::AllLedOffL,
            Register::AllLedOffH,
        ] {
            write_register(self.i2c, self.address, register.addr(), 0x00)?;
        }
        Ok(())
    }

    /// Clear the sleep bit and wait for the oscillator to settle.
    pub fn wake<D: DelayNs>(self, delay: &mut D) -> Result<BringUp<'a, I, Awake>, I::Error> {
        write_register(self.i2c, self.address, Register::Mode1.addr(), MODE1_WAKE)?;
        delay.delay_us(PCA9685_OSCILLATOR_SETTLE_US);
        Ok(BringUp {
            i2c: self.i2c,
            address: self.address,
            _state: PhantomData,
        })
    }
}

impl<I: I2c> BringUp<'_, I, Awake> {
    /// Set the restart bit so previously running PWM resumes.
    pub fn restart(self) -> Result<(), I::Error> {
        write_register(self.i2c, self.address, Register::Mode1.addr(), MODE1_RESTART)
    }
}

/// Full initialization: sleep, prescale, clear, wake, settle, restart.
///
/// `chip.state` is updated after each phase (asleep, awake, running), so a bus
/// failure part way leaves it at the last phase that completed.
pub fn initialize_chip<I: I2c, D: DelayNs>(
    i2c: &mut I,
    delay: &mut D,
    chip: &mut ChipConfig,
) -> Result<(), I::Error> {
    let mut asleep = BringUp::sleep(i2c, chip.address())?;
    chip.set_state(ChipState::Asleep);
    let prescale = asleep.write_prescale(chip.frequency())?;
    debug!(
        "PCA9685 {=u8:#x}: {=u16} Hz, prescale {=u8}",
        chip.address().get(),
        chip.frequency(),
        prescale
    );
    asleep.clear_all_channels()?;
    let awake = asleep.wake(delay)?;
    chip.set_state(ChipState::Awake);
    awake.restart()?;
    chip.set_state(ChipState::Running);
    Ok(())
}
