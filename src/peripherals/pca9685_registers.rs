//! pca9685_registers.rs — register map and byte-level encoding for PCA9685-class chips
use embedded_hal::i2c::I2c;

/// Number of PWM channels on one chip.
pub const PCA9685_CHANNELS: usize = 16;

/// Ticks per PWM period (12-bit counter).
pub const PCA9685_RESOLUTION: u16 = 4096;

/// Largest value a channel step register can hold.
pub const PCA9685_MAX_STEP: u16 = PCA9685_RESOLUTION - 1;

/// Internal oscillator feeding the prescaler.
pub const PCA9685_OSCILLATOR_HZ: u32 = 25_000_000;

pub const PCA9685_MIN_FREQUENCY_HZ: u16 = 40;
pub const PCA9685_MAX_FREQUENCY_HZ: u16 = 1000;
pub const PCA9685_DEFAULT_FREQUENCY_HZ: u16 = 50;

/// Oscillator settle time between wake and restart.
pub const PCA9685_OSCILLATOR_SETTLE_US: u32 = 1000;

/// MODE1 with ALLCALL set, the power-on default.
pub const MODE1_DEFAULT: u8 = 0x01;
pub const MODE1_SLEEP_BIT: u8 = 0x10;
pub const MODE1_RESTART_BIT: u8 = 0x80;
/// MODE2 power-on default (totem-pole outputs).
pub const MODE2_DEFAULT: u8 = 0x04;

pub const MODE1_SLEEP: u8 = MODE1_DEFAULT | MODE1_SLEEP_BIT;
pub const MODE1_WAKE: u8 = MODE1_DEFAULT & !MODE1_SLEEP_BIT;
pub const MODE1_RESTART: u8 = MODE1_WAKE | MODE1_RESTART_BIT;

/// Distance between two consecutive channel slots.
const CHANNEL_SLOT_STRIDE: u8 = 4;

/// Fixed registers of the chip. Channel slots are addressed through [`channel_slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Mode1,
    Mode2,
    Led0OnL,
    Led0OnH,
    Led0OffL,
    Led0OffH,
    AllLedOnL,
    AllLedOnH,
    AllLedOffL,
    AllLedOffH,
    Prescale,
}

impl Register {
    pub const fn addr(self) -> u8 {
        match self {
            Register::Mode1 => 0x00,
            Register::Mode2 => 0x01,
            Register::Led0OnL => 0x06,
            Register::Led0OnH => 0x07,
            Register::Led0OffL => 0x08,
            Register::Led0OffH => 0x09,
            Register::AllLedOnL => 0xFA,
            Register::AllLedOnH => 0xFB,
            Register::AllLedOffL => 0xFC,
            Register::AllLedOffH => 0xFD,
            Register::Prescale => 0xFE,
        }
    }
}

/// The four registers (on-low, on-high, off-low, off-high) of one channel, in write order.
pub const fn channel_slot(pin: u8) -> [u8; 4] {
    let base = Register::Led0OnL.addr() + CHANNEL_SLOT_STRIDE * clamp_pin(pin);
    [base, base + 1, base + 2, base + 3]
}

/// Split 12-bit on/off steps into the bytes of a channel slot.
pub const fn encode_steps(on_step: u16, off_step: u16) -> [u8; 4] {
    let on = clamp_step(on_step);
    let off = clamp_step(off_step);
    [
        (on & 0xFF) as u8,
        ((on >> 8) & 0x0F) as u8,
        (off & 0xFF) as u8,
        ((off >> 8) & 0x0F) as u8,
    ]
}

/// Inverse of [`encode_steps`]. Bits above the 12-bit counter are dropped.
pub const fn decode_steps(bytes: [u8; 4]) -> (u16, u16) {
    let on = (bytes[0] as u16) | (((bytes[1] & 0x0F) as u16) << 8);
    let off = (bytes[2] as u16) | (((bytes[3] & 0x0F) as u16) << 8);
    (on, off)
}

pub const fn clamp_pin(pin: u8) -> u8 {
    if pin > (PCA9685_CHANNELS - 1) as u8 {
        (PCA9685_CHANNELS - 1) as u8
    } else {
        pin
    }
}

pub const fn clamp_step(step: u16) -> u16 {
    if step > PCA9685_MAX_STEP {
        PCA9685_MAX_STEP
    } else {
        step
    }
}

/// Clamp a requested frequency into what the prescaler can produce.
pub fn clamp_frequency(frequency_hz: u16) -> u16 {
    frequency_hz.clamp(PCA9685_MIN_FREQUENCY_HZ, PCA9685_MAX_FREQUENCY_HZ)
}

/// Prescaler for a PWM frequency: `round(osc / (4096 * freq) - 1)`.
///
/// The frequency is clamped to [40, 1000] Hz first, so the result always fits the register.
pub fn prescale_for(frequency_hz: u16) -> u8 {
    let freq = clamp_frequency(frequency_hz) as f32;
    let raw = PCA9685_OSCILLATOR_HZ as f32 / (PCA9685_RESOLUTION as f32 * freq) - 1.0;
    libm::roundf(raw).clamp(0.0, u8::MAX as f32) as u8
}

/// Write a single register: one `[register, value]` I2C transfer.
pub fn write_register<I: I2c>(
    i2c: &mut I,
    address: u8,
    register: u8,
    value: u8,
) -> Result<(), I::Error> {
    i2c.write(address, &[register, value])
}

pub fn read_register<I: I2c>(i2c: &mut I, address: u8, register: u8) -> Result<u8, I::Error> {
    let mut value = [0u8; 1];
    i2c.write_read(address, &[register], &mut value)?;
    Ok(value[0])
}

/// Write one channel's on/off steps as four single-register writes.
///
/// The chip has no multi-register transaction: if a write fails part way the
/// channel's timing is undefined until the next complete write.
pub fn write_channel<I: I2c>(
    i2c: &mut I,
    address: u8,
    pin: u8,
    on_step: u16,
    off_step: u16,
) -> Result<(), I::Error> {
    let registers = channel_slot(pin);
    let bytes = encode_steps(on_step, off_step);
    for (register, value) in registers.into_iter().zip(bytes) {
        write_register(i2c, address, register, value)?;
    }
    Ok(())
}

pub fn read_channel<I: I2c>(i2c: &mut I, address: u8, pin: u8) -> Result<(u16, u16), I::Error> {
    let mut bytes = [0u8; 4];
    for (byte, register) in bytes.iter_mut().zip(channel_slot(pin)) {
        *byte = read_register(i2c, address, register)?;
    }
    Ok(decode_steps(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn mode_bytes() {
        assert_eq!(MODE1_SLEEP, 0x11);
        assert_eq!(MODE1_WAKE, 0x01);
        assert_eq!(MODE1_RESTART, 0x81);
    }

    #[test]
    fn channel_slots_are_four_apart() {
        assert_eq!(channel_slot(0), [0x06, 0x07, 0x08, 0x09]);
        assert_eq!(channel_slot(1), [0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(channel_slot(15), [0x42, 0x43, 0x44, 0x45]);
        // out of range pins land on the last channel
        assert_eq!(channel_slot(40), channel_slot(15));
    }

    #[test]
    fn full_off_step_encoding() {
        assert_eq!(encode_steps(0, 4095), [0x00, 0x00, 0xFF, 0x0F]);
        assert_eq!(encode_steps(0x123, 0x456), [0x23, 0x01, 0x56, 0x04]);
        assert_eq!(encode_steps(9000, 0), [0xFF, 0x0F, 0x00, 0x00]);
    }

    #[test]
    fn decode_masks_high_nibble() {
        assert_eq!(decode_steps([0x23, 0x01, 0x56, 0x04]), (0x123, 0x456));
        assert_eq!(decode_steps([0x00, 0x10, 0xFF, 0xFF]), (0, 4095));
    }

    #[test]
    fn prescale_depends_on_frequency_only() {
        assert_eq!(prescale_for(50), 121);
        assert_eq!(prescale_for(50), prescale_for(50));
        assert_eq!(prescale_for(60), 101);
        assert_eq!(prescale_for(1000), 5);
        assert_eq!(prescale_for(40), 152);
    }

    #[test]
    fn prescale_clamps_frequency() {
        assert_eq!(prescale_for(1), prescale_for(40));
        assert_eq!(prescale_for(u16::MAX), prescale_for(1000));
        assert_eq!(clamp_frequency(20), 40);
        assert_eq!(clamp_frequency(1500), 1000);
        assert_eq!(clamp_frequency(333), 333);
    }

    #[test]
    fn channel_write_order() {
        let expectations = [
            I2cTransaction::write(0x40, vec![0x0A, 0x00]),
            I2cTransaction::write(0x40, vec![0x0B, 0x00]),
            I2cTransaction::write(0x40, vec![0x0C, 0xFF]),
            I2cTransaction::write(0x40, vec![0x0D, 0x0F]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        write_channel(&mut i2c, 0x40, 1, 0, 4095).unwrap();
        i2c.done();
    }

    #[test]
    fn channel_write_stops_at_first_bus_error() {
        let expectations = [
            I2cTransaction::write(0x41, vec![0x06, 0x00]),
            I2cTransaction::write(0x41, vec![0x07, 0x00])
                .with_error(embedded_hal::i2c::ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let err = write_channel(&mut i2c, 0x41, 0, 0, 300).unwrap_err();
        assert_eq!(err, embedded_hal::i2c::ErrorKind::Other);
        i2c.done();
    }

    #[test]
    fn channel_read_back() {
        let expectations = [
            I2cTransaction::write_read(0x40, vec![0x06], vec![0x00]),
            I2cTransaction::write_read(0x40, vec![0x07], vec![0x00]),
            I2cTransaction::write_read(0x40, vec![0x08], vec![0x33]),
            I2cTransaction::write_read(0x40, vec![0x09], vec![0x01]),
        ];
        let mut i2c = I2cMock::new(&expectations);

        assert_eq!(read_channel(&mut i2c, 0x40, 0).unwrap(), (0, 307));
        i2c.done();
    }
}
