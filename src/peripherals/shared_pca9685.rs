//! shared_pca9685.rs — one lock around a driver for callers on several tasks or cores
use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use super::diagnostics::NoDiagnostics;
use super::pca9685_driver::{PCA9685_DEFAULT_REGISTRY_CAPACITY, Pca9685Driver};

/// A [`Pca9685Driver`] behind a single blocking mutex.
///
/// Every operation runs with the lock held, so the chip registry, the servo slots
/// and the bus are only touched by one caller at a time. Use
/// `CriticalSectionRawMutex` when sharing across interrupts or cores.
///
/// ```ignore
/// type Servos = SharedPca9685<CriticalSectionRawMutex, I2c<'static, I2C0, Blocking>, Delay>;
/// static SERVOS: StaticCell<Servos> = StaticCell::new();
/// let servos = SERVOS.init(SharedPca9685::new(Pca9685Driver::new(i2c, Delay)));
/// servos.lock(|driver| driver.set_standard_servo_angle(1, 45, 0x40))?;
/// ```
pub struct SharedPca9685<
    M: RawMutex,
    I,
    D,
    L = NoDiagnostics,
    const CHIPS: usize = PCA9685_DEFAULT_REGISTRY_CAPACITY,
> {
    driver: Mutex<M, RefCell<Pca9685Driver<I, D, L, CHIPS>>>,
}

impl<M: RawMutex, I, D, L, const CHIPS: usize> SharedPca9685<M, I, D, L, CHIPS> {
    pub const fn new(driver: Pca9685Driver<I, D, L, CHIPS>) -> Self {
        Self {
            driver: Mutex::new(RefCell::new(driver)),
        }
    }

    /// Run `f` with exclusive access to the driver.
    ///
    /// Calling `lock` again from inside `f` panics.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Pca9685Driver<I, D, L, CHIPS>) -> R) -> R {
        self.driver.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn into_inner(self) -> Pca9685Driver<I, D, L, CHIPS> {
        self.driver.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::servo::Position;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn operations_share_one_registry() {
        let expectations = [
            I2cTransaction::write(0x40, vec![0x00, 0x11]),
            I2cTransaction::write(0x40, vec![0xFE, 121]),
            I2cTransaction::write(0x40, vec![0xFA, 0x00]),
            I2cTransaction::write(0x40, vec![0xFB, 0x00]),
            I2cTransaction::write(0x40, vec![0xFC, 0x00]),
            I2cTransaction::write(0x40, vec![0xFD, 0x00]),
            I2cTransaction::write(0x40, vec![0x00, 0x01]),
            I2cTransaction::write(0x40, vec![0x00, 0x81]),
            I2cTransaction::write(0x40, vec![0x06, 0x00]),
            I2cTransaction::write(0x40, vec![0x07, 0x00]),
            I2cTransaction::write(0x40, vec![0x08, 0x66]),
            I2cTransaction::write(0x40, vec![0x09, 0x00]),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut handle = i2c.clone();
        let shared: SharedPca9685<NoopRawMutex, _, _> =
            SharedPca9685::new(Pca9685Driver::new(i2c, NoopDelay::new()));

        shared
            .lock(|driver| driver.set_standard_servo_angle(1, 0, 0x40))
            .unwrap();
        let position = shared.lock(|driver| {
            driver
                .get_chip_config(0x40)
                .map(|chip| chip.servo(1).position())
        });
        assert_eq!(position.unwrap(), Position::Standard(0));

        drop(shared.into_inner());
        handle.done();
    }
}
