mod diagnostics;
mod pca9685_address;
mod pca9685_chip;
mod pca9685_driver;
mod pca9685_registers;
mod servo;
mod servo_pulse;
mod shared_pca9685;

pub use diagnostics::*;
pub use pca9685_address::*;
pub use pca9685_chip::*;
pub use pca9685_driver::*;
pub use pca9685_registers::*;
pub use servo::*;
pub use servo_pulse::*;
pub use shared_pca9685::*;
