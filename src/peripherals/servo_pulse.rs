//! servo_pulse.rs — convert angles, speeds and duty cycles into 12-bit step counts
use super::pca9685_registers::{PCA9685_MAX_STEP, PCA9685_RESOLUTION};
use super::servo::{PulseTime, SERVO_MAX_ANGLE, SERVO_MAX_SPEED, ServoCalibration};

/// Pulse time units per PWM period second (pulse time is in 0.1 ms).
const PULSE_TIME_UNITS_PER_SECOND: f32 = 10_000.0;

/// Register count for a pulse of `time` at `frequency_hz`.
pub fn frequency_offset(frequency_hz: u16, time: PulseTime) -> f32 {
    time * PCA9685_RESOLUTION as f32 * frequency_hz as f32 / PULSE_TIME_UNITS_PER_SECOND
}

/// Clamp a fractional count into [0, 4095] and drop the fraction. NaN becomes 0.
pub fn to_step(count: f32) -> u16 {
    count.clamp(0.0, PCA9685_MAX_STEP as f32) as u16
}

pub fn clamp_angle(angle: i32) -> u8 {
    angle.clamp(0, SERVO_MAX_ANGLE as i32) as u8
}

pub fn clamp_speed(speed: i32) -> i8 {
    speed.clamp(-(SERVO_MAX_SPEED as i32), SERVO_MAX_SPEED as i32) as i8
}

/// Off step for a positional servo at `angle` degrees.
///
/// Interpolates between the `min` and `max` calibration counts and never leaves
/// that interval, whichever way round the bounds are. Non-finite bounds give step 0.
pub fn standard_servo_step(frequency_hz: u16, calibration: &ServoCalibration, angle: u8) -> u16 {
    let angle = angle.min(SERVO_MAX_ANGLE) as f32;
    let start = frequency_offset(frequency_hz, calibration.min);
    let end = frequency_offset(frequency_hz, calibration.max);
    let spread = end - start;
    let count = start + angle * spread / SERVO_MAX_ANGLE as f32;
    // max/min instead of clamp: NaN bounds must not panic
    to_step(count.max(start.min(end)).min(start.max(end)))
}

/// Off step for a continuous-rotation servo at `speed` percent.
///
/// Zero is the calibrated `mid` pulse. Reverse scales toward `min`, forward toward `max`.
pub fn continuous_servo_step(frequency_hz: u16, calibration: &ServoCalibration, speed: i8) -> u16 {
    let speed = speed.clamp(-SERVO_MAX_SPEED, SERVO_MAX_SPEED);
    let mid = frequency_offset(frequency_hz, calibration.mid);
    if speed == 0 {
        return to_step(mid);
    }

    let fraction = speed.unsigned_abs() as f32 / SERVO_MAX_SPEED as f32;
    let count = if speed < 0 {
        let spread = mid - frequency_offset(frequency_hz, calibration.min);
        mid - fraction * spread
    } else {
        let spread = frequency_offset(frequency_hz, calibration.max) - mid;
        mid + fraction * spread
    };
    to_step(count)
}

/// Off step for an LED-style duty cycle in percent (0..=100).
pub fn duty_cycle_step(duty_percent: u8) -> u16 {
    let duty = duty_percent.min(100) as u32;
    (duty * PCA9685_MAX_STEP as u32 / 100) as u16
}
