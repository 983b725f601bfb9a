//! servo.rs — per-channel servo calibration and last commanded position

/// Pulse width in tenths of a millisecond (5.0 = 0.5 ms).
pub type PulseTime = f32;

pub const SERVO_DEFAULT_MIN_OFFSET: PulseTime = 5.0;
pub const SERVO_DEFAULT_MID_OFFSET: PulseTime = 15.0;
pub const SERVO_DEFAULT_MAX_OFFSET: PulseTime = 25.0;

pub const SERVO_MAX_ANGLE: u8 = 180;
pub const SERVO_MAX_SPEED: i8 = 100;

/// Angle used as the starting point for relative moves on a servo with no standard position.
pub const SERVO_DEFAULT_ANGLE: u8 = 90;

/// Last value commanded to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Position {
    #[default]
    Unset,
    /// Angle in degrees, 0..=180.
    Standard(u8),
    /// Signed speed in percent, -100..=100.
    Continuous(i8),
}

impl Position {
    pub fn angle(self) -> Option<u8> {
        match self {
            Position::Standard(angle) => Some(angle),
            _ => None,
        }
    }

    pub fn speed(self) -> Option<i8> {
        match self {
            Position::Continuous(speed) => Some(speed),
            _ => None,
        }
    }
}

/// Pulse widths a servo expects at its end stops and at center/stop.
///
/// `min <= mid <= max` gives the usual direction of motion. Swapping `min` and
/// `max` is accepted and inverts the direction; nothing here reorders them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoCalibration {
    pub min: PulseTime,
    pub mid: PulseTime,
    pub max: PulseTime,
}

impl ServoCalibration {
    /// Store bounds as given; `mid` defaults to halfway between `min` and `max`.
    pub fn from_offsets(min: PulseTime, max: PulseTime, mid: Option<PulseTime>) -> Self {
        let mid = mid.unwrap_or((max - min) / 2.0 + min);
        Self { min, mid, max }
    }

    /// 0.5 ms / 1.5 ms / 2.5 ms, used for every channel until calibrated.
    pub const fn generic() -> Self {
        Self {
            min: SERVO_DEFAULT_MIN_OFFSET,
            mid: SERVO_DEFAULT_MID_OFFSET,
            max: SERVO_DEFAULT_MAX_OFFSET,
        }
    }

    /// Inland KS0209 Blue 9g Servo Motor
    pub const fn inland_ks0209() -> Self {
        Self {
            min: 10.0, // 1 ms
            mid: 15.0,
            max: 20.0, // 2 ms
        }
    }

    /// MakerHawk MG-995 DIGI Hi-Speed
    pub const fn makerhawk_mg995() -> Self {
        Self {
            min: 5.0,  // 0.5 ms
            mid: 15.0, // 1.5 ms
            max: 25.0, // 2.5 ms
        }
    }

    /// True when the bounds run in the usual `min <= mid <= max` order.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.mid && self.mid <= self.max
    }

    /// Negative or non-finite `min`/`max` become 0. A non-finite `mid` falls back to
    /// the midpoint of the cleaned bounds, a negative one to 0.
    pub fn sanitized(self) -> Self {
        let min = sanitize_pulse(self.min);
        let max = sanitize_pulse(self.max);
        let mid = if self.mid.is_finite() {
            self.mid.max(0.0)
        } else {
            (max - min) / 2.0 + min
        };
        Self { min, mid, max }
    }
}

fn sanitize_pulse(time: PulseTime) -> PulseTime {
    if time.is_finite() { time.max(0.0) } else { 0.0 }
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self::generic()
    }
}

/// One servo slot of a chip. `id` is the 1-based channel number.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    id: u8,
    pin: u8,
    calibration: ServoCalibration,
    position: Position,
}

impl ServoConfig {
    /// Default slot for channel `id`: wired to pin `id - 1`, generic calibration.
    pub const fn new(id: u8) -> Self {
        Self {
            id,
            pin: id.saturating_sub(1),
            calibration: ServoCalibration::generic(),
            position: Position::Unset,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn calibration(&self) -> &ServoCalibration {
        &self.calibration
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_pin(&mut self, pin: u8) {
        self.pin = pin;
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Replace the calibration bounds. Values are stored as-is, in pulse time units.
    pub fn set_offsets_from_freq(
        &mut self,
        min: PulseTime,
        max: PulseTime,
        mid: Option<PulseTime>,
    ) {
        self.calibration = ServoCalibration::from_offsets(min, max, mid);
    }

    pub fn set_calibration(&mut self, calibration: ServoCalibration) {
        self.calibration = calibration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_defaults() {
        let servo = ServoConfig::new(1);
        assert_eq!(servo.id(), 1);
        assert_eq!(servo.pin(), 0);
        assert_eq!(servo.position(), Position::Unset);
        assert_eq!(*servo.calibration(), ServoCalibration::generic());

        assert_eq!(ServoConfig::new(16).pin(), 15);
    }

    #[test]
    fn mid_defaults_to_midpoint() {
        let cal = ServoCalibration::from_offsets(10.0, 20.0, None);
        assert_eq!(cal.mid, 15.0);
        let cal = ServoCalibration::from_offsets(6.0, 25.0, None);
        assert_eq!(cal.mid, 15.5);
    }

    #[test]
    fn explicit_mid_is_kept() {
        let mut servo = ServoConfig::new(3);
        servo.set_offsets_from_freq(6.0, 24.0, Some(14.0));
        assert_eq!(
            *servo.calibration(),
            ServoCalibration {
                min: 6.0,
                mid: 14.0,
                max: 24.0
            }
        );
        assert!(servo.calibration().is_ordered());
    }

    #[test]
    fn inverted_bounds_are_stored() {
        let cal = ServoCalibration::from_offsets(25.0, 5.0, None);
        assert_eq!(cal.mid, 15.0);
        assert!(!cal.is_ordered());
    }

    #[test]
    fn sanitized_clears_negative_and_non_finite_bounds() {
        let cal = ServoCalibration::from_offsets(f32::NAN, f32::INFINITY, None).sanitized();
        assert_eq!(cal, ServoCalibration { min: 0.0, mid: 0.0, max: 0.0 });

        let cal = ServoCalibration::from_offsets(-3.0, 20.0, Some(f32::NAN)).sanitized();
        assert_eq!(cal, ServoCalibration { min: 0.0, mid: 10.0, max: 20.0 });

        let cal = ServoCalibration::from_offsets(5.0, 25.0, Some(-1.0)).sanitized();
        assert_eq!(cal.mid, 0.0);

        let preset = ServoCalibration::inland_ks0209();
        assert_eq!(preset.sanitized(), preset);
    }

    #[test]
    fn position_accessors() {
        assert_eq!(Position::Standard(45).angle(), Some(45));
        assert_eq!(Position::Standard(45).speed(), None);
        assert_eq!(Position::Continuous(-20).speed(), Some(-20));
        assert_eq!(Position::Unset.angle(), None);
    }
}
