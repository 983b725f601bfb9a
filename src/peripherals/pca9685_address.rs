//! pca9685_address.rs — validated 7-bit chip addresses and hex parsing
use core::str::FromStr;

pub const PCA9685_MIN_ADDRESS: u8 = 0x40;
pub const PCA9685_MAX_ADDRESS: u8 = PCA9685_MIN_ADDRESS + 62;
pub const PCA9685_DEFAULT_ADDRESS: u8 = PCA9685_MIN_ADDRESS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipAddressError {
    #[error("Chip address {address:#04x} is outside 0x40..=0x7E")]
    OutOfRange { address: u8 },
    #[error("Chip address is not one or two hex digits")]
    InvalidHex,
}

/// 7-bit bus address of one PWM chip, always within [0x40, 0x7E].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipAddress(u8);

impl ChipAddress {
    pub const DEFAULT: ChipAddress = ChipAddress(PCA9685_DEFAULT_ADDRESS);

    pub const fn new(address: u8) -> Result<Self, ChipAddressError> {
        if address < PCA9685_MIN_ADDRESS || address > PCA9685_MAX_ADDRESS {
            return Err(ChipAddressError::OutOfRange { address });
        }
        Ok(Self(address))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for ChipAddress {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<ChipAddress> for u8 {
    fn from(address: ChipAddress) -> Self {
        address.0
    }
}

impl TryFrom<u8> for ChipAddress {
    type Error = ChipAddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for ChipAddress {
    type Err = ChipAddressError;

    /// Accepts `"0x40"`, `"40"` or `"4a"`: an optional `0x` prefix and one or two hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || digits.len() > 2 {
            return Err(ChipAddressError::InvalidHex);
        }
        let value = u8::from_str_radix(digits, 16).map_err(|_| ChipAddressError::InvalidHex)?;
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds() {
        assert_eq!(ChipAddress::new(0x40).unwrap().get(), 0x40);
        assert_eq!(ChipAddress::new(0x7E).unwrap().get(), 0x7E);
        assert_eq!(
            ChipAddress::new(0x3F),
            Err(ChipAddressError::OutOfRange { address: 0x3F })
        );
        assert_eq!(
            ChipAddress::try_from(0x7F),
            Err(ChipAddressError::OutOfRange { address: 0x7F })
        );
    }

    #[test]
    fn parses_hex_strings() {
        assert_eq!("0x40".parse::<ChipAddress>().unwrap().get(), 0x40);
        assert_eq!("41".parse::<ChipAddress>().unwrap().get(), 0x41);
        assert_eq!("4A".parse::<ChipAddress>().unwrap().get(), 0x4A);
        assert_eq!(" 0X7e ".parse::<ChipAddress>().unwrap().get(), 0x7E);
    }

    #[test]
    fn rejects_bad_strings() {
        assert_eq!("".parse::<ChipAddress>(), Err(ChipAddressError::InvalidHex));
        assert_eq!("0x".parse::<ChipAddress>(), Err(ChipAddressError::InvalidHex));
        assert_eq!("0x140".parse::<ChipAddress>(), Err(ChipAddressError::InvalidHex));
        assert_eq!("zz".parse::<ChipAddress>(), Err(ChipAddressError::InvalidHex));
        assert_eq!(
            "0x20".parse::<ChipAddress>(),
            Err(ChipAddressError::OutOfRange { address: 0x20 })
        );
    }
}
