use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};

/// Largest value a 24-bit RGB color can hold.
pub const MAX_COLOR: u32 = 0xFF_FF_FF;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    #[error("color value {0} does not fit in 24 bits")]
    OutOfRange(i64),
    #[error("malformed hex color {0:?}, expected up to 6 hex digits")]
    Malformed(String),
}

/// A 24-bit RGB color.
///
/// On the wire this is always exactly six uppercase hex digits (`RRGGBB`).
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PixelColor(u32);

impl PixelColor {
    pub const BLACK: Self = Self(0);
    pub const WHITE: Self = Self(MAX_COLOR);

    pub fn from_u32(value: u32) -> Result<Self, ColorError> {
        if value > MAX_COLOR {
            return Err(ColorError::OutOfRange(value.into()));
        }

        Ok(Self(value))
    }

    #[inline]
    pub const fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    #[inline]
    pub const fn rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PixelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

impl FromStr for PixelColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        // from_str_radix would also take a leading sign
        if digits.is_empty() || digits.len() > 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(ColorError::Malformed(s.to_owned()));
        }

        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| ColorError::Malformed(s.to_owned()))
    }
}

impl From<[u8; 3]> for PixelColor {
    fn from(rgb: [u8; 3]) -> Self {
        Self::from_rgb(rgb)
    }
}

impl From<PixelColor> for [u8; 3] {
    fn from(color: PixelColor) -> Self {
        color.rgb()
    }
}

impl TryFrom<&str> for PixelColor {
    type Error = ColorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for PixelColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

macro_rules! impl_try_from_int {
    ($($ty:ty),*) => {$(
        impl TryFrom<$ty> for PixelColor {
            type Error = ColorError;

            fn try_from(value: $ty) -> Result<Self, Self::Error> {
                u32::try_from(value)
                    .ok()
                    .filter(|value| *value <= MAX_COLOR)
                    .map(Self)
                    .ok_or(ColorError::OutOfRange(value as i64))
            }
        }
    )*};
}

impl_try_from_int!(i32, i64, u32);

impl Serialize for PixelColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PixelColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
