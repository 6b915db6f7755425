use serde::{Deserialize, Serialize};

mod color;

pub use self::color::{ColorError, MAX_COLOR, PixelColor};

/// Body of a pixel write, and the position of a pixel on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    #[serde(rename = "rgb")]
    pub color: PixelColor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Whether `(x, y)` addresses a pixel of a canvas this size.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y)
    }

    /// Byte length of the raw RGB dump of a canvas this size.
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Response of a single pixel read.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PixelReading {
    pub rgb: PixelColor,
}
