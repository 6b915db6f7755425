//! Client for a shared pixel canvas behind a rate-limited HTTP API.
//!
//! ```no_run
//! # fn main() -> pixelpost::Result<()> {
//! let mut client = pixelpost::Client::new("my-token")?;
//! client.set_pixel(12, 34, "FF8800")?;
//! assert_eq!(client.get_pixel(12, 34)?.value(), 0xFF8800);
//! # Ok(()) }
//! ```
//!
//! Each API call waits until the server reports quota for its endpoint, so a
//! long session simply slows down instead of getting rejected.

#[macro_use]
extern crate tracing;

mod client;
mod error;
mod picture;
pub mod ratelimit;

pub use self::{
    client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, WriteOutcome},
    error::{Error, Result},
    picture::{CancelToken, Order, PictureSource, UploadOptions, UploadReport},
    ratelimit::{Endpoint, RateLimitState},
};
pub use image;
pub use pixelpost_common::{ColorError, MAX_COLOR, Pixel, PixelColor, Size};
