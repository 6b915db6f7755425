use crate::ratelimit::Endpoint;
use pixelpost_common::ColorError;
use std::{convert::Infallible, time::Duration};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server refused the request because its cooldown is active.
    #[error("rate limited on {endpoint}, retry in {:.1}s", .retry_after.as_secs_f64())]
    RateLimited {
        endpoint: Endpoint,
        retry_after: Duration,
    },
    /// Coordinates or picture placement fall outside the canvas.
    #[error("({x}, {y}) is outside of the {width}x{height} canvas")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
    #[error("invalid color: {0}")]
    InvalidColor(#[from] ColorError),
    /// The picture source could not be fetched or decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("scale must be a positive integer, got {0}")]
    InvalidScale(i64),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status that carried no cooldown information.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
