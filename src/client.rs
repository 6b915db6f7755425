//! Blocking client for the canvas API.
//!
//! Every rate-limited call goes through [`Client::gated`], which sleeps until
//! the endpoint has quota, sends the request and records the quota headers of
//! the response.

use crate::{
    error::{Error, Result},
    ratelimit::{Endpoint, RateLimitState, RateLimiter},
};
use image::{ImageBuffer, RgbImage};
use pixelpost_common::{Pixel, PixelColor, PixelReading, Size};
use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

pub const DEFAULT_BASE_URL: &str = "https://pixels.pythondiscord.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SIZE_PATH: &str = "/get_size";

/// Result of a pixel write request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The canvas already had the requested color, nothing was sent.
    Unchanged,
}

pub struct ClientBuilder {
    token: String,
    base_url: String,
    user_agent: String,
    timeout: Duration,
    skip_unchanged: bool,
}

impl ClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read each pixel before writing it and skip writes that change nothing.
    ///
    /// Enabled by default. Costs a read per write but saves write quota.
    pub fn skip_unchanged(mut self, skip_unchanged: bool) -> Self {
        self.skip_unchanged = skip_unchanged;
        self
    }

    pub fn build(self) -> Result<Client> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()?;

        Ok(Client {
            http,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            token: self.token,
            limiter: RateLimiter::new(),
            skip_unchanged: self.skip_unchanged,
        })
    }
}

/// Rate-limited client for a single canvas.
pub struct Client {
    http: reqwest::blocking::Client,
    base_url: String,
    token: String,
    limiter: RateLimiter,
    skip_unchanged: bool,
}

impl Client {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::builder(token).build()
    }

    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: format!("pixelpost/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
            skip_unchanged: true,
        }
    }

    /// Fetch the canvas dimensions. This endpoint is not rate-limited.
    pub fn size(&self) -> Result<Size> {
        debug!("fetching canvas size");
        let response = self
            .http
            .get(self.url(SIZE_PATH))
            .bearer_auth(&self.token)
            .send()?;

        decode_json(check_status(response)?)
    }

    pub fn get_pixel(&mut self, x: i64, y: i64) -> Result<PixelColor> {
        let (x, y) = self.locate(x, y)?;
        self.read_pixel(x, y)
    }

    /// Paint a single pixel.
    ///
    /// `color` may be a [`PixelColor`], an integer or a hex string. Invalid
    /// colors are rejected before anything is sent.
    pub fn set_pixel<C>(&mut self, x: i64, y: i64, color: C) -> Result<WriteOutcome>
    where
        C: TryInto<PixelColor>,
        Error: From<C::Error>,
    {
        let color = color.try_into()?;
        let (x, y) = self.locate(x, y)?;

        self.write_if_changed(Pixel { x, y, color })
    }

    /// Fetch the whole canvas, scaled up by an integer factor.
    pub fn canvas(&mut self, scale: i64) -> Result<RgbImage> {
        let factor = u32::try_from(scale)
            .ok()
            .filter(|factor| *factor >= 1)
            .ok_or(Error::InvalidScale(scale))?;

        let request = self.http.get(self.url(Endpoint::GetPixels.path()));
        let bytes = self.gated(Endpoint::GetPixels, request)?.bytes()?;
        let size = self.size()?;

        if bytes.len() != size.rgb_len() {
            return Err(Error::Decode(format!(
                "expected {} canvas bytes for {}x{}, got {}",
                size.rgb_len(),
                size.width,
                size.height,
                bytes.len()
            )));
        }

        let canvas = RgbImage::from_raw(size.width, size.height, bytes.to_vec())
            .ok_or_else(|| Error::Decode("canvas bytes do not form an image".into()))?;
        if factor == 1 {
            return Ok(canvas);
        }

        let (width, height) = size
            .width
            .checked_mul(factor)
            .zip(size.height.checked_mul(factor))
            .ok_or(Error::InvalidScale(scale))?;

        // integer factor, so nearest neighbour is plain block replication
        Ok(ImageBuffer::from_fn(width, height, |x, y| {
            *canvas.get_pixel(x / factor, y / factor)
        }))
    }

    /// Last known quota of every rate-limited endpoint.
    pub fn limits(&self) -> BTreeMap<Endpoint, RateLimitState> {
        self.limiter.snapshot()
    }

    /// Write `pixel` unless the canvas already shows its color.
    ///
    /// Coordinates are not validated here.
    pub(crate) fn write_if_changed(&mut self, pixel: Pixel) -> Result<WriteOutcome> {
        if self.skip_unchanged && self.read_pixel(pixel.x, pixel.y)? == pixel.color {
            trace!(x = pixel.x, y = pixel.y, color = %pixel.color, "pixel unchanged");
            return Ok(WriteOutcome::Unchanged);
        }

        let request = self
            .http
            .post(self.url(Endpoint::SetPixel.path()))
            .json(&pixel);
        self.gated(Endpoint::SetPixel, request)?;
        debug!(x = pixel.x, y = pixel.y, color = %pixel.color, "pixel written");

        Ok(WriteOutcome::Written)
    }

    pub(crate) fn http(&self) -> &reqwest::blocking::Client {
        &self.http
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Result<PixelColor> {
        let request = self
            .http
            .get(self.url(Endpoint::GetPixel.path()))
            .query(&[("x", x), ("y", y)]);
        let reading: PixelReading = decode_json(self.gated(Endpoint::GetPixel, request)?)?;

        Ok(reading.rgb)
    }

    /// Check `(x, y)` against the current canvas size.
    fn locate(&self, x: i64, y: i64) -> Result<(u32, u32)> {
        let size = self.size()?;
        if !size.contains(x, y) {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: size.width,
                height: size.height,
            });
        }

        // contains() guarantees both fit
        Ok((x as u32, y as u32))
    }

    fn gated(&mut self, endpoint: Endpoint, request: RequestBuilder) -> Result<Response> {
        self.limiter.wait(endpoint);

        debug!(%endpoint, "sending request");
        let response = request.bearer_auth(&self.token).send()?;
        self.limiter
            .observe(endpoint, response.headers(), Instant::now())?;

        check_status(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .map_err(|err| Error::Decode(err.to_string()))
}
