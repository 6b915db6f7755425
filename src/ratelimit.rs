//! Per-endpoint tracking of the quota the server advertises.
//!
//! The tracker never predicts anything on its own: every state is a copy of
//! what the most recent response of that endpoint reported.

use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    thread,
    time::{Duration, Instant},
};

pub const REMAINING_HEADER: &str = "requests-remaining";
pub const RESET_HEADER: &str = "requests-reset";
pub const COOLDOWN_HEADER: &str = "cooldown-reset";

/// Rate-limited endpoint classes of the canvas API.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    GetPixel,
    GetPixels,
    SetPixel,
}

impl Endpoint {
    pub const ALL: [Self; 3] = [Self::GetPixel, Self::GetPixels, Self::SetPixel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetPixel => "get_pixel",
            Self::GetPixels => "get_pixels",
            Self::SetPixel => "set_pixel",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::GetPixel => "/get_pixel",
            Self::GetPixels => "/get_pixels",
            Self::SetPixel => "/set_pixel",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitState {
    /// Requests left in the current window.
    pub remaining: u32,
    /// Instant at which the next window opens.
    pub reset_at: Instant,
}

impl RateLimitState {
    /// One request allowed, right away.
    fn fresh(now: Instant) -> Self {
        Self {
            remaining: 1,
            reset_at: now,
        }
    }

    /// How long a request issued at `now` has to wait.
    ///
    /// An exhausted quota whose reset already passed counts as available;
    /// the server gets the final say.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        if self.remaining > 0 {
            return None;
        }

        self.reset_at
            .checked_duration_since(now)
            .filter(|wait| !wait.is_zero())
    }

    pub fn reset_in(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    states: BTreeMap<Endpoint, RateLimitState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        let now = Instant::now();
        let states = Endpoint::ALL
            .into_iter()
            .map(|endpoint| (endpoint, RateLimitState::fresh(now)))
            .collect();

        Self { states }
    }

    pub fn state(&self, endpoint: Endpoint) -> Option<RateLimitState> {
        self.states.get(&endpoint).copied()
    }

    pub fn wait_time(&self, endpoint: Endpoint, now: Instant) -> Option<Duration> {
        self.states
            .get(&endpoint)
            .and_then(|state| state.wait_time(now))
    }

    /// Block the calling thread until `endpoint` has quota again.
    pub fn wait(&self, endpoint: Endpoint) {
        if let Some(wait) = self.wait_time(endpoint, Instant::now()) {
            info!(%endpoint, wait_secs = wait.as_secs_f64(), "quota exhausted, sleeping until reset");
            thread::sleep(wait);
        }
    }

    /// Record the quota headers of a response received at `received_at`.
    ///
    /// A response without quota headers but with a cooldown means the server
    /// rejected the request; that is reported as [`Error::RateLimited`].
    pub fn observe(
        &mut self,
        endpoint: Endpoint,
        headers: &HeaderMap,
        received_at: Instant,
    ) -> Result<()> {
        let remaining = header_value::<u32>(headers, REMAINING_HEADER)?;
        let reset = header_secs(headers, RESET_HEADER)?;

        if let (Some(remaining), Some(reset)) = (remaining, reset) {
            debug!(%endpoint, remaining, reset_secs = reset.as_secs_f64(), "updated quota");
            self.states.insert(
                endpoint,
                RateLimitState {
                    remaining,
                    reset_at: received_at + reset,
                },
            );
            return Ok(());
        }

        match header_secs(headers, COOLDOWN_HEADER)? {
            Some(cooldown) => {
                warn!(%endpoint, cooldown_secs = cooldown.as_secs_f64(), "server cooldown active");
                self.states.insert(
                    endpoint,
                    RateLimitState {
                        remaining: 0,
                        reset_at: received_at + cooldown,
                    },
                );

                Err(Error::RateLimited {
                    endpoint,
                    retry_after: cooldown,
                })
            }
            None => {
                debug!(%endpoint, "response carried no quota headers");
                Ok(())
            }
        }
    }

    pub fn snapshot(&self) -> BTreeMap<Endpoint, RateLimitState> {
        self.states.clone()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn header_value<T: FromStr>(headers: &HeaderMap, name: &str) -> Result<Option<T>> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| Error::Decode(format!("invalid {name} header: {value:?}")))
}

fn header_secs(headers: &HeaderMap, name: &str) -> Result<Option<Duration>> {
    header_value::<f64>(headers, name)?
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|_| Error::Decode(format!("invalid {name} header: {secs}")))
        })
        .transpose()
}
