//! Rate-limited HTTP client shared by the platform clients.
//!
//! Both the Spotify resolver and the YouTube scraper sit behind this
//! wrapper, so a playlist fan-out of hundreds of concurrent tasks never
//! hammers either platform. Calls past the per-interval budget are
//! delayed until capacity frees up, never rejected.

use std::{future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{self, Body, Method, Url};

use crate::{config::Config, error::Result};

/// HTTP client with built-in request rate limiting.
pub struct Client {
    /// Direct access to the underlying client, bypassing the limiter.
    ///
    /// For requests that should not count against the call budget.
    pub unlimited: reqwest::Client,

    /// Limiter applied by [`Client::execute`].
    rate_limiter: DefaultDirectRateLimiter,
}

impl Client {
    /// Window over which calls are counted.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Call budget per window.
    ///
    /// Conservative for both platforms; a long playlist spreads its
    /// search calls over time instead of bursting.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 25;

    /// How long idle connections are kept open between requests.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Limit on individual network reads.
    const READ_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a client presenting the configured `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if the rate limit constants are zero.
    pub fn new(config: &Config) -> Result<Self> {
        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        let unlimited = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .read_timeout(Self::READ_TIMEOUT)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            unlimited,
            rate_limiter: governor::RateLimiter::direct(quota),
        })
    }

    /// Builds a raw request for [`Client::execute`].
    pub fn request<U, T>(&self, method: Method, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        *request.body_mut() = Some(body.into());

        request
    }

    /// Builds a GET request with an empty body.
    pub fn get<U>(&self, url: U) -> reqwest::Request
    where
        U: Into<Url>,
    {
        self.request(Method::GET, url, "")
    }

    /// Executes a request once the rate limiter grants capacity.
    ///
    /// # Errors
    ///
    /// Returns error if request execution or the network fails.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        // Concurrency is low enough that waiting without jitter is fine.
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }
}
