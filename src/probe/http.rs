//! HTTP liveness probe.
//!
//! Issues a single GET per target over a shared, connection-pooled
//! [`reqwest::Client`] and folds every result into an [`Outcome`].

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{CONNECTION, HeaderValue, USER_AGENT};
use reqwest::{Client, Request, Response, redirect};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::probe::{Outcome, Probe, ProbeError, Target};

/// User agent sent with every probe.
pub const DEFAULT_USER_AGENT: &str = "Checker/1.0";

/// Maximum number of response body bytes read before the body is dropped.
pub const BODY_DRAIN_LIMIT: usize = 1024;

/// Default per-check timeout (5 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default idle connections kept per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 100;

/// Default idle connection lifetime (90 seconds).
pub const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Transport settings for [`HttpProbe`].
#[derive(Debug, Clone)]
pub struct HttpProbeConfig {
    /// Client-level request timeout. Each check also enforces its own deadline.
    pub timeout: Duration,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpProbeConfig {
    /// Set the client-level timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the idle pool size per host.
    pub fn with_pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set the idle connection lifetime.
    pub fn with_pool_idle_timeout(mut self, idle: Duration) -> Self {
        self.pool_idle_timeout = idle;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Probe executor backed by a pooled HTTP client.
///
/// Certificate validation is disabled and redirects are not followed: the
/// probe checks reachability, and a 3xx answer already proves it.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
    user_agent: HeaderValue,
}

impl HttpProbe {
    /// Build the probe and its shared client.
    ///
    /// # Errors
    /// Returns the `reqwest` error if the TLS backend or client cannot be
    /// initialised, or if the user agent is not a valid header value.
    pub fn new(config: &HttpProbeConfig) -> Result<Self, crate::RunError> {
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|e| {
            crate::RunError::Client(format!("invalid user agent '{}': {e}", config.user_agent))
        })?;

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| crate::RunError::Client(e.to_string()))?;

        Ok(Self { client, user_agent })
    }

    /// Build the GET request for `destination` without touching the network.
    fn build_request(&self, destination: &str) -> Result<Request, ProbeError> {
        let url = Url::parse(destination)
            .map_err(|e| ProbeError::InvalidRequest(format!("'{destination}': {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidRequest(format!(
                "'{destination}': unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ProbeError::InvalidRequest(format!(
                "'{destination}': missing host"
            )));
        }

        self.client
            .get(url)
            .header(USER_AGENT, self.user_agent.clone())
            .header(CONNECTION, HeaderValue::from_static("close"))
            .build()
            .map_err(|e| ProbeError::InvalidRequest(e.to_string()))
    }

    /// Send the request, then read and discard a bounded prefix of the body.
    async fn exchange(&self, request: Request) -> Result<u16, reqwest::Error> {
        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();

        // The status is already known; a broken body does not change it.
        match drain_body(response, BODY_DRAIN_LIMIT).await {
            Ok(drained) => tracing::trace!(status, drained, "Response body drained"),
            Err(e) => tracing::trace!(error = %e, "Failed to drain response body"),
        }

        Ok(status)
    }
}

impl std::fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProbe")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn check(
        &self,
        target: Target,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Outcome {
        let observed_at = Utc::now();
        let start = Instant::now();

        let request = match self.build_request(&target.destination) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(target_id = %target.id, error = %e, "Probe request rejected");
                return Outcome::failed(target, e, None, observed_at);
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = timeout(deadline, self.exchange(request)) => match result {
                Ok(Ok(status)) => Ok(status),
                Ok(Err(e)) if e.is_timeout() => Err(ProbeError::Timeout(deadline)),
                Ok(Err(e)) => Err(ProbeError::Transport(error_chain(&e))),
                Err(_) => Err(ProbeError::Timeout(deadline)),
            },
        };
        let latency = start.elapsed();

        match result {
            Ok(status) => {
                tracing::trace!(
                    target_id = %target.id,
                    status,
                    latency_ms = latency.as_secs_f64() * 1000.0,
                    "Probe completed"
                );
                Outcome::from_status(target, status, latency, observed_at)
            }
            Err(e) => {
                tracing::debug!(
                    target_id = %target.id,
                    destination = %target.destination,
                    error = %e,
                    "Probe failed"
                );
                Outcome::failed(target, e, Some(latency), observed_at)
            }
        }
    }
}

/// Consume at most `limit` body bytes, returning how many were consumed.
///
/// No further chunk is requested once the cap is reached. The part of the
/// last chunk past the cap is dropped with the response, unread.
async fn drain_body(mut response: Response, limit: usize) -> Result<usize, reqwest::Error> {
    let mut drained = 0;
    while drained < limit {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        drained += chunk.len().min(limit - drained);
    }
    Ok(drained)
}

/// Flatten an error and its sources into one line.
///
/// `reqwest` keeps the useful part ("Connection refused") in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
