// ============================================================
// Layer 6 — HTTP Plumbing
// ============================================================
// Everything the metadata builder needs from the network:
//
//   HttpClient   → one ureq agent with fixed timeouts
//   FetchError   → what went wrong with a single URL
//   RetryConfig  → how often and how patiently to try again
//
// Bodies are read through a byte cap so a misbehaving server
// cannot make one artwork page fill the memory.

use std::io::{self, Read};
use std::time::Duration;

use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced while fetching a single URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("HTTP {code} from {url}")]
    Status { url: String, code: u16 },
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("Failed to read response body from {url}: {source}")]
    Body { url: String, source: io::Error },
    #[error("Unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },
}

impl FetchError {
    /// Rate limiting, server errors and dropped connections may pass on a
    /// later attempt. Anything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::Status { code: 429 | 500..=599, .. }
        )
    }
}

// ─── Retry policy ─────────────────────────────────────────────────────────────
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Attempts in total, the first one included
    pub max_attempts: usize,
    /// Pause after the first failure; doubles after each further one
    pub base_delay:   Duration,
    pub max_delay:    Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay:   Duration::from_millis(500),
            max_delay:    Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// Pause after failed attempt number `failed` (1-based):
    /// `base_delay * 2^(failed - 1)`, never above `max_delay`.
    pub fn delay_after(&self, failed: usize) -> Duration {
        let doublings = u32::try_from(failed.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(doublings))
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, `retryable` rejects its error, or the
    /// attempts run out. The last error is returned.
    pub fn run<T, E>(
        &self,
        mut op:        impl FnMut() -> Result<T, E>,
        mut retryable: impl FnMut(&E) -> bool,
    ) -> Result<T, E> {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !retryable(&err) => return Err(err),
                Err(_) => std::thread::sleep(self.delay_after(attempt)),
            }
        }
        op()
    }
}

// ─── HttpClient ───────────────────────────────────────────────────────────────
/// A ureq agent with connect and I/O timeouts. Clones share the
/// connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl Default for HttpClient {
    fn default() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(IO_TIMEOUT)
            .timeout_write(IO_TIMEOUT)
            .build();
        Self { agent }
    }
}

impl HttpClient {
    /// GET `url`; the body must not exceed `max_bytes`.
    pub fn get(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(code, _) => FetchError::Status { url: url.to_string(), code },
            ureq::Error::Transport(t) => FetchError::Transport {
                url:     url.to_string(),
                message: t.to_string(),
            },
        })?;
        let declared = response
            .header("Content-Length")
            .and_then(|v| v.parse::<u64>().ok());
        read_capped(response.into_reader(), declared, max_bytes)
            .map_err(|source| FetchError::Body { url: url.to_string(), source })
    }
}

/// Read `body` to the end, failing as soon as it is known to be longer
/// than `max_bytes`: up front from `declared`, otherwise after reading
/// one byte past the cap.
pub fn read_capped(body: impl Read, declared: Option<u64>, max_bytes: usize) -> io::Result<Vec<u8>> {
    let cap = max_bytes as u64;
    let too_large = |what: String| io::Error::new(io::ErrorKind::InvalidData, what);

    if let Some(len) = declared.filter(|&len| len > cap) {
        return Err(too_large(format!("body of {len} bytes exceeds the {max_bytes} byte limit")));
    }
    let mut bytes = Vec::with_capacity(declared.unwrap_or(0) as usize);
    body.take(cap + 1).read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(too_large(format!("body exceeds the {max_bytes} byte limit")));
    }
    Ok(bytes)
}
