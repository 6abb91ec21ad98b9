//! Rate limiting configuration.

/// Configuration for one rate limiter instance.
///
/// Presets share no state: each is an independent limiter differing only in
/// `window_ms` / `max_requests`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Prefix for store keys (e.g., `"courier:rl"`).
    pub key_prefix: String,
    /// Window duration in milliseconds.
    pub window_ms: u64,
    /// Maximum requests admitted per window.
    pub max_requests: u32,
    /// Base duration in seconds for escalating repeat-offender blocks.
    pub block_base_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl RateLimitConfig {
    /// Tight budget for abuse-prone surfaces.
    pub fn strict() -> Self {
        Self::preset(60_000, 5)
    }

    /// Default budget for ordinary message traffic.
    pub fn standard() -> Self {
        Self::preset(60_000, 20)
    }

    /// Generous budget for low-risk read paths.
    pub fn relaxed() -> Self {
        Self::preset(60_000, 100)
    }

    /// Budget for command invocations.
    pub fn commands() -> Self {
        Self::preset(60_000, 30)
    }

    fn preset(window_ms: u64, max_requests: u32) -> Self {
        Self {
            key_prefix: "courier:rl".to_string(),
            window_ms,
            max_requests,
            block_base_secs: 60,
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `COURIER_RATE_LIMIT`: limit as `"max_requests,window_ms"`
    /// - `COURIER_RATE_LIMIT_PREFIX`: store key prefix (default: `"courier:rl"`)
    /// - `COURIER_RATE_LIMIT_BLOCK_BASE`: base block duration in seconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COURIER_RATE_LIMIT") {
            if let Some((max_requests, window_ms)) = parse_limit(&val) {
                config.max_requests = max_requests;
                config.window_ms = window_ms;
            }
        }
        if let Ok(val) = std::env::var("COURIER_RATE_LIMIT_PREFIX") {
            config.key_prefix = val;
        }
        if let Ok(val) = std::env::var("COURIER_RATE_LIMIT_BLOCK_BASE") {
            if let Ok(base) = val.trim().parse() {
                config.block_base_secs = base;
            }
        }

        config
    }
}

/// Parses a limit from `"max_requests,window_ms"` format.
fn parse_limit(val: &str) -> Option<(u32, u64)> {
    let parts: Vec<&str> = val.split(',').collect();
    if parts.len() == 2 {
        let max_requests = parts[0].trim().parse().ok()?;
        let window_ms = parts[1].trim().parse().ok()?;
        Some((max_requests, window_ms))
    } else {
        None
    }
}
