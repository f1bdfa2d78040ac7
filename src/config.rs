use std::time::Duration;

pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const AXFR_PORT: u16 = 53;
pub const AXFR_MAX_ATTEMPTS: u32 = 3;
pub const AXFR_BACKOFF: Duration = Duration::from_secs(2);

/// Knobs of a single AXFR attempt against one name server.
///
/// Only `read_timeout` comes from the command line. The attempt count and
/// the backoff are part of the tool's observable behaviour and stay fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    pub read_timeout: Duration,
    pub backoff: Duration,
    pub max_attempts: u32,
    pub port: u16,
}

impl ProbeConfig {
    pub fn from_delay_ms(delay_ms: u64) -> Self {
        Self {
            read_timeout: Duration::from_millis(delay_ms),
            ..Self::default()
        }
    }

    /// Upper bound on the read phase of a probe: every attempt times out
    /// and backs off.
    pub fn attempt_budget(&self) -> Duration {
        (self.read_timeout + self.backoff) * self.max_attempts.max(1)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_DELAY_MS),
            backoff: AXFR_BACKOFF,
            max_attempts: AXFR_MAX_ATTEMPTS,
            port: AXFR_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumConfig {
    pub probe: ProbeConfig,
    pub domain_concurrency: usize,
    pub ns_concurrency: usize,
    pub sni_concurrency: usize,
    pub tls_timeout: Option<Duration>,
}

impl Default for EnumConfig {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            domain_concurrency: 16,
            ns_concurrency: 8,
            sni_concurrency: 1,
            tls_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_sets_read_timeout_only() {
        let config = ProbeConfig::from_delay_ms(250);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.backoff, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.port, 53);
    }

    #[test]
    fn test_attempt_budget() {
        let config = ProbeConfig::from_delay_ms(1000);
        assert_eq!(config.attempt_budget(), Duration::from_secs(9));
    }
}
