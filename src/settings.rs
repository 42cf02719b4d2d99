use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_GATEWAY_URL: &str = "https://api.novacpayment.com/api/v1";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timing knobs for the session orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Gap between verification polls. The first poll does not wait for it.
    pub poll_interval: Duration,
    /// Upper bound on a single verify call; exceeding it counts as a transient failure.
    pub verify_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_env() -> Self {
        Self {
            poll_interval: env_millis("NOVAC_POLL_INTERVAL_MS").unwrap_or(DEFAULT_POLL_INTERVAL),
            verify_timeout: env_millis("NOVAC_VERIFY_TIMEOUT_MS")
                .unwrap_or(DEFAULT_VERIFY_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl GatewaySettings {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("NOVAC_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            request_timeout: env_millis("NOVAC_GATEWAY_TIMEOUT_MS")
                .unwrap_or(DEFAULT_GATEWAY_TIMEOUT),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(3));
        assert_eq!(settings.verify_timeout, Duration::from_secs(10));
        assert_eq!(GatewaySettings::default().base_url, DEFAULT_GATEWAY_URL);
    }

    #[test]
    fn test_unset_env_value_is_ignored() {
        assert_eq!(env_millis("NOVAC_TEST_UNSET_VARIABLE"), None);
    }

    #[test]
    fn test_poll_interval_from_env() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("NOVAC_POLL_INTERVAL_MS", "250") };
        let settings = OrchestratorSettings::from_env();
        assert_eq!(settings.poll_interval, Duration::from_millis(250));

        unsafe { std::env::set_var("NOVAC_POLL_INTERVAL_MS", "soon") };
        let settings = OrchestratorSettings::from_env();
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);

        unsafe { std::env::remove_var("NOVAC_POLL_INTERVAL_MS") };
    }
}
