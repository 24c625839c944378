//! Scan configuration, constructed once by the CLI layer and threaded
//! through the scheduler, discovery, tunnel, and TPCI layers. The core
//! never reads argv or environment variables directly.

use std::time::Duration;

/// Every timeout, retry count, worker limit, and interface override named
/// in the concurrency model, with the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub max_workers: usize,
    pub desc_timeout: Duration,
    pub desc_retries: u32,
    pub search_timeout: Duration,
    pub connect_timeout: Duration,
    pub tunnelling_ack_timeout: Duration,
    pub tunnelling_ack_retries: u32,
    pub cemi_confirm_timeout: Duration,
    pub connectionstate_timeout: Duration,
    pub connectionstate_retries: u32,
    pub tpci_response_timeout: Duration,
    pub iface: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            max_workers: 100,
            desc_timeout: Duration::from_secs(2),
            desc_retries: 2,
            search_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            tunnelling_ack_timeout: Duration::from_secs(1),
            tunnelling_ack_retries: 1,
            cemi_confirm_timeout: Duration::from_secs(3),
            connectionstate_timeout: Duration::from_secs(10),
            connectionstate_retries: 1,
            tpci_response_timeout: Duration::from_secs(3),
            iface: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timeouts() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.max_workers, 100);
        assert_eq!(cfg.desc_timeout, Duration::from_secs(2));
        assert_eq!(cfg.desc_retries, 2);
        assert_eq!(cfg.search_timeout, Duration::from_secs(5));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.tunnelling_ack_timeout, Duration::from_secs(1));
        assert_eq!(cfg.tunnelling_ack_retries, 1);
        assert_eq!(cfg.cemi_confirm_timeout, Duration::from_secs(3));
        assert_eq!(cfg.connectionstate_timeout, Duration::from_secs(10));
        assert_eq!(cfg.tpci_response_timeout, Duration::from_secs(3));
    }
}
