//! Command-line surface. Parses argv into a `Cli`, which `main` turns into
//! a `ScanConfig` plus a run mode; the core never reads argv itself.

use std::time::Duration;

use clap::Parser;

use crate::config::ScanConfig;

#[derive(Debug, Parser)]
#[command(name = "knxmap", about = "KNXnet/IP gateway and bus scanner")]
pub struct Cli {
    /// Targets as IPv4 addresses or CIDR ranges, e.g. 192.168.1.0/24
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// UDP port to probe on each target
    #[arg(short, long, default_value_t = crate::constants::DEFAULT_PORT)]
    pub port: u16,

    /// Use multicast SEARCH instead of unicast DESCRIPTION probes
    #[arg(long)]
    pub search: bool,

    /// Attach a bus monitor instead of scanning (requires exactly one target)
    #[arg(long)]
    pub bus_monitor: bool,

    /// Like --bus-monitor, but filtered to group-addressed frames
    #[arg(long)]
    pub group_monitor: bool,

    /// After discovering gateways, walk this bus address range, e.g. 1.1.1-1.1.255
    #[arg(long)]
    pub bus_targets: Option<String>,

    /// Read extra per-device info (manufacturer, serial) during a bus walk
    #[arg(long)]
    pub bus_info: bool,

    /// Bind the scan socket to a specific network interface
    #[arg(long)]
    pub iface: Option<String>,

    /// Maximum concurrent description workers
    #[arg(long, default_value_t = ScanConfig::default().max_workers)]
    pub workers: usize,

    /// DESCRIPTION_REQUEST timeout in seconds
    #[arg(long, default_value_t = ScanConfig::default().desc_timeout.as_secs())]
    pub desc_timeout: u64,

    /// DESCRIPTION_REQUEST retry count
    #[arg(long, default_value_t = ScanConfig::default().desc_retries)]
    pub desc_retries: u32,

    /// SEARCH collect window in seconds
    #[arg(long, default_value_t = ScanConfig::default().search_timeout.as_secs())]
    pub search_timeout: u64,
}

impl Cli {
    pub fn to_scan_config(&self) -> ScanConfig {
        ScanConfig {
            max_workers: self.workers,
            desc_timeout: Duration::from_secs(self.desc_timeout),
            desc_retries: self.desc_retries,
            search_timeout: Duration::from_secs(self.search_timeout),
            iface: self.iface.clone(),
            ..ScanConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_scan_config_overrides_only_named_fields() {
        let cli = Cli {
            targets: vec!["10.0.0.0/24".to_string()],
            port: crate::constants::DEFAULT_PORT,
            search: false,
            bus_monitor: false,
            group_monitor: false,
            bus_targets: None,
            bus_info: false,
            iface: Some("eth0".to_string()),
            workers: 10,
            desc_timeout: 1,
            desc_retries: 0,
            search_timeout: 5,
        };
        let cfg = cli.to_scan_config();
        assert_eq!(cfg.max_workers, 10);
        assert_eq!(cfg.desc_timeout, Duration::from_secs(1));
        assert_eq!(cfg.desc_retries, 0);
        assert_eq!(cfg.iface, Some("eth0".to_string()));
        assert_eq!(cfg.connect_timeout, ScanConfig::default().connect_timeout);
    }
}
