//! Gateway discovery: multicast SEARCH and unicast DESCRIPTION probing.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::codec::frame::{KnxnetipBody, KnxnetipFrame};
use crate::codec::hpai::Hpai;
use crate::config::ScanConfig;
use crate::constants::{DEFAULT_PORT, MULTICAST_GROUP};
use crate::error::ScanError;
use crate::net::bind_udp;
use crate::report::GatewayReport;

fn body_to_report(host: SocketAddrV4, body: KnxnetipBody) -> Option<GatewayReport> {
    match body {
        KnxnetipBody::SearchResponse { device_info, supp_svc_families, .. }
        | KnxnetipBody::DescriptionResponse { device_info, supp_svc_families } => {
            Some(GatewayReport {
                host,
                mac_address: device_info.mac_address,
                knx_address: crate::address::KnxAddress::parse(device_info.knx_address),
                device_serial: device_info.knx_device_serial,
                friendly_name: device_info.friendly_name,
                device_status: device_info.device_status,
                knx_medium: device_info.knx_medium,
                project_install_identifier: device_info.project_install_identifier,
                supported_services: supp_svc_families.families.iter().map(|f| f.id).collect(),
                bus_devices: Vec::new(),
            })
        }
        _ => None,
    }
}

/// Sends a single DESCRIPTION_REQUEST to `target`, retrying up to
/// `cfg.desc_retries` times on timeout.
pub async fn describe(target: SocketAddrV4, cfg: &ScanConfig) -> Result<GatewayReport, ScanError> {
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    let socket = bind_udp(bind_addr, cfg.iface.as_deref())?;
    socket.connect(target).await?;

    let local = socket.local_addr()?;
    let local_v4 = match local {
        std::net::SocketAddr::V4(v4) => v4,
        std::net::SocketAddr::V6(_) => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
    };
    let request = KnxnetipFrame::new(KnxnetipBody::DescriptionRequest {
        discovery_endpoint: Hpai::udp(local_v4),
    });
    let bytes = request.encode();

    let mut attempts = 0;
    loop {
        socket.send(&bytes).await?;
        let mut buf = [0u8; 1024];
        match timeout(cfg.desc_timeout, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                let frame = KnxnetipFrame::decode(&buf[..n])?;
                return body_to_report(target, frame.body).ok_or(ScanError::NoTargets);
            }
            Ok(Err(e)) => return Err(ScanError::Io(e)),
            Err(_elapsed) => {
                attempts += 1;
                if attempts > cfg.desc_retries {
                    warn!(%target, "DESCRIPTION_REQUEST timed out after retries");
                    return Err(ScanError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "no DESCRIPTION_RESPONSE",
                    )));
                }
                debug!(%target, attempt = attempts, "retrying DESCRIPTION_REQUEST");
            }
        }
    }
}

/// Sends a multicast SEARCH_REQUEST and collects SEARCH_RESPONSEs for
/// `cfg.search_timeout`, deduplicated by responding (ip, port).
pub async fn search(cfg: &ScanConfig) -> Result<Vec<GatewayReport>, ScanError> {
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    let socket = bind_udp(bind_addr, cfg.iface.as_deref())?;
    socket.set_broadcast(true)?;

    let local = match socket.local_addr()? {
        std::net::SocketAddr::V4(v4) => v4,
        std::net::SocketAddr::V6(_) => SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
    };
    let request = KnxnetipFrame::new(KnxnetipBody::SearchRequest {
        discovery_endpoint: Hpai::udp(local),
    });
    let target = SocketAddrV4::new(MULTICAST_GROUP, DEFAULT_PORT);
    socket.send_to(&request.encode(), target).await?;

    let mut found: Vec<GatewayReport> = Vec::new();
    let deadline = tokio::time::Instant::now() + cfg.search_timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        let mut buf = [0u8; 1024];
        match timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, std::net::SocketAddr::V4(from)))) => {
                if let Ok(frame) = KnxnetipFrame::decode(&buf[..n]) {
                    if let Some(report) = body_to_report(from, frame.body) {
                        if !found.iter().any(|g| g.host == report.host) {
                            found.push(report);
                        }
                    }
                }
            }
            Ok(Ok((_, std::net::SocketAddr::V6(_)))) => continue,
            Ok(Err(e)) => return Err(ScanError::Io(e)),
            Err(_elapsed) => break,
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::device_info::{DeviceInfoDib, ServiceFamily, SuppSvcFamiliesDib};

    fn sample_device_info() -> DeviceInfoDib {
        DeviceInfoDib {
            knx_medium: 0x02,
            device_status: 0x00,
            knx_address: 0x1101,
            project_install_identifier: 0,
            knx_device_serial: [0; 6],
            multicast_address: Ipv4Addr::new(0, 0, 0, 0),
            mac_address: [0; 6],
            friendly_name: [0u8; 30],
        }
    }

    #[test]
    fn description_response_converts_to_report() {
        let body = KnxnetipBody::DescriptionResponse {
            device_info: sample_device_info(),
            supp_svc_families: SuppSvcFamiliesDib {
                families: vec![ServiceFamily { id: 0x02, version: 1 }],
            },
        };
        let host = SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 10), DEFAULT_PORT);
        let report = body_to_report(host, body).unwrap();
        assert_eq!(report.knx_address.to_string(), "1.1.1");
        assert_eq!(report.knx_medium, 0x02);
    }

    #[test]
    fn non_description_body_yields_none() {
        let body = KnxnetipBody::TunnellingAck { channel_id: 0, seq: 0, status: 0 };
        let host = SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 10), DEFAULT_PORT);
        assert!(body_to_report(host, body).is_none());
    }
}
