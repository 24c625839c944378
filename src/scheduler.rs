//! Scan scheduler: drains the gateway queue with a bounded worker pool,
//! then walks each discovered gateway's bus sequentially.

use std::net::{Ipv4Addr, SocketAddrV4};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::address::KnxAddress;
use crate::apci::{
    device_descriptor_read, memory_read_manufacturer, parse_device_descriptor_response,
    parse_memory_response, parse_property_value_response, property_value_read, PID_MANUFACTURER_ID,
    PID_SERIAL_NUMBER,
};
use crate::config::ScanConfig;
use crate::discovery;
use crate::error::ScanError;
use crate::manufacturers::manufacturer_name;
use crate::report::{BusDeviceReport, GatewayReport};
use crate::tpci::TpciConnection;
use crate::tunnel::Tunnel;

/// Drains `targets` through unicast DESCRIPTION probes with a worker pool
/// bounded by `min(cfg.max_workers, targets.len())`, then (if
/// `bus_targets` is non-empty) walks each discovered gateway's bus
/// sequentially.
pub async fn run_scan(
    targets: Vec<SocketAddrV4>,
    bus_targets: Vec<KnxAddress>,
    bus_info: bool,
    cfg: ScanConfig,
) -> Result<Vec<GatewayReport>, ScanError> {
    if targets.is_empty() {
        return Err(ScanError::NoTargets);
    }

    let mut gateways = describe_all(targets, &cfg).await;

    if !bus_targets.is_empty() && !gateways.is_empty() {
        let mut set = JoinSet::new();
        for (idx, gateway) in gateways.iter().enumerate() {
            let host = gateway.host;
            let bus_targets = bus_targets.clone();
            let cfg = cfg.clone();
            set.spawn_local(async move {
                let devices = walk_bus(host, bus_targets, bus_info, &cfg).await;
                (idx, devices)
            });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, devices)) => gateways[idx].bus_devices = devices,
                Err(e) => error!(error = %e, "bus walk task panicked"),
            }
        }
    }

    Ok(gateways)
}

async fn describe_all(targets: Vec<SocketAddrV4>, cfg: &ScanConfig) -> Vec<GatewayReport> {
    let worker_count = cfg.max_workers.min(targets.len()).max(1);
    let mut set = JoinSet::new();
    let mut queue = targets.into_iter();
    let mut in_flight = 0;
    let mut results = Vec::new();

    for target in queue.by_ref().take(worker_count) {
        let cfg = cfg.clone();
        set.spawn_local(async move { discovery::describe(target, &cfg).await });
        in_flight += 1;
    }

    while in_flight > 0 {
        match set.join_next().await {
            Some(Ok(Ok(report))) => results.push(report),
            Some(Ok(Err(e))) => warn!(error = %e, "description probe failed"),
            Some(Err(e)) => error!(error = %e, "description worker panicked"),
            None => break,
        }
        in_flight -= 1;
        if let Some(target) = queue.next() {
            let cfg = cfg.clone();
            set.spawn_local(async move { discovery::describe(target, &cfg).await });
            in_flight += 1;
        }
    }
    results
}

async fn walk_bus(
    gateway: SocketAddrV4,
    targets: Vec<KnxAddress>,
    bus_info: bool,
    cfg: &ScanConfig,
) -> Vec<BusDeviceReport> {
    let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    let mut tunnel = match Tunnel::connect(local, gateway, cfg).await {
        Ok(t) => t,
        Err(e) => {
            warn!(%gateway, error = %e, "bus walk could not open tunnel");
            return Vec::new();
        }
    };
    info!(%gateway, targets = targets.len(), "bus walk starting");

    let mut devices = Vec::new();
    for target in targets {
        match walk_one_device(&mut tunnel, target, bus_info, cfg).await {
            Some(device) => devices.push(device),
            None => continue,
        }
    }
    tunnel.disconnect(cfg).await;
    devices
}

async fn walk_one_device(
    tunnel: &mut Tunnel,
    target: KnxAddress,
    bus_info: bool,
    cfg: &ScanConfig,
) -> Option<BusDeviceReport> {
    let local_address = tunnel.local_individual_address();
    let mut conn = TpciConnection::new(target, local_address);

    let alive = conn.open(tunnel, cfg).await.ok()?;
    if !alive {
        conn.close(tunnel, cfg).await;
        return None;
    }

    let (apci, payload) = device_descriptor_read();
    let descriptor = match conn.send_ndp(tunnel, cfg, apci, payload).await {
        Ok(p) => parse_device_descriptor_response(&p),
        Err(_) => None,
    };

    let mut manufacturer = None;
    if bus_info {
        manufacturer = match descriptor {
            Some(dev_desc) if dev_desc > 0x13 => {
                let (apci, payload) = property_value_read(0, PID_MANUFACTURER_ID);
                conn.send_ndp(tunnel, cfg, apci, payload)
                    .await
                    .ok()
                    .and_then(|p| parse_property_value_response(&p).map(<[u8]>::to_vec))
            }
            Some(_) => {
                let (apci, payload) = memory_read_manufacturer();
                conn.send_ndp(tunnel, cfg, apci, payload)
                    .await
                    .ok()
                    .and_then(|p| parse_memory_response(&p).map(<[u8]>::to_vec))
            }
            None => None,
        }
        .and_then(|bytes| {
            let id = bytes.iter().fold(0u16, |acc, &b| (acc << 8) | b as u16);
            manufacturer_name(id).map(str::to_string)
        });
    }

    let mut device_serial = None;
    if bus_info && matches!(descriptor, Some(d) if d > 0x13) {
        let (apci, payload) = property_value_read(0, PID_SERIAL_NUMBER);
        if let Ok(p) = conn.send_ndp(tunnel, cfg, apci, payload).await {
            if let Some(bytes) = parse_property_value_response(&p) {
                if bytes.len() >= 6 {
                    let mut serial = [0u8; 6];
                    serial.copy_from_slice(&bytes[..6]);
                    device_serial = Some(serial);
                }
            }
        }
    }

    conn.close(tunnel, cfg).await;

    Some(BusDeviceReport {
        address: target,
        device_descriptor: descriptor,
        device_serial,
        manufacturer,
    })
}
