//! Scan result reports and their human-readable rendering.

use std::fmt;
use std::net::SocketAddrV4;

use crate::address::KnxAddress;
use crate::constants::device_descriptor_name;

fn medium_name(value: u8) -> &'static str {
    match value {
        0x02 => "TP1",
        0x04 => "PL110",
        0x10 => "RF",
        0x20 => "KNX IP",
        _ => "Unknown",
    }
}

/// Quotes a null-padded friendly-name field the way a terminal-safe report
/// would: trims trailing padding and replaces non-printable bytes.
fn printable_friendly_name(raw: &[u8]) -> String {
    let trimmed = raw
        .iter()
        .rposition(|&b| b != 0)
        .map(|end| &raw[..=end])
        .unwrap_or(&[]);
    trimmed
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}

/// One bus device found while walking a gateway's KNX bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDeviceReport {
    pub address: KnxAddress,
    pub device_descriptor: Option<u16>,
    pub device_serial: Option<[u8; 6]>,
    pub manufacturer: Option<String>,
}

impl fmt::Display for BusDeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "      {}", self.address)?;
        if let Some(desc) = self.device_descriptor {
            writeln!(f, "         Type: {}", device_descriptor_name(desc))?;
        }
        if let Some(serial) = self.device_serial {
            writeln!(
                f,
                "         Device Serial: {:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
                serial[0], serial[1], serial[2], serial[3], serial[4], serial[5]
            )?;
        }
        if let Some(manufacturer) = &self.manufacturer {
            writeln!(f, "         Manufacturer: {manufacturer}")?;
        }
        Ok(())
    }
}

/// A discovered gateway, with its DESCRIPTION/SEARCH_RESPONSE fields and
/// whatever bus devices were found behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReport {
    pub host: SocketAddrV4,
    pub mac_address: [u8; 6],
    pub knx_address: KnxAddress,
    pub device_serial: [u8; 6],
    pub friendly_name: [u8; 30],
    pub device_status: u8,
    pub knx_medium: u8,
    pub project_install_identifier: u16,
    pub supported_services: Vec<u8>,
    pub bus_devices: Vec<BusDeviceReport>,
}

impl fmt::Display for GatewayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.host.ip())?;
        writeln!(f, "   Port: {}", self.host.port())?;
        writeln!(
            f,
            "   MAC Address: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.mac_address[0],
            self.mac_address[1],
            self.mac_address[2],
            self.mac_address[3],
            self.mac_address[4],
            self.mac_address[5]
        )?;
        writeln!(f, "   KNX Bus Address: {}", self.knx_address)?;
        writeln!(
            f,
            "   KNX Device Serial: {:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.device_serial[0],
            self.device_serial[1],
            self.device_serial[2],
            self.device_serial[3],
            self.device_serial[4],
            self.device_serial[5]
        )?;
        writeln!(f, "   KNX Medium: {}", medium_name(self.knx_medium))?;
        writeln!(
            f,
            "   Device Friendly Name: {}",
            printable_friendly_name(&self.friendly_name)
        )?;
        writeln!(f, "   Device Status: {}", self.device_status)?;
        writeln!(
            f,
            "   Project Install Identifier: {}",
            self.project_install_identifier
        )?;
        writeln!(f, "   Supported Services: {:?}", self.supported_services)?;
        if !self.bus_devices.is_empty() {
            writeln!(f, "   Bus Devices:")?;
            let mut sorted = self.bus_devices.clone();
            sorted.sort_by_key(|d| d.address.pack());
            for device in &sorted {
                write!(f, "{device}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_null_padding_from_friendly_name() {
        let mut raw = [0u8; 30];
        raw[..4].copy_from_slice(b"knx1");
        assert_eq!(printable_friendly_name(&raw), "knx1");
    }

    #[test]
    fn replaces_non_printable_bytes() {
        let raw = [0x01, b'a', 0x02, 0];
        assert_eq!(printable_friendly_name(&raw), ".a.");
    }

    #[test]
    fn bus_devices_render_sorted_by_address() {
        let report = GatewayReport {
            host: "192.168.0.10:3671".parse().unwrap(),
            mac_address: [0; 6],
            knx_address: KnxAddress::new(1, 1, 0).unwrap(),
            device_serial: [0; 6],
            friendly_name: [0u8; 30],
            device_status: 0,
            knx_medium: 0x02,
            project_install_identifier: 0,
            supported_services: vec![0x02, 0x03],
            bus_devices: vec![
                BusDeviceReport {
                    address: KnxAddress::new(1, 1, 5).unwrap(),
                    device_descriptor: Some(0x0012),
                    device_serial: None,
                    manufacturer: Some("Siemens".to_string()),
                },
                BusDeviceReport {
                    address: KnxAddress::new(1, 1, 2).unwrap(),
                    device_descriptor: None,
                    device_serial: None,
                    manufacturer: None,
                },
            ],
        };
        let rendered = report.to_string();
        let pos_2 = rendered.find("1.1.2").unwrap();
        let pos_5 = rendered.find("1.1.5").unwrap();
        assert!(pos_2 < pos_5);
    }
}
