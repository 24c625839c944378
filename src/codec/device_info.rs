//! `DIB_DEVICE_INFO` and `DIB_SUPP_SVC_FAMILIES` description blocks carried
//! in SEARCH_RESPONSE and DESCRIPTION_RESPONSE frames.

use crate::error::CodecError;

use super::cursor::Cursor;

const DESCRIPTION_TYPE_DEVICE_INFO: u8 = 0x01;
const DESCRIPTION_TYPE_SUPP_SVC_FAMILIES: u8 = 0x02;
const DEVICE_INFO_LEN: u8 = 54;
const FRIENDLY_NAME_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfoDib {
    pub knx_medium: u8,
    pub device_status: u8,
    pub knx_address: u16,
    pub project_install_identifier: u16,
    pub knx_device_serial: [u8; 6],
    pub multicast_address: std::net::Ipv4Addr,
    pub mac_address: [u8; 6],
    /// Raw, null-padded 30-byte friendly name as carried on the wire.
    pub friendly_name: [u8; FRIENDLY_NAME_LEN],
}

impl DeviceInfoDib {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(DEVICE_INFO_LEN);
        out.push(DESCRIPTION_TYPE_DEVICE_INFO);
        out.push(self.knx_medium);
        out.push(self.device_status);
        out.extend_from_slice(&self.knx_address.to_be_bytes());
        out.extend_from_slice(&self.project_install_identifier.to_be_bytes());
        out.extend_from_slice(&self.knx_device_serial);
        out.extend_from_slice(&self.multicast_address.octets());
        out.extend_from_slice(&self.mac_address);
        out.extend_from_slice(&self.friendly_name);
    }

    pub fn decode(c: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let structure_length = c.u8()?;
        if structure_length != DEVICE_INFO_LEN {
            return Err(CodecError::LengthMismatch {
                declared: structure_length as usize,
                actual: DEVICE_INFO_LEN as usize,
            });
        }
        let _description_type = c.u8()?;
        let knx_medium = c.u8()?;
        let device_status = c.u8()?;
        let knx_address = c.u16()?;
        let project_install_identifier = c.u16()?;
        let mut knx_device_serial = [0u8; 6];
        knx_device_serial.copy_from_slice(c.take(6)?);
        let mc = c.take(4)?;
        let multicast_address = std::net::Ipv4Addr::new(mc[0], mc[1], mc[2], mc[3]);
        let mut mac_address = [0u8; 6];
        mac_address.copy_from_slice(c.take(6)?);
        let mut friendly_name = [0u8; FRIENDLY_NAME_LEN];
        friendly_name.copy_from_slice(c.take(FRIENDLY_NAME_LEN)?);
        Ok(DeviceInfoDib {
            knx_medium,
            device_status,
            knx_address,
            project_install_identifier,
            knx_device_serial,
            multicast_address,
            mac_address,
            friendly_name,
        })
    }
}

/// One entry in `DIB_SUPP_SVC_FAMILIES`: a service family id and the
/// version of that family the gateway supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceFamily {
    pub id: u8,
    pub version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuppSvcFamiliesDib {
    pub families: Vec<ServiceFamily>,
}

impl SuppSvcFamiliesDib {
    pub fn encode(&self, out: &mut Vec<u8>) {
        let length = 2 + self.families.len() * 2;
        out.push(length as u8);
        out.push(DESCRIPTION_TYPE_SUPP_SVC_FAMILIES);
        for f in &self.families {
            out.push(f.id);
            out.push(f.version);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let structure_length = c.u8()? as usize;
        let _description_type = c.u8()?;
        if structure_length < 2 || (structure_length - 2) % 2 != 0 {
            return Err(CodecError::LengthMismatch {
                declared: structure_length,
                actual: structure_length,
            });
        }
        let pairs = (structure_length - 2) / 2;
        let mut families = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            let id = c.u8()?;
            let version = c.u8()?;
            families.push(ServiceFamily { id, version });
        }
        Ok(SuppSvcFamiliesDib { families })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_roundtrip() {
        let dib = DeviceInfoDib {
            knx_medium: 0x02,
            device_status: 0x00,
            knx_address: 0x1101,
            project_install_identifier: 0x0000,
            knx_device_serial: [0x00, 0xfa, 0x12, 0x34, 0x56, 0x78],
            multicast_address: std::net::Ipv4Addr::new(0, 0, 0, 0),
            mac_address: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            friendly_name: {
                let mut n = [0u8; 30];
                n[..4].copy_from_slice(b"test");
                n
            },
        };
        let mut buf = Vec::new();
        dib.encode(&mut buf);
        let mut c = Cursor::new(&buf);
        assert_eq!(DeviceInfoDib::decode(&mut c).unwrap(), dib);
    }

    #[test]
    fn service_families_roundtrip() {
        let dib = SuppSvcFamiliesDib {
            families: vec![
                ServiceFamily { id: 0x02, version: 1 },
                ServiceFamily { id: 0x03, version: 2 },
            ],
        };
        let mut buf = Vec::new();
        dib.encode(&mut buf);
        let mut c = Cursor::new(&buf);
        assert_eq!(SuppSvcFamiliesDib::decode(&mut c).unwrap(), dib);
    }
}
