//! KNXnet/IP frames: the 6-byte header plus one service-specific body per
//! `ServiceType`.

use crate::constants::{ServiceType, HEADER_SIZE, PROTOCOL_VERSION};
use crate::error::CodecError;

use super::cemi::Cemi;
use super::cursor::Cursor;
use super::device_info::{DeviceInfoDib, SuppSvcFamiliesDib};
use super::hpai::Hpai;

pub const CONNECTION_TYPE_TUNNEL: u8 = 0x04;
pub const TUNNEL_LINKLAYER: u8 = 0x02;

/// `CRI` sent in a CONNECT_REQUEST: which kind of connection we want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cri {
    pub connection_type: u8,
    pub knx_layer: u8,
}

impl Cri {
    pub fn tunnel_linklayer() -> Self {
        Cri {
            connection_type: CONNECTION_TYPE_TUNNEL,
            knx_layer: TUNNEL_LINKLAYER,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(4);
        out.push(self.connection_type);
        out.push(self.knx_layer);
        out.push(0x00);
    }

    fn decode(c: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let length = c.u8()? as usize;
        if c.remaining() < length.saturating_sub(1) {
            return Err(CodecError::TooShort {
                need: length - 1,
                got: c.remaining(),
            });
        }
        let connection_type = c.u8()?;
        let knx_layer = c.u8()?;
        let _reserved = c.u8()?;
        Ok(Cri {
            connection_type,
            knx_layer,
        })
    }
}

/// `CRD` returned in a CONNECT_RESPONSE: the channel's assigned individual
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crd {
    pub connection_type: u8,
    pub individual_address: u16,
}

impl Crd {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(4);
        out.push(self.connection_type);
        out.extend_from_slice(&self.individual_address.to_be_bytes());
    }

    fn decode(c: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let _length = c.u8()?;
        let connection_type = c.u8()?;
        let individual_address = c.u16()?;
        Ok(Crd {
            connection_type,
            individual_address,
        })
    }
}

/// A fully typed KNXnet/IP frame body, one variant per `ServiceType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnxnetipBody {
    SearchRequest {
        discovery_endpoint: Hpai,
    },
    SearchResponse {
        control_endpoint: Hpai,
        device_info: DeviceInfoDib,
        supp_svc_families: SuppSvcFamiliesDib,
    },
    DescriptionRequest {
        discovery_endpoint: Hpai,
    },
    DescriptionResponse {
        device_info: DeviceInfoDib,
        supp_svc_families: SuppSvcFamiliesDib,
    },
    ConnectRequest {
        control_endpoint: Hpai,
        data_endpoint: Hpai,
        cri: Cri,
    },
    ConnectResponse {
        channel_id: u8,
        status: u8,
        data_endpoint: Hpai,
        crd: Crd,
    },
    ConnectionstateRequest {
        channel_id: u8,
        control_endpoint: Hpai,
    },
    ConnectionstateResponse {
        channel_id: u8,
        status: u8,
    },
    DisconnectRequest {
        channel_id: u8,
        control_endpoint: Hpai,
    },
    DisconnectResponse {
        channel_id: u8,
        status: u8,
    },
    TunnellingRequest {
        channel_id: u8,
        seq: u8,
        cemi: Cemi,
    },
    TunnellingAck {
        channel_id: u8,
        seq: u8,
        status: u8,
    },
}

impl KnxnetipBody {
    pub(crate) fn service_type(&self) -> ServiceType {
        match self {
            KnxnetipBody::SearchRequest { .. } => ServiceType::SearchRequest,
            KnxnetipBody::SearchResponse { .. } => ServiceType::SearchResponse,
            KnxnetipBody::DescriptionRequest { .. } => ServiceType::DescriptionRequest,
            KnxnetipBody::DescriptionResponse { .. } => ServiceType::DescriptionResponse,
            KnxnetipBody::ConnectRequest { .. } => ServiceType::ConnectRequest,
            KnxnetipBody::ConnectResponse { .. } => ServiceType::ConnectResponse,
            KnxnetipBody::ConnectionstateRequest { .. } => ServiceType::ConnectionstateRequest,
            KnxnetipBody::ConnectionstateResponse { .. } => ServiceType::ConnectionstateResponse,
            KnxnetipBody::DisconnectRequest { .. } => ServiceType::DisconnectRequest,
            KnxnetipBody::DisconnectResponse { .. } => ServiceType::DisconnectResponse,
            KnxnetipBody::TunnellingRequest { .. } => ServiceType::TunnellingRequest,
            KnxnetipBody::TunnellingAck { .. } => ServiceType::TunnellingAck,
        }
    }

    fn encode_body(&self, out: &mut Vec<u8>) {
        match self {
            KnxnetipBody::SearchRequest { discovery_endpoint } => {
                discovery_endpoint.encode(out);
            }
            KnxnetipBody::SearchResponse {
                control_endpoint,
                device_info,
                supp_svc_families,
            } => {
                control_endpoint.encode(out);
                device_info.encode(out);
                supp_svc_families.encode(out);
            }
            KnxnetipBody::DescriptionRequest { discovery_endpoint } => {
                discovery_endpoint.encode(out);
            }
            KnxnetipBody::DescriptionResponse {
                device_info,
                supp_svc_families,
            } => {
                device_info.encode(out);
                supp_svc_families.encode(out);
            }
            KnxnetipBody::ConnectRequest {
                control_endpoint,
                data_endpoint,
                cri,
            } => {
                control_endpoint.encode(out);
                data_endpoint.encode(out);
                cri.encode(out);
            }
            KnxnetipBody::ConnectResponse {
                channel_id,
                status,
                data_endpoint,
                crd,
            } => {
                out.push(*channel_id);
                out.push(*status);
                data_endpoint.encode(out);
                crd.encode(out);
            }
            KnxnetipBody::ConnectionstateRequest {
                channel_id,
                control_endpoint,
            } => {
                out.push(*channel_id);
                out.push(0x00);
                control_endpoint.encode(out);
            }
            KnxnetipBody::ConnectionstateResponse { channel_id, status } => {
                out.push(*channel_id);
                out.push(*status);
            }
            KnxnetipBody::DisconnectRequest {
                channel_id,
                control_endpoint,
            } => {
                out.push(*channel_id);
                out.push(0x00);
                control_endpoint.encode(out);
            }
            KnxnetipBody::DisconnectResponse { channel_id, status } => {
                out.push(*channel_id);
                out.push(*status);
            }
            KnxnetipBody::TunnellingRequest {
                channel_id,
                seq,
                cemi,
            } => {
                out.push(4); // structure length of the connection header
                out.push(*channel_id);
                out.push(*seq);
                out.push(0x00);
                out.extend_from_slice(&cemi.encode());
            }
            KnxnetipBody::TunnellingAck {
                channel_id,
                seq,
                status,
            } => {
                out.push(4);
                out.push(*channel_id);
                out.push(*seq);
                out.push(*status);
            }
        }
    }

    fn decode_body(service_type: ServiceType, c: &mut Cursor<'_>) -> Result<Self, CodecError> {
        Ok(match service_type {
            ServiceType::SearchRequest => KnxnetipBody::SearchRequest {
                discovery_endpoint: Hpai::decode(c)?,
            },
            ServiceType::SearchResponse => KnxnetipBody::SearchResponse {
                control_endpoint: Hpai::decode(c)?,
                device_info: DeviceInfoDib::decode(c)?,
                supp_svc_families: SuppSvcFamiliesDib::decode(c)?,
            },
            ServiceType::DescriptionRequest => KnxnetipBody::DescriptionRequest {
                discovery_endpoint: Hpai::decode(c)?,
            },
            ServiceType::DescriptionResponse => KnxnetipBody::DescriptionResponse {
                device_info: DeviceInfoDib::decode(c)?,
                supp_svc_families: SuppSvcFamiliesDib::decode(c)?,
            },
            ServiceType::ConnectRequest => KnxnetipBody::ConnectRequest {
                control_endpoint: Hpai::decode(c)?,
                data_endpoint: Hpai::decode(c)?,
                cri: Cri::decode(c)?,
            },
            ServiceType::ConnectResponse => {
                let channel_id = c.u8()?;
                let status = c.u8()?;
                if status != 0 {
                    // A refused CONNECT_REQUEST carries no HPAI/CRD.
                    return Ok(KnxnetipBody::ConnectResponse {
                        channel_id,
                        status,
                        data_endpoint: Hpai::udp("0.0.0.0:0".parse().unwrap()),
                        crd: Crd {
                            connection_type: 0,
                            individual_address: 0,
                        },
                    });
                }
                KnxnetipBody::ConnectResponse {
                    channel_id,
                    status,
                    data_endpoint: Hpai::decode(c)?,
                    crd: Crd::decode(c)?,
                }
            }
            ServiceType::ConnectionstateRequest => {
                let channel_id = c.u8()?;
                let _reserved = c.u8()?;
                KnxnetipBody::ConnectionstateRequest {
                    channel_id,
                    control_endpoint: Hpai::decode(c)?,
                }
            }
            ServiceType::ConnectionstateResponse => KnxnetipBody::ConnectionstateResponse {
                channel_id: c.u8()?,
                status: c.u8()?,
            },
            ServiceType::DisconnectRequest => {
                let channel_id = c.u8()?;
                let _reserved = c.u8()?;
                KnxnetipBody::DisconnectRequest {
                    channel_id,
                    control_endpoint: Hpai::decode(c)?,
                }
            }
            ServiceType::DisconnectResponse => KnxnetipBody::DisconnectResponse {
                channel_id: c.u8()?,
                status: c.u8()?,
            },
            ServiceType::TunnellingRequest => {
                let _hdr_len = c.u8()?;
                let channel_id = c.u8()?;
                let seq = c.u8()?;
                let _reserved = c.u8()?;
                let cemi = Cemi::decode(c.rest())?;
                KnxnetipBody::TunnellingRequest {
                    channel_id,
                    seq,
                    cemi,
                }
            }
            ServiceType::TunnellingAck => {
                let _hdr_len = c.u8()?;
                let channel_id = c.u8()?;
                let seq = c.u8()?;
                let status = c.u8()?;
                KnxnetipBody::TunnellingAck {
                    channel_id,
                    seq,
                    status,
                }
            }
            ServiceType::RoutingIndication => {
                let cemi = Cemi::decode(c.rest())?;
                KnxnetipBody::TunnellingRequest {
                    channel_id: 0,
                    seq: 0,
                    cemi,
                }
            }
        })
    }
}

/// Reads just the connection header (channel_id, seq) of a
/// TUNNELLING_REQUEST without decoding its cEMI body. Used to still ACK a
/// frame whose cEMI payload is an intentionally unsupported variant (e.g.
/// `L_Busmon.ind`) and would otherwise fail a full `KnxnetipFrame::decode`.
pub fn peek_tunnelling_request_header(buf: &[u8]) -> Option<(u8, u8)> {
    let mut c = Cursor::new(buf);
    let _version = c.u8().ok()?;
    let _header_size = c.u8().ok()?;
    let service_code = c.u16().ok()?;
    let _total_length = c.u16().ok()?;
    if service_code != ServiceType::TunnellingRequest.code() {
        return None;
    }
    let _hdr_len = c.u8().ok()?;
    let channel_id = c.u8().ok()?;
    let seq = c.u8().ok()?;
    Some((channel_id, seq))
}

/// A complete KNXnet/IP frame: the 6-byte header plus its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnxnetipFrame {
    pub body: KnxnetipBody,
}

impl KnxnetipFrame {
    pub fn new(body: KnxnetipBody) -> Self {
        KnxnetipFrame { body }
    }

    /// Serializes the frame, computing `total_length` from the encoded
    /// body -- the caller never sets it by hand.
    pub fn encode(&self) -> Vec<u8> {
        let mut body_bytes = Vec::new();
        self.body.encode_body(&mut body_bytes);
        let total_length = (HEADER_SIZE as usize + body_bytes.len()) as u16;
        let mut out = Vec::with_capacity(total_length as usize);
        out.push(PROTOCOL_VERSION);
        out.push(HEADER_SIZE);
        out.extend_from_slice(&self.body.service_type().code().to_be_bytes());
        out.extend_from_slice(&total_length.to_be_bytes());
        out.extend_from_slice(&body_bytes);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut c = Cursor::new(buf);
        let version = c.u8()?;
        if version != PROTOCOL_VERSION {
            return Err(CodecError::BadVersion(version));
        }
        let header_size = c.u8()?;
        if header_size != HEADER_SIZE {
            return Err(CodecError::BadHeaderSize(header_size));
        }
        let service_code = c.u16()?;
        let total_length = c.u16()? as usize;
        if total_length != buf.len() {
            return Err(CodecError::LengthMismatch {
                declared: total_length,
                actual: buf.len(),
            });
        }
        let service_type = ServiceType::from_code(service_code)
            .ok_or(CodecError::UnknownServiceType(service_code))?;
        let body = KnxnetipBody::decode_body(service_type, &mut c)?;
        Ok(KnxnetipFrame { body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::device_info::ServiceFamily;

    fn sample_dib() -> (DeviceInfoDib, SuppSvcFamiliesDib) {
        (
            DeviceInfoDib {
                knx_medium: 0x02,
                device_status: 0x00,
                knx_address: 0x1101,
                project_install_identifier: 0,
                knx_device_serial: [0; 6],
                multicast_address: std::net::Ipv4Addr::new(0, 0, 0, 0),
                mac_address: [0; 6],
                friendly_name: [0u8; 30],
            },
            SuppSvcFamiliesDib {
                families: vec![ServiceFamily { id: 0x02, version: 1 }],
            },
        )
    }

    #[test]
    fn search_request_roundtrip() {
        let frame = KnxnetipFrame::new(KnxnetipBody::SearchRequest {
            discovery_endpoint: Hpai::udp("192.168.0.10:3671".parse().unwrap()),
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }

    #[test]
    fn description_response_roundtrip() {
        let (device_info, supp_svc_families) = sample_dib();
        let frame = KnxnetipFrame::new(KnxnetipBody::DescriptionResponse {
            device_info,
            supp_svc_families,
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }

    #[test]
    fn connect_request_roundtrip() {
        let frame = KnxnetipFrame::new(KnxnetipBody::ConnectRequest {
            control_endpoint: Hpai::udp("192.168.0.10:55555".parse().unwrap()),
            data_endpoint: Hpai::udp("192.168.0.10:55556".parse().unwrap()),
            cri: Cri::tunnel_linklayer(),
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }

    #[test]
    fn connect_response_roundtrip() {
        let frame = KnxnetipFrame::new(KnxnetipBody::ConnectResponse {
            channel_id: 0x25,
            status: 0x00,
            data_endpoint: Hpai::udp("192.168.0.10:55556".parse().unwrap()),
            crd: Crd {
                connection_type: CONNECTION_TYPE_TUNNEL,
                individual_address: 0x1101,
            },
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }

    #[test]
    fn connect_response_refused_has_no_trailing_fields() {
        let frame = KnxnetipFrame::new(KnxnetipBody::ConnectResponse {
            channel_id: 0x00,
            status: 0x24,
            data_endpoint: Hpai::udp("0.0.0.0:0".parse().unwrap()),
            crd: Crd {
                connection_type: 0,
                individual_address: 0,
            },
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }

    #[test]
    fn rejects_bad_version() {
        let buf = [0x11, 0x06, 0x02, 0x03, 0x00, 0x06];
        assert_eq!(KnxnetipFrame::decode(&buf), Err(CodecError::BadVersion(0x11)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let buf = [0x10, 0x06, 0x02, 0x03, 0x00, 0xff];
        assert!(matches!(
            KnxnetipFrame::decode(&buf),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn tunnelling_ack_roundtrip() {
        let frame = KnxnetipFrame::new(KnxnetipBody::TunnellingAck {
            channel_id: 0x25,
            seq: 7,
            status: 0x00,
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }

    #[test]
    fn tunnelling_request_with_cemi_roundtrip() {
        use crate::codec::cemi::{ApciPayload, Cemi, Tpci};
        use crate::constants::Apci;
        let cemi = Cemi::l_data_req(
            0x1101,
            0x1102,
            false,
            Tpci::Ndp {
                seq: 0,
                apci: Apci::DeviceDescriptorRead,
                payload: ApciPayload::Inline6(0),
            },
        );
        let frame = KnxnetipFrame::new(KnxnetipBody::TunnellingRequest {
            channel_id: 0x25,
            seq: 0,
            cemi,
        });
        let buf = frame.encode();
        assert_eq!(KnxnetipFrame::decode(&buf).unwrap(), frame);
    }
}
