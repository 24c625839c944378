//! Static protocol constant tables.
//!
//! The source material keeps forward and reverse lookup tables (name->code
//! and code->name) as twin dicts. Here each table is a single tagged-variant
//! enum carrying its numeric value, with `code()`/`from_code()` as the one
//! source of truth for both directions.

/// KNXnet/IP header constants.
pub const PROTOCOL_VERSION: u8 = 0x10;
pub const HEADER_SIZE: u8 = 0x06;

/// Multicast group and default port used for gateway SEARCH.
pub const MULTICAST_GROUP: std::net::Ipv4Addr = std::net::Ipv4Addr::new(224, 0, 23, 12);
pub const DEFAULT_PORT: u16 = 3671;

/// KNXnet/IP service type identifiers (header bytes 2-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    SearchRequest,
    SearchResponse,
    DescriptionRequest,
    DescriptionResponse,
    ConnectRequest,
    ConnectResponse,
    ConnectionstateRequest,
    ConnectionstateResponse,
    DisconnectRequest,
    DisconnectResponse,
    TunnellingRequest,
    TunnellingAck,
    RoutingIndication,
}

impl ServiceType {
    pub const fn code(self) -> u16 {
        match self {
            ServiceType::SearchRequest => 0x0201,
            ServiceType::SearchResponse => 0x0202,
            ServiceType::DescriptionRequest => 0x0203,
            ServiceType::DescriptionResponse => 0x0204,
            ServiceType::ConnectRequest => 0x0205,
            ServiceType::ConnectResponse => 0x0206,
            ServiceType::ConnectionstateRequest => 0x0207,
            ServiceType::ConnectionstateResponse => 0x0208,
            ServiceType::DisconnectRequest => 0x0209,
            ServiceType::DisconnectResponse => 0x020a,
            ServiceType::TunnellingRequest => 0x0420,
            ServiceType::TunnellingAck => 0x0421,
            ServiceType::RoutingIndication => 0x0530,
        }
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x0201 => ServiceType::SearchRequest,
            0x0202 => ServiceType::SearchResponse,
            0x0203 => ServiceType::DescriptionRequest,
            0x0204 => ServiceType::DescriptionResponse,
            0x0205 => ServiceType::ConnectRequest,
            0x0206 => ServiceType::ConnectResponse,
            0x0207 => ServiceType::ConnectionstateRequest,
            0x0208 => ServiceType::ConnectionstateResponse,
            0x0209 => ServiceType::DisconnectRequest,
            0x020a => ServiceType::DisconnectResponse,
            0x0420 => ServiceType::TunnellingRequest,
            0x0421 => ServiceType::TunnellingAck,
            0x0530 => ServiceType::RoutingIndication,
            _ => return None,
        })
    }
}

/// KNXnet/IP status/error codes carried in response frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnxStatus {
    NoError,
    ConnectionId,
    ConnectionType,
    NoMoreConnections,
    TunnellingLayer,
    Other(u8),
}

impl KnxStatus {
    pub const fn code(self) -> u8 {
        match self {
            KnxStatus::NoError => 0x00,
            KnxStatus::ConnectionId => 0x21,
            KnxStatus::ConnectionType => 0x22,
            KnxStatus::NoMoreConnections => 0x24,
            KnxStatus::TunnellingLayer => 0x29,
            KnxStatus::Other(c) => c,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code {
            0x00 => KnxStatus::NoError,
            0x21 => KnxStatus::ConnectionId,
            0x22 => KnxStatus::ConnectionType,
            0x24 => KnxStatus::NoMoreConnections,
            0x29 => KnxStatus::TunnellingLayer,
            other => KnxStatus::Other(other),
        }
    }

    pub const fn is_error(self) -> bool {
        self.code() != 0x00
    }
}

/// cEMI message codes (first octet of a cEMI frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CemiMsgCode {
    LDataReq,
    LDataCon,
    LDataInd,
    LRawReq,
    LRawCon,
    LRawInd,
    LBusmonInd,
    LPollDataReq,
    LPollDataCon,
    MPropReadReq,
    MPropReadCon,
}

impl CemiMsgCode {
    pub const fn code(self) -> u8 {
        match self {
            CemiMsgCode::LDataReq => 0x11,
            CemiMsgCode::LDataCon => 0x2e,
            CemiMsgCode::LDataInd => 0x29,
            CemiMsgCode::LRawReq => 0x10,
            CemiMsgCode::LRawCon => 0x2f,
            CemiMsgCode::LRawInd => 0x2d,
            CemiMsgCode::LBusmonInd => 0x2b,
            CemiMsgCode::LPollDataReq => 0x13,
            CemiMsgCode::LPollDataCon => 0x25,
            CemiMsgCode::MPropReadReq => 0xfc,
            CemiMsgCode::MPropReadCon => 0xfb,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x11 => CemiMsgCode::LDataReq,
            0x2e => CemiMsgCode::LDataCon,
            0x29 => CemiMsgCode::LDataInd,
            0x10 => CemiMsgCode::LRawReq,
            0x2f => CemiMsgCode::LRawCon,
            0x2d => CemiMsgCode::LRawInd,
            0x2b => CemiMsgCode::LBusmonInd,
            0x13 => CemiMsgCode::LPollDataReq,
            0x25 => CemiMsgCode::LPollDataCon,
            0xfc => CemiMsgCode::MPropReadReq,
            0xfb => CemiMsgCode::MPropReadCon,
            _ => return None,
        })
    }
}

/// The 2-bit TPCI packet class, occupying `npdu[0][7:6]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpciClass {
    Udp,
    Ndp,
    Ucd,
    Ncd,
}

impl TpciClass {
    pub const fn bits(self) -> u8 {
        match self {
            TpciClass::Udp => 0b00,
            TpciClass::Ndp => 0b01,
            TpciClass::Ucd => 0b10,
            TpciClass::Ncd => 0b11,
        }
    }

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => TpciClass::Udp,
            0b01 => TpciClass::Ndp,
            0b10 => TpciClass::Ucd,
            _ => TpciClass::Ncd,
        }
    }
}

/// Control-bits carried in `npdu[0][1:0]` for UCD/NCD frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpciControl {
    Connect,
    Disconnect,
    Ack,
    Nak,
}

impl TpciControl {
    pub const fn bits(self) -> u8 {
        match self {
            TpciControl::Connect => 0b00,
            TpciControl::Disconnect => 0b01,
            TpciControl::Ack => 0b00,
            TpciControl::Nak => 0b11,
        }
    }

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => TpciControl::Disconnect,
            0b11 => TpciControl::Nak,
            _ => TpciControl::Connect,
        }
    }
}

/// Application-layer opcodes. `short` variants use a 4-bit prefix and steal
/// the low 6 bits of `npdu[1]` for inline data; `long` variants use the full
/// 10-bit field and carry their payload in `data[..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    GroupValueRead,
    GroupValueResponse,
    GroupValueWrite,
    IndividualAddressWrite,
    IndividualAddressRead,
    IndividualAddressResponse,
    AdcRead,
    AdcResponse,
    MemoryRead,
    MemoryResponse,
    MemoryWrite,
    UserMemoryRead,
    UserMemoryResponse,
    DeviceDescriptorRead,
    DeviceDescriptorResponse,
    Restart,
    AuthorizeRequest,
    AuthorizeResponse,
    PropertyValueRead,
    PropertyValueResponse,
    PropertyValueWrite,
    PropertyDescriptionRead,
    PropertyDescriptionResponse,
}

impl Apci {
    /// 10-bit code as it appears spanning `npdu[0][1:0]` (high) and
    /// `npdu[1][7:2]` (low).
    pub const fn code(self) -> u16 {
        match self {
            Apci::GroupValueRead => 0x000,
            Apci::GroupValueResponse => 0x040,
            Apci::GroupValueWrite => 0x080,
            Apci::IndividualAddressWrite => 0x0c0,
            Apci::IndividualAddressRead => 0x100,
            Apci::IndividualAddressResponse => 0x140,
            Apci::AdcRead => 0x180,
            Apci::AdcResponse => 0x1c0,
            Apci::MemoryRead => 0x200,
            Apci::MemoryResponse => 0x240,
            Apci::MemoryWrite => 0x280,
            Apci::UserMemoryRead => 0x2c0,
            Apci::UserMemoryResponse => 0x2c1,
            Apci::DeviceDescriptorRead => 0x300,
            Apci::DeviceDescriptorResponse => 0x340,
            Apci::Restart => 0x380,
            Apci::AuthorizeRequest => 0x3d1,
            Apci::AuthorizeResponse => 0x3d2,
            Apci::PropertyValueRead => 0x3d5,
            Apci::PropertyValueResponse => 0x3d6,
            Apci::PropertyValueWrite => 0x3d7,
            Apci::PropertyDescriptionRead => 0x3d8,
            Apci::PropertyDescriptionResponse => 0x3d9,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        use Apci::*;
        // Some opcodes are fully specified by their top 4 bits ("short"
        // APCIs), others need the full 10 bits ("long" APCIs). Match long
        // ones first since they're more specific.
        for candidate in [
            AuthorizeRequest,
            AuthorizeResponse,
            PropertyValueRead,
            PropertyValueResponse,
            PropertyValueWrite,
            PropertyDescriptionRead,
            PropertyDescriptionResponse,
            UserMemoryResponse,
        ] {
            if candidate.code() == code {
                return Some(candidate);
            }
        }
        let short = code & 0x3c0;
        Some(match short {
            0x000 => GroupValueRead,
            0x040 => GroupValueResponse,
            0x080 => GroupValueWrite,
            0x0c0 => IndividualAddressWrite,
            0x100 => IndividualAddressRead,
            0x140 => IndividualAddressResponse,
            0x180 => AdcRead,
            0x1c0 => AdcResponse,
            0x200 => MemoryRead,
            0x240 => MemoryResponse,
            0x280 => MemoryWrite,
            0x2c0 => UserMemoryRead,
            0x300 => DeviceDescriptorRead,
            0x340 => DeviceDescriptorResponse,
            0x380 => Restart,
            _ => return None,
        })
    }

    /// Whether this opcode is encoded "short" (4-bit prefix, inline 6-bit
    /// data in `npdu[1]`) rather than "long" (full 10-bit code, payload in
    /// `data[..]`).
    pub const fn is_short(self) -> bool {
        !matches!(
            self,
            Apci::UserMemoryResponse
                | Apci::AuthorizeRequest
                | Apci::AuthorizeResponse
                | Apci::PropertyValueRead
                | Apci::PropertyValueResponse
                | Apci::PropertyValueWrite
                | Apci::PropertyDescriptionRead
                | Apci::PropertyDescriptionResponse
        )
    }

    /// The response opcode expected for a given request opcode, per the
    /// fixed *_Read -> *_Response pairing table.
    pub const fn expected_response(self) -> Option<Apci> {
        Some(match self {
            Apci::GroupValueRead => Apci::GroupValueResponse,
            Apci::IndividualAddressRead => Apci::IndividualAddressResponse,
            Apci::AdcRead => Apci::AdcResponse,
            Apci::MemoryRead => Apci::MemoryResponse,
            Apci::UserMemoryRead => Apci::UserMemoryResponse,
            Apci::DeviceDescriptorRead => Apci::DeviceDescriptorResponse,
            Apci::AuthorizeRequest => Apci::AuthorizeResponse,
            Apci::PropertyValueRead => Apci::PropertyValueResponse,
            Apci::PropertyDescriptionRead => Apci::PropertyDescriptionResponse,
            _ => return None,
        })
    }
}

/// Device descriptor -> mask version name table (`DEVICE_DESCRIPTORS` in the
/// source material). Only the well-known values are named; anything else
/// renders as "Unknown".
pub fn device_descriptor_name(value: u16) -> &'static str {
    match value {
        0x0010..=0x0013 => "System 1 (BCU1)",
        0x0020..=0x002f => "System 2 (BCU2)",
        0x0300 => "System 300",
        0x0700 | 0x0701 => "System 7 (BIM M112)",
        0x0810 | 0x0811 => "System B (IR Decoder)",
        0x0910 | 0x091a => "System 1 (Coupler)",
        0x1012 => "System 2 (BCU2, Multi-function)",
        _ => "Unknown",
    }
}
