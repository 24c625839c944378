//! Structured error types for every protocol layer.
//!
//! Each layer gets its own `thiserror`-derived enum carrying enough context
//! (target, sequence number, raw bytes) to log usefully, instead of a single
//! numeric error code.

use std::net::SocketAddr;

use crate::address::KnxAddress;

/// Errors raised while decoding or encoding wire frames.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("unsupported protocol version 0x{0:02x}, expected 0x10")]
    BadVersion(u8),

    #[error("unexpected header size {0}, expected 6")]
    BadHeaderSize(u8),

    #[error("total_length field ({declared}) disagrees with actual body length ({actual})")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("unknown service type 0x{0:04x}")]
    UnknownServiceType(u16),

    #[error("truncated HPAI structure")]
    TruncatedHpai,

    #[error("HPAI length field was {0}, expected 8")]
    BadHpaiLength(u8),

    #[error("unsupported HPAI protocol id 0x{0:02x}")]
    UnsupportedHpaiProtocol(u8),

    #[error("cEMI frame too short for its additional-info block")]
    TruncatedAdditionalInfo,

    #[error("cEMI frame too short for NPDU of declared length {0}")]
    TruncatedNpdu(usize),

    #[error("unknown cEMI message code 0x{0:02x}")]
    UnknownMessageCode(u8),

    #[error("decoding this message is intentionally unsupported in this version")]
    Unsupported,
}

/// Errors raised while parsing a `KnxAddress` or address-range spec from
/// CLI/string input. Kept separate from `CodecError`, which carries real
/// wire offset/length context that these failures have none of.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("individual address needs 3 dot-separated segments (area.line.device), got {0}")]
    WrongSegmentCount(usize),

    #[error("{0:?} is not a valid 0-255 integer segment")]
    InvalidSegment(String),

    #[error("{0}.{1}.{2} is out of range (area 1-15, line 0-15)")]
    OutOfRange(u8, u8, u8),

    #[error("range end {to} precedes range start {from}")]
    DescendingRange { from: KnxAddress, to: KnxAddress },
}

/// Errors raised while establishing or maintaining a tunnel connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("gateway {gateway} refused CONNECT_REQUEST with status 0x{status:02x}")]
    ConnectionRefused { gateway: SocketAddr, status: u8 },

    #[error("no CONNECT_RESPONSE from {gateway} within {0:?}", .timeout)]
    Timeout {
        gateway: SocketAddr,
        timeout: std::time::Duration,
    },

    #[error("malformed response from {gateway}: {source}")]
    Codec {
        gateway: SocketAddr,
        #[source]
        source: CodecError,
    },

    #[error("socket error talking to {gateway}: {source}")]
    Io {
        gateway: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while sending a cEMI frame through an open tunnel.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("TUNNELLING_ACK for seq {seq} never arrived (retried once)")]
    AckTimeout { seq: u8 },

    #[error("no confirmation/indication correlated to seq {seq} within the response window")]
    ResponseTimeout { seq: u8 },

    #[error("gateway reported protocol error status 0x{status:02x} for seq {seq}")]
    Protocol { seq: u8, status: u8 },

    #[error("tunnel is not open (phase = {phase})")]
    NotOpen { phase: &'static str },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan was cancelled")]
    Cancelled,
}

/// Errors raised by the TPCI sublayer when talking to an individual bus
/// device across an established tunnel.
#[derive(Debug, thiserror::Error)]
pub enum TpciError {
    #[error("bus target {target} did not respond within the TPCI response window")]
    Unreachable { target: KnxAddress },

    #[error("underlying tunnel send failed: {0}")]
    Send(#[from] SendError),

    #[error("bus target {target} sent an unsolicited T_Disconnect")]
    PeerDisconnected { target: KnxAddress },

    #[error("scan was cancelled")]
    Cancelled,
}

/// Top-level error surfaced by the scan scheduler for a single gateway or
/// target; never fatal to the whole scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("connecting to gateway failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("gateway send failed: {0}")]
    Send(#[from] SendError),

    #[error("bus target unreachable: {0}")]
    Tpci(#[from] TpciError),

    #[error("no targets given")]
    NoTargets,

    #[error("malformed response: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error binding scan socket: {0}")]
    Io(#[from] std::io::Error),
}
