//! Host Protocol Address Info: the 8-octet IP:port descriptor embedded in
//! CONNECT, CONNECTIONSTATE, DISCONNECT, SEARCH, and DESCRIPTION frames.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::CodecError;

use super::cursor::Cursor;

const HPAI_LENGTH: u8 = 8;
const PROTOCOL_UDP: u8 = 0x01;
const PROTOCOL_TCP: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpaiProtocol {
    Udp,
    Tcp,
}

impl HpaiProtocol {
    fn code(self) -> u8 {
        match self {
            HpaiProtocol::Udp => PROTOCOL_UDP,
            HpaiProtocol::Tcp => PROTOCOL_TCP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hpai {
    pub protocol: HpaiProtocol,
    pub addr: SocketAddrV4,
}

impl Hpai {
    pub fn udp(addr: SocketAddrV4) -> Self {
        Hpai {
            protocol: HpaiProtocol::Udp,
            addr,
        }
    }

    pub const ENCODED_LEN: usize = 8;

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(HPAI_LENGTH);
        out.push(self.protocol.code());
        out.extend_from_slice(&self.addr.ip().octets());
        out.extend_from_slice(&self.addr.port().to_be_bytes());
    }

    pub fn decode(c: &mut Cursor<'_>) -> Result<Self, CodecError> {
        if c.remaining() < Self::ENCODED_LEN {
            return Err(CodecError::TruncatedHpai);
        }
        let length = c.u8()?;
        if length != HPAI_LENGTH {
            return Err(CodecError::BadHpaiLength(length));
        }
        let protocol_byte = c.u8()?;
        let protocol = match protocol_byte {
            PROTOCOL_UDP => HpaiProtocol::Udp,
            PROTOCOL_TCP => HpaiProtocol::Tcp,
            other => return Err(CodecError::UnsupportedHpaiProtocol(other)),
        };
        let octets = c.take(4)?;
        let ip = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
        let port = c.u16()?;
        Ok(Hpai {
            protocol,
            addr: SocketAddrV4::new(ip, port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let hpai = Hpai::udp("192.168.0.10:3671".parse().unwrap());
        let mut buf = Vec::new();
        hpai.encode(&mut buf);
        assert_eq!(buf.len(), Hpai::ENCODED_LEN);
        let mut c = Cursor::new(&buf);
        let decoded = Hpai::decode(&mut c).unwrap();
        assert_eq!(decoded, hpai);
    }

    #[test]
    fn rejects_truncated() {
        let buf = [0x08, 0x01, 0xc0, 0xa8];
        let mut c = Cursor::new(&buf);
        assert!(matches!(Hpai::decode(&mut c), Err(CodecError::TruncatedHpai)));
    }
}
