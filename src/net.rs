//! Socket construction shared by discovery and tunnel connect. Binding
//! through `socket2` first lets us set `SO_BINDTODEVICE` before the socket
//! is handed to tokio (mirrors the socket2-then-tokio conversion pattern
//! used for UDP sockets elsewhere in the ecosystem).

use std::io;
use std::net::{SocketAddr, SocketAddrV4};

use socket2::{Domain, SockAddr, Socket, Type};
use tokio::net::UdpSocket;

/// Binds a non-blocking UDP socket to `local`. When `iface` is given (e.g.
/// `"eth0"`), restricts the socket to that interface via
/// `SO_BINDTODEVICE` before binding the address.
pub fn bind_udp(local: SocketAddrV4, iface: Option<&str>) -> io::Result<UdpSocket> {
    let addr = SockAddr::from(SocketAddr::V4(local));
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
    if let Some(name) = iface {
        socket.bind_device(Some(name.as_bytes()))?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr)?;
    UdpSocket::try_from(std::net::UdpSocket::from(socket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn binds_without_iface() {
        let local = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);
        let socket = bind_udp(local, None).unwrap();
        assert!(socket.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn rejects_unknown_iface() {
        let local = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);
        assert!(bind_udp(local, Some("not-a-real-iface-xyz")).is_err());
    }
}
