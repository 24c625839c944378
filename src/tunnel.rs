//! Tunnel connection: owns one UDP socket exclusively for the lifetime of
//! one gateway connection (grounded on the teacher's per-connection
//! ownership of its serial port, generalized to "one task, one socket, no
//! mutex needed").

use std::collections::VecDeque;
use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::codec::cemi::Cemi;
use crate::codec::frame::{Cri, KnxnetipBody, KnxnetipFrame};
use crate::codec::hpai::Hpai;
use crate::config::ScanConfig;
use crate::constants::{CemiMsgCode, KnxStatus};
use crate::error::{ConnectError, SendError};
use crate::net::bind_udp;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub channel_id: u8,
    pub remote: SocketAddrV4,
    pub control_endpoint: Hpai,
    pub data_endpoint: Hpai,
    /// The individual address the gateway assigned us for this tunnel
    /// (from the CONNECT_RESPONSE's CRD), used as cEMI source address for
    /// everything the TPCI layer sends.
    pub local_individual_address: u16,
    pub outbound_seq: u8,
    pub inbound_seq: u8,
    pub phase: Phase,
}

/// An open tunnel to a single KNXnet/IP gateway. Exclusive owner of the
/// underlying socket -- callers drive it one operation at a time, which
/// the ordering guarantees require anyway.
pub struct Tunnel {
    socket: UdpSocket,
    pub state: ConnectionState,
    last_heartbeat: Instant,
    missed_heartbeats: u32,
    last_inbound_seq: Option<u8>,
    /// L_Data.con/ind frames observed while waiting on a TUNNELLING_ACK,
    /// ACKed already but not yet handed to a caller. `recv_indication`
    /// drains this before touching the socket.
    pending_indications: VecDeque<Cemi>,
}

impl Tunnel {
    /// Opens a UDP socket, sends CONNECT_REQUEST, and waits for
    /// CONNECT_RESPONSE.
    pub async fn connect(
        local: SocketAddrV4,
        gateway: SocketAddrV4,
        cfg: &ScanConfig,
    ) -> Result<Tunnel, ConnectError> {
        let socket = bind_udp(local, cfg.iface.as_deref())
            .map_err(|source| ConnectError::Io { gateway: gateway.into(), source })?;
        socket
            .connect(gateway)
            .await
            .map_err(|source| ConnectError::Io { gateway: gateway.into(), source })?;

        let control_endpoint = Hpai::udp(local);
        let data_endpoint = Hpai::udp(local);
        let request = KnxnetipFrame::new(KnxnetipBody::ConnectRequest {
            control_endpoint,
            data_endpoint,
            cri: Cri::tunnel_linklayer(),
        });
        socket
            .send(&request.encode())
            .await
            .map_err(|source| ConnectError::Io { gateway: gateway.into(), source })?;

        let mut buf = [0u8; 1024];
        let n = timeout(cfg.connect_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| ConnectError::Timeout {
                gateway: gateway.into(),
                timeout: cfg.connect_timeout,
            })?
            .map_err(|source| ConnectError::Io { gateway: gateway.into(), source })?;

        let frame = KnxnetipFrame::decode(&buf[..n])
            .map_err(|source| ConnectError::Codec { gateway: gateway.into(), source })?;

        match frame.body {
            KnxnetipBody::ConnectResponse { channel_id, status, data_endpoint, crd } => {
                if status != KnxStatus::NoError.code() {
                    return Err(ConnectError::ConnectionRefused { gateway: gateway.into(), status });
                }
                Ok(Tunnel {
                    socket,
                    state: ConnectionState {
                        channel_id,
                        remote: gateway,
                        control_endpoint,
                        data_endpoint,
                        local_individual_address: crd.individual_address,
                        outbound_seq: 0,
                        inbound_seq: 0,
                        phase: Phase::Open,
                    },
                    last_heartbeat: Instant::now(),
                    missed_heartbeats: 0,
                    last_inbound_seq: None,
                    pending_indications: VecDeque::new(),
                })
            }
            other => Err(ConnectError::Codec {
                gateway: gateway.into(),
                source: crate::error::CodecError::UnknownServiceType(other.service_type().code()),
            }),
        }
    }

    /// Sends DISCONNECT_REQUEST, waits briefly for DISCONNECT_RESPONSE,
    /// and unconditionally transitions to Closed.
    pub async fn disconnect(&mut self, cfg: &ScanConfig) {
        self.state.phase = Phase::Closing;
        let request = KnxnetipFrame::new(KnxnetipBody::DisconnectRequest {
            channel_id: self.state.channel_id,
            control_endpoint: self.state.control_endpoint,
        });
        if self.socket.send(&request.encode()).await.is_ok() {
            let mut buf = [0u8; 512];
            let _ = timeout(Duration::from_secs(1), self.socket.recv(&mut buf)).await;
        }
        self.state.phase = Phase::Closed;
    }

    /// Sends a cEMI frame wrapped in TUNNELLING_REQUEST, retrying once on
    /// ACK timeout. Does not wait for L_Data.con/ind; callers use
    /// `recv_indication` for that.
    pub async fn send_request(&mut self, cemi: &Cemi, cfg: &ScanConfig) -> Result<(), SendError> {
        if self.state.phase != Phase::Open {
            return Err(SendError::NotOpen { phase: phase_name(self.state.phase) });
        }
        let seq = self.state.outbound_seq;
        let frame = KnxnetipFrame::new(KnxnetipBody::TunnellingRequest {
            channel_id: self.state.channel_id,
            seq,
            cemi: cemi.clone(),
        });
        let bytes = frame.encode();

        let mut retried = false;
        loop {
            self.socket.send(&bytes).await?;
            match timeout(cfg.tunnelling_ack_timeout, self.wait_for_ack(seq)).await {
                Ok(Ok(())) => break,
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => {
                    if retried {
                        return Err(SendError::AckTimeout { seq });
                    }
                    retried = true;
                    debug!(seq, "TUNNELLING_ACK timed out, retransmitting");
                    continue;
                }
            }
        }
        self.state.outbound_seq = seq.wrapping_add(1);
        Ok(())
    }

    /// ACKs a TUNNELLING_REQUEST whose cEMI payload failed to decode
    /// (currently only `L_Busmon.ind`, which is out of scope for v1) so
    /// the peer does not retransmit it.
    async fn ack_unsupported(&mut self, buf: &[u8]) -> Result<(), SendError> {
        if let Some((channel_id, seq)) = crate::codec::frame::peek_tunnelling_request_header(buf) {
            debug!(channel_id, seq, "dropping unsupported cEMI frame (L_Busmon.ind), ACKing anyway");
            let ack = KnxnetipFrame::new(KnxnetipBody::TunnellingAck {
                channel_id,
                seq,
                status: KnxStatus::NoError.code(),
            });
            self.socket.send(&ack.encode()).await?;
        }
        Ok(())
    }

    async fn wait_for_ack(&mut self, seq: u8) -> Result<(), SendError> {
        let mut buf = [0u8; 1024];
        loop {
            let n = self.socket.recv(&mut buf).await?;
            let frame = match KnxnetipFrame::decode(&buf[..n]) {
                Ok(f) => f,
                Err(crate::error::CodecError::Unsupported) => {
                    self.ack_unsupported(&buf[..n]).await?;
                    continue;
                }
                Err(_) => continue,
            };
            match frame.body {
                KnxnetipBody::TunnellingAck { seq: acked, status, .. } if acked == seq => {
                    if status != KnxStatus::NoError.code() {
                        return Err(SendError::Protocol { seq, status });
                    }
                    return Ok(());
                }
                KnxnetipBody::TunnellingRequest { .. } => {
                    // An inbound request can interleave with our own ACK
                    // wait; handle and ACK it, then queue its cEMI for
                    // recv_indication to deliver, and keep waiting.
                    if let Some(cemi) = self.handle_inbound_request(frame, &mut buf).await? {
                        self.pending_indications.push_back(cemi);
                    }
                }
                KnxnetipBody::DisconnectRequest { .. } => {
                    self.handle_gateway_disconnect().await;
                    return Err(SendError::Cancelled);
                }
                _ => continue,
            }
        }
    }

    /// Waits for the next inbound TUNNELLING_REQUEST (L_Data.con or
    /// L_Data.ind), ACKing it immediately before returning its cEMI
    /// payload to the caller.
    pub async fn recv_indication(&mut self, window: Duration) -> Result<Cemi, SendError> {
        if let Some(cemi) = self.pending_indications.pop_front() {
            return Ok(cemi);
        }
        let deadline = Instant::now() + window;
        let mut buf = [0u8; 1024];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SendError::ResponseTimeout { seq: self.state.outbound_seq.wrapping_sub(1) });
            }
            let n = match timeout(remaining, self.socket.recv(&mut buf)).await {
                Ok(r) => r?,
                Err(_) => return Err(SendError::ResponseTimeout { seq: self.state.outbound_seq.wrapping_sub(1) }),
            };
            let frame = match KnxnetipFrame::decode(&buf[..n]) {
                Ok(f) => f,
                Err(crate::error::CodecError::Unsupported) => {
                    self.ack_unsupported(&buf[..n]).await?;
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "dropping malformed inbound frame");
                    continue;
                }
            };
            match frame.body {
                KnxnetipBody::TunnellingRequest { .. } => {
                    if let Some(cemi) = self.handle_inbound_request(frame, &mut buf).await? {
                        return Ok(cemi);
                    }
                }
                KnxnetipBody::DisconnectRequest { .. } => {
                    self.handle_gateway_disconnect().await;
                    return Err(SendError::Cancelled);
                }
                KnxnetipBody::ConnectionstateResponse { .. } => {
                    self.last_heartbeat = Instant::now();
                    self.missed_heartbeats = 0;
                }
                _ => continue,
            }
        }
    }

    async fn handle_inbound_request(
        &mut self,
        frame: KnxnetipFrame,
        _buf: &mut [u8],
    ) -> Result<Option<Cemi>, SendError> {
        if let KnxnetipBody::TunnellingRequest { channel_id, seq, cemi } = frame.body {
            let duplicate = self.last_inbound_seq == Some(seq);
            let ack = KnxnetipFrame::new(KnxnetipBody::TunnellingAck {
                channel_id,
                seq,
                status: KnxStatus::NoError.code(),
            });
            self.socket.send(&ack.encode()).await?;
            if duplicate {
                return Ok(None);
            }
            self.last_inbound_seq = Some(seq);
            self.state.inbound_seq = seq;
            if matches!(cemi.msg_code, CemiMsgCode::LDataCon | CemiMsgCode::LDataInd) {
                return Ok(Some(cemi));
            }
        }
        Ok(None)
    }

    async fn handle_gateway_disconnect(&mut self) {
        let response = KnxnetipFrame::new(KnxnetipBody::DisconnectResponse {
            channel_id: self.state.channel_id,
            status: KnxStatus::NoError.code(),
        });
        let _ = self.socket.send(&response.encode()).await;
        self.state.phase = Phase::Closed;
        warn!(channel_id = self.state.channel_id, "gateway-initiated disconnect");
    }

    /// Sends a CONNECTIONSTATE_REQUEST if the heartbeat interval has
    /// elapsed; closes the tunnel after two consecutive misses.
    pub async fn maybe_heartbeat(&mut self, cfg: &ScanConfig) -> Result<(), ConnectError> {
        if self.state.phase != Phase::Open || self.last_heartbeat.elapsed() < HEARTBEAT_INTERVAL {
            return Ok(());
        }
        let request = KnxnetipFrame::new(KnxnetipBody::ConnectionstateRequest {
            channel_id: self.state.channel_id,
            control_endpoint: self.state.control_endpoint,
        });
        self.socket
            .send(&request.encode())
            .await
            .map_err(|source| ConnectError::Io { gateway: self.state.remote.into(), source })?;

        let mut buf = [0u8; 512];
        match timeout(cfg.connectionstate_timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(_)) => {
                self.last_heartbeat = Instant::now();
                self.missed_heartbeats = 0;
            }
            _ => {
                self.missed_heartbeats += 1;
                if self.missed_heartbeats >= 2 {
                    self.state.phase = Phase::Closing;
                }
            }
        }
        Ok(())
    }

    pub fn channel_id(&self) -> u8 {
        self.state.channel_id
    }

    pub fn local_individual_address(&self) -> u16 {
        self.state.local_individual_address
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Connecting => "Connecting",
        Phase::Open => "Open",
        Phase::Closing => "Closing",
        Phase::Closed => "Closed",
    }
}
