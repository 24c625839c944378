//! TPCI sublayer: per-bus-target connection-oriented addressing carried
//! inside an open tunnel.

use std::time::Instant;

use tracing::debug;

use crate::address::KnxAddress;
use crate::codec::cemi::{ApciPayload, Cemi, Tpci as WireTpci};
use crate::config::ScanConfig;
use crate::constants::{Apci, TpciControl};
use crate::error::TpciError;
use crate::tunnel::Tunnel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpciPhase {
    Closed,
    Open,
}

/// Per-target TPCI connection state: the 4-bit sequence counter and
/// whether the connection is currently open.
pub struct TpciConnection {
    pub target: KnxAddress,
    pub local_address: u16,
    pub seq: u8,
    pub phase: TpciPhase,
}

impl TpciConnection {
    pub fn new(target: KnxAddress, local_address: u16) -> Self {
        TpciConnection {
            target,
            local_address,
            seq: 0,
            phase: TpciPhase::Closed,
        }
    }

    /// Sends T_Connect and observes the tunnel's confirm. Returns whether
    /// the target acknowledged reachability.
    pub async fn open(&mut self, tunnel: &mut Tunnel, cfg: &ScanConfig) -> Result<bool, TpciError> {
        let cemi = Cemi::l_data_req(
            self.local_address,
            self.target.pack(),
            false,
            WireTpci::Ucd { control: TpciControl::Connect },
        );
        tunnel.send_request(&cemi, cfg).await?;
        match tunnel.recv_indication(cfg.cemi_confirm_timeout).await {
            Ok(confirm) => {
                let alive = !confirm.confirm_negative;
                if alive {
                    self.phase = TpciPhase::Open;
                    self.seq = 0;
                }
                Ok(alive)
            }
            Err(crate::error::SendError::ResponseTimeout { .. }) => {
                Err(TpciError::Unreachable { target: self.target })
            }
            Err(e) => Err(TpciError::Send(e)),
        }
    }

    /// Sends an NDP-framed APCI request and awaits the matching response,
    /// then sends the mandatory T_Ack. Sequence advances mod 16 on
    /// success.
    pub async fn send_ndp(
        &mut self,
        tunnel: &mut Tunnel,
        cfg: &ScanConfig,
        apci: Apci,
        payload: ApciPayload,
    ) -> Result<ApciPayload, TpciError> {
        if self.phase != TpciPhase::Open {
            return Err(TpciError::Unreachable { target: self.target });
        }
        let expected = apci.expected_response();
        let cemi = Cemi::l_data_req(
            self.local_address,
            self.target.pack(),
            false,
            WireTpci::Ndp { seq: self.seq, apci, payload },
        );
        tunnel.send_request(&cemi, cfg).await?;

        let deadline = Instant::now() + cfg.tpci_response_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TpciError::Unreachable { target: self.target });
            }
            let indication = match tunnel.recv_indication(remaining).await {
                Ok(ind) => ind,
                Err(crate::error::SendError::Cancelled) => return Err(TpciError::Cancelled),
                Err(crate::error::SendError::ResponseTimeout { .. }) => {
                    return Err(TpciError::Unreachable { target: self.target })
                }
                Err(e) => return Err(TpciError::Send(e)),
            };
            if indication.source != self.target.pack() || indication.destination != self.local_address {
                continue;
            }
            match &indication.tpci {
                WireTpci::Ucd { control: TpciControl::Disconnect } => {
                    self.phase = TpciPhase::Closed;
                    return Err(TpciError::PeerDisconnected { target: self.target });
                }
                WireTpci::Ndp { seq, apci: got_apci, payload: got_payload } => {
                    if *seq != self.seq {
                        continue;
                    }
                    if Some(*got_apci) != expected {
                        continue;
                    }
                    self.send_ack(tunnel, cfg).await?;
                    self.seq = self.seq.wrapping_add(1) & 0xf;
                    return Ok(got_payload.clone());
                }
                _ => continue,
            }
        }
    }

    /// Sends T_Ack with the current sequence, required after every
    /// received NDP response.
    async fn send_ack(&mut self, tunnel: &mut Tunnel, cfg: &ScanConfig) -> Result<(), TpciError> {
        let cemi = Cemi::l_data_req(
            self.local_address,
            self.target.pack(),
            false,
            WireTpci::Ncd { seq: self.seq, control: TpciControl::Ack },
        );
        tunnel.send_request(&cemi, cfg).await.map_err(TpciError::Send)
    }

    /// Sends T_Disconnect and marks the connection Closed.
    pub async fn close(&mut self, tunnel: &mut Tunnel, cfg: &ScanConfig) {
        if self.phase == TpciPhase::Closed {
            return;
        }
        let cemi = Cemi::l_data_req(
            self.local_address,
            self.target.pack(),
            false,
            WireTpci::Ucd { control: TpciControl::Disconnect },
        );
        if let Err(e) = tunnel.send_request(&cemi, cfg).await {
            debug!(target = %self.target, error = %e, "disconnect send failed, closing anyway");
        }
        self.phase = TpciPhase::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_connection_starts_closed_with_zero_seq() {
        let target = KnxAddress::new(1, 1, 2).unwrap();
        let conn = TpciConnection::new(target, 0x1101);
        assert_eq!(conn.phase, TpciPhase::Closed);
        assert_eq!(conn.seq, 0);
    }
}
