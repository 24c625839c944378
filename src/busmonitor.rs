//! Bus monitor: opens a tunnel like a scan, but only drains inbound
//! indications instead of issuing requests.

use std::net::SocketAddrV4;

use tracing::{info, warn};

use crate::codec::cemi::Cemi;
use crate::config::ScanConfig;
use crate::constants::CemiMsgCode;
use crate::error::ConnectError;
use crate::tunnel::Tunnel;

/// Runs a bus monitor until cancelled, calling `on_frame` for every
/// decoded `L_Data.ind`. `group_only` filters to group-addressed frames
/// (group-monitor mode).
pub async fn run<F>(
    local: SocketAddrV4,
    gateway: SocketAddrV4,
    cfg: &ScanConfig,
    group_only: bool,
    mut on_frame: F,
) -> Result<(), ConnectError>
where
    F: FnMut(Cemi),
{
    let mut tunnel = Tunnel::connect(local, gateway, cfg).await?;
    info!(%gateway, "bus monitor attached");

    loop {
        match tunnel.recv_indication(cfg.cemi_confirm_timeout).await {
            Ok(cemi) => {
                if cemi.msg_code != CemiMsgCode::LDataInd {
                    continue;
                }
                if group_only && !cemi.is_group_destination {
                    continue;
                }
                on_frame(cemi);
            }
            Err(crate::error::SendError::Cancelled) => break,
            Err(crate::error::SendError::ResponseTimeout { .. }) => {
                tunnel.maybe_heartbeat(cfg).await?;
                continue;
            }
            Err(e) => {
                warn!(error = %e, "bus monitor recv error, continuing");
            }
        }
    }
    tunnel.disconnect(cfg).await;
    Ok(())
}
