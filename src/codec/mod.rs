//! Wire codec for KNXnet/IP frames, HPAI blocks, device description DIBs,
//! and the embedded cEMI/TPCI/APCI sublayers.

pub mod cemi;
pub mod cursor;
pub mod device_info;
pub mod frame;
pub mod hpai;

pub use cemi::{ApciPayload, Cemi, Tpci};
pub use device_info::{DeviceInfoDib, ServiceFamily, SuppSvcFamiliesDib};
pub use frame::{peek_tunnelling_request_header, Cri, Crd, KnxnetipBody, KnxnetipFrame};
pub use hpai::{Hpai, HpaiProtocol};
