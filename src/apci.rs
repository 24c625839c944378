//! Application-layer request builders and response parsers.
//!
//! Byte layouts mirror the original scanner's `apci_property_value_read`/
//! `apci_memory_read` framing (a fixed-size header the peer echoes back,
//! then the value), simplified to use `ApciPayload::Bytes` uniformly
//! rather than splitting count fields across the 6-bit inline slot.

use crate::codec::cemi::ApciPayload;
use crate::constants::Apci;

pub const PID_MANUFACTURER_ID: u8 = 0x0c;
pub const PID_SERIAL_NUMBER: u8 = 0x0b;
const MEMORY_ADDRESS_MANUFACTURER: u16 = 0x0104;

/// `A_DeviceDescriptor_Read(descriptor_type=0)`.
pub fn device_descriptor_read() -> (Apci, ApciPayload) {
    (Apci::DeviceDescriptorRead, ApciPayload::Inline6(0))
}

/// Extracts the 16-bit device descriptor from a
/// `A_DeviceDescriptor_Response` payload.
pub fn parse_device_descriptor_response(payload: &ApciPayload) -> Option<u16> {
    match payload {
        ApciPayload::Bytes(b) if b.len() >= 2 => Some(u16::from_be_bytes([b[0], b[1]])),
        _ => None,
    }
}

/// `A_PropertyValue_Read`, reading element 1 of the named property on the
/// given interface object index.
pub fn property_value_read(object_index: u8, property_id: u8) -> (Apci, ApciPayload) {
    // header: object_index, property_id, (count<<4 | start_index_hi), start_index_lo
    (
        Apci::PropertyValueRead,
        ApciPayload::Bytes(vec![object_index, property_id, 0x10, 0x01]),
    )
}

/// Strips the 4-byte echoed header from a `A_PropertyValue_Response`,
/// returning the property's raw value bytes.
pub fn parse_property_value_response(payload: &ApciPayload) -> Option<&[u8]> {
    match payload {
        ApciPayload::Bytes(b) if b.len() > 4 => Some(&b[4..]),
        _ => None,
    }
}

/// `A_Memory_Read` at the manufacturer ID address (System 1/2 devices
/// without interface objects).
pub fn memory_read_manufacturer() -> (Apci, ApciPayload) {
    memory_read(MEMORY_ADDRESS_MANUFACTURER)
}

/// `A_Memory_Read` at an arbitrary 16-bit memory address.
pub fn memory_read(address: u16) -> (Apci, ApciPayload) {
    let [hi, lo] = address.to_be_bytes();
    (Apci::MemoryRead, ApciPayload::Bytes(vec![hi, lo]))
}

/// Strips the 2-byte echoed address from a `A_Memory_Response`, returning
/// the raw value bytes.
pub fn parse_memory_response(payload: &ApciPayload) -> Option<&[u8]> {
    match payload {
        ApciPayload::Bytes(b) if b.len() > 2 => Some(&b[2..]),
        _ => None,
    }
}

/// `A_Authorize_Request` with a 4-byte access key. Exposed for
/// completeness per the fixed opcode table; the bus-walk scan never
/// issues one unprompted.
pub fn authorize_request(key: u32) -> (Apci, ApciPayload) {
    let mut data = vec![0x00];
    data.extend_from_slice(&key.to_be_bytes());
    (Apci::AuthorizeRequest, ApciPayload::Bytes(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_descriptor_response_roundtrips_value() {
        let payload = ApciPayload::Bytes(vec![0x00, 0x12]);
        assert_eq!(parse_device_descriptor_response(&payload), Some(0x0012));
    }

    #[test]
    fn property_value_response_skips_header() {
        let payload = ApciPayload::Bytes(vec![0x00, PID_MANUFACTURER_ID, 0x10, 0x01, 0x00, 0x83]);
        assert_eq!(parse_property_value_response(&payload), Some(&[0x00, 0x83][..]));
    }

    #[test]
    fn memory_response_skips_address() {
        let (_, request) = memory_read_manufacturer();
        assert_eq!(request, ApciPayload::Bytes(vec![0x01, 0x04]));
        let payload = ApciPayload::Bytes(vec![0x01, 0x04, 0x83]);
        assert_eq!(parse_memory_response(&payload), Some(&[0x83][..]));
    }
}
