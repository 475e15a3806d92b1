//! Binary format definitions for WAL entries
//!
//! All WAL entries follow a consistent format:
//! ChunkHeader (32 bytes) + ns_len(u16) + key_len(u16) + value_len(u32) + operation(u8) + padding(u8)
//! + namespace_bytes + key_bytes + value_bytes

use crate::error::{EngineError, EngineResult};

/// Magic bytes identifying WAL entries: "AKVW" in ASCII
pub const MAGIC_ARRAY: [u8; 4] = [0x41, 0x4B, 0x56, 0x57]; // 'A','K','V','W'

/// Maximum namespace name size in bytes
pub const MAX_NAMESPACE_SIZE: usize = 255;

/// Maximum key size in bytes accepted by the format
pub const MAX_KEY_SIZE: usize = 4096;

/// Maximum value size in bytes accepted by the format (128MB)
pub const MAX_VALUE_SIZE: usize = 128 * 1024 * 1024;

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Fixed payload fields preceding the variable-length bytes
const PAYLOAD_FIXED_SIZE: usize = 2 + 2 + 4 + 1 + 1;

/// WAL operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Insert or replace a key-value pair in a namespace
    Put = 1,
    /// Delete a key from a namespace
    Delete = 2,
    /// Create an empty namespace (key and value are empty)
    CreateNamespace = 3,
}

impl Operation {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Operation::Put),
            2 => Some(Operation::Delete),
            3 => Some(Operation::CreateNamespace),
            _ => None,
        }
    }
}

/// Fixed-size header for each WAL entry
/// Size: 32 bytes, alignment: 4
///
/// Layout:
///   [0..4]   magic:      [u8;4] - "AKVW"
///   [4..8]   length:     u32    - payload length in bytes
///   [8..12]  checksum:   u32    - CRC32C of payload bytes
///   [12]     entry_type: u8     - operation type
///   [13..16] reserved:   [u8;3]
///   [16..32] padding:    [u8;16]
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ChunkHeader {
    pub magic: [u8; 4],
    /// Total length of the entry payload (excluding this header)
    pub length: u32,
    /// CRC32C checksum of the payload bytes
    pub checksum: u32,
    pub entry_type: u8,
    /// Reserved for future use, must be zero
    pub reserved: [u8; 3],
    pub _padding: [u8; 16],
}

/// Complete WAL entry structure (deserialized)
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub header: ChunkHeader,
    pub namespace: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub operation: Operation,
}

impl ChunkHeader {
    pub fn new(length: u32, checksum: u32, entry_type: Operation) -> Self {
        Self {
            magic: MAGIC_ARRAY,
            length,
            checksum,
            entry_type: entry_type as u8,
            reserved: [0; 3],
            _padding: [0; 16],
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.entry_type;
        buf[13..16].copy_from_slice(&self.reserved);
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut padding = [0u8; 16];
        padding.copy_from_slice(&bytes[16..32]);

        Self {
            magic,
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            checksum: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            entry_type: bytes[12],
            reserved: [bytes[13], bytes[14], bytes[15]],
            _padding: padding,
        }
    }
}

fn oversized(component: &'static str, size: usize, max: usize) -> EngineError {
    EngineError::OversizedEntry {
        entry_size: size as u64,
        max_size: max as u64,
        component,
    }
}

/// Serialize a namespaced operation into a complete WAL entry
pub fn serialize_entry(namespace: &str, key: &[u8], value: &[u8], op: Operation) -> EngineResult<Vec<u8>> {
    // Validate sizes before any allocation
    if namespace.len() > MAX_NAMESPACE_SIZE {
        return Err(oversized("namespace", namespace.len(), MAX_NAMESPACE_SIZE));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(oversized("key", key.len(), MAX_KEY_SIZE));
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(oversized("value", value.len(), MAX_VALUE_SIZE));
    }

    let payload_size = PAYLOAD_FIXED_SIZE + namespace.len() + key.len() + value.len();

    let mut payload = Vec::with_capacity(payload_size);
    payload.extend_from_slice(&(namespace.len() as u16).to_le_bytes());
    payload.extend_from_slice(&(key.len() as u16).to_le_bytes());
    payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
    payload.push(op as u8);
    payload.push(0);
    payload.extend_from_slice(namespace.as_bytes());
    payload.extend_from_slice(key);
    payload.extend_from_slice(value);

    let checksum = crc32c::crc32c(&payload);
    let header = ChunkHeader::new(payload.len() as u32, checksum, op);

    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload_size);
    buffer.extend_from_slice(&header.to_bytes());
    buffer.extend_from_slice(&payload);

    Ok(buffer)
}

/// Deserialize a WAL entry from a byte slice
pub fn deserialize_entry(data: &[u8]) -> EngineResult<WalEntry> {
    let header_bytes: &[u8; HEADER_SIZE] = data
        .get(..HEADER_SIZE)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| EngineError::WalCorrupted {
            offset: 0,
            reason: format!("entry too short: {} bytes, need at least {}", data.len(), HEADER_SIZE),
        })?;
    let header = ChunkHeader::from_bytes(header_bytes);

    if header.magic != MAGIC_ARRAY {
        return Err(EngineError::NoMagicFound {
            offset: 0,
            found_bytes: header.magic,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + header.length as usize;

    if data.len() < payload_end {
        return Err(EngineError::TornWrite {
            expected_size: header.length,
            available_bytes: (data.len() - payload_start) as u64,
            offset: payload_start as u64,
        });
    }

    let payload = &data[payload_start..payload_end];

    let computed_checksum = crc32c::crc32c(payload);
    if computed_checksum != header.checksum {
        return Err(EngineError::ChecksumMismatch {
            expected: header.checksum,
            actual: computed_checksum,
            offset: payload_start as u64,
        });
    }

    if payload.len() < PAYLOAD_FIXED_SIZE {
        return Err(EngineError::WalCorrupted {
            offset: payload_start as u64,
            reason: "payload too short for header fields".to_string(),
        });
    }

    let ns_len = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    let key_len = u16::from_le_bytes([payload[2], payload[3]]) as usize;
    let value_len = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;
    let operation = Operation::from_byte(payload[8]).ok_or_else(|| EngineError::WalCorrupted {
        offset: (payload_start + 8) as u64,
        reason: format!("invalid operation type: {}", payload[8]),
    })?;

    let ns_end = PAYLOAD_FIXED_SIZE + ns_len;
    let key_end = ns_end + key_len;
    let value_end = key_end + value_len;

    if payload.len() < value_end {
        return Err(EngineError::WalCorrupted {
            offset: payload_start as u64,
            reason: format!(
                "payload too short: need {} bytes for namespace({}) + key({}) + value({})",
                value_end, ns_len, key_len, value_len
            ),
        });
    }

    let namespace = std::str::from_utf8(&payload[PAYLOAD_FIXED_SIZE..ns_end])
        .map_err(|e| EngineError::WalCorrupted {
            offset: (payload_start + PAYLOAD_FIXED_SIZE) as u64,
            reason: format!("namespace is not valid UTF-8: {}", e),
        })?
        .to_string();

    Ok(WalEntry {
        header,
        namespace,
        key: payload[ns_end..key_end].to_vec(),
        value: payload[key_end..value_end].to_vec(),
        operation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<ChunkHeader>(), HEADER_SIZE);
    }

    #[test]
    fn test_put_entry_decodes() {
        let serialized = serialize_entry("agents", b"did:example:123", b"{}", Operation::Put).unwrap();
        let entry = deserialize_entry(&serialized).unwrap();

        assert_eq!(entry.namespace, "agents");
        assert_eq!(entry.key, b"did:example:123");
        assert_eq!(entry.value, b"{}");
        assert_eq!(entry.operation, Operation::Put);
        assert_eq!(entry.header.magic, MAGIC_ARRAY);
    }

    #[test]
    fn test_create_namespace_entry_has_no_key() {
        let serialized = serialize_entry("fresh", b"", b"", Operation::CreateNamespace).unwrap();
        let entry = deserialize_entry(&serialized).unwrap();

        assert_eq!(entry.namespace, "fresh");
        assert!(entry.key.is_empty());
        assert!(entry.value.is_empty());
        assert_eq!(entry.operation, Operation::CreateNamespace);
    }

    #[test]
    fn test_oversized_key_rejected() {
        let key = vec![0u8; MAX_KEY_SIZE + 1];
        let result = serialize_entry("ns", &key, b"val", Operation::Put);
        assert!(matches!(result, Err(EngineError::OversizedEntry { component: "key", .. })));
    }

    #[test]
    fn test_oversized_namespace_rejected() {
        let ns = "n".repeat(MAX_NAMESPACE_SIZE + 1);
        let result = serialize_entry(&ns, b"k", b"v", Operation::Put);
        assert!(matches!(result, Err(EngineError::OversizedEntry { component: "namespace", .. })));
    }

    #[test]
    fn test_corrupted_magic_detected() {
        let mut data = serialize_entry("ns", b"key", b"value", Operation::Put).unwrap();
        data[0] = 0xFF;
        assert!(matches!(deserialize_entry(&data), Err(EngineError::NoMagicFound { .. })));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut data = serialize_entry("ns", b"key", b"value", Operation::Put).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert!(matches!(deserialize_entry(&data), Err(EngineError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_truncated_entry_is_torn() {
        let data = serialize_entry("ns", b"key", b"value", Operation::Put).unwrap();
        let truncated = &data[..data.len() - 2];
        assert!(matches!(deserialize_entry(truncated), Err(EngineError::TornWrite { .. })));
    }

    #[test]
    fn test_short_buffer_is_corrupted() {
        assert!(matches!(deserialize_entry(&[0u8; 10]), Err(EngineError::WalCorrupted { .. })));
    }
}
