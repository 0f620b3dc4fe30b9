//! Snapshot blob codec
//!
//! ## Format
//! ```text
//! ┌───────────┬─────────────┬─────────┬─────────┬──────────────────┐
//! │ Magic (4) │ Version (2) │ CRC (4) │ Len (4) │ Payload (bincode)│
//! └───────────┴─────────────┴─────────┴─────────┴──────────────────┘
//! ```
//! All integers big-endian. The CRC covers the payload only.
//! Payload: `element name -> (state key -> HolderImage)`.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TableError};
use crate::holder::HolderImage;

use super::{StateSnapshot, StateValue};

pub const SNAPSHOT_MAGIC: &[u8; 4] = b"ETSN";
pub const SNAPSHOT_VERSION: u16 = 1;

/// Magic + version + crc + len
const HEADER_SIZE: usize = 4 + 2 + 4 + 4;

type PersistedState = BTreeMap<String, BTreeMap<String, HolderImage>>;

pub fn encode(states: &BTreeMap<String, StateSnapshot>) -> Result<Bytes> {
    let persisted: PersistedState = states
        .iter()
        .map(|(name, snapshot)| {
            let entries = snapshot
                .iter()
                .map(|(key, value)| (key.clone(), value.image()))
                .collect();
            (name.clone(), entries)
        })
        .collect();

    let payload = bincode::serialize(&persisted)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| TableError::Serialization("snapshot exceeds 4 GiB".to_string()))?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(SNAPSHOT_MAGIC);
    buf.put_u16(SNAPSHOT_VERSION);
    buf.put_u32(crc32fast::hash(&payload));
    buf.put_u32(len);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

pub fn decode(blob: &[u8]) -> Result<BTreeMap<String, StateSnapshot>> {
    if blob.len() < HEADER_SIZE {
        return Err(TableError::Corruption(format!(
            "blob of {} bytes is shorter than the {}-byte header",
            blob.len(),
            HEADER_SIZE
        )));
    }

    let mut buf = blob;
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != SNAPSHOT_MAGIC {
        return Err(TableError::Corruption("bad snapshot magic".to_string()));
    }
    let version = buf.get_u16();
    if version != SNAPSHOT_VERSION {
        return Err(TableError::Corruption(format!(
            "unsupported snapshot version {}",
            version
        )));
    }
    let expected_crc = buf.get_u32();
    let len = buf.get_u32() as usize;
    if buf.remaining() != len {
        return Err(TableError::Corruption(format!(
            "payload length {} does not match header length {}",
            buf.remaining(),
            len
        )));
    }

    let actual_crc = crc32fast::hash(buf);
    if actual_crc != expected_crc {
        return Err(TableError::Corruption(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    let persisted: PersistedState = bincode::deserialize(buf)?;
    Ok(persisted
        .into_iter()
        .map(|(name, entries)| {
            let mut snapshot = StateSnapshot::new();
            for (key, image) in entries {
                snapshot.insert(key, StateValue::Image(image));
            }
            (name, snapshot)
        })
        .collect())
}
