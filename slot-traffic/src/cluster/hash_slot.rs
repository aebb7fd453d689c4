//! Hash Slot Algorithm - CRC16 mod 16384
//!
//! Redis Cluster compatible slot calculation (CRC-16/XMODEM).

use crate::cluster::types::TOTAL_SLOTS;
use crc::{CRC_16_XMODEM, Crc};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Extract hash tag from key
///
/// Hash tags allow multiple keys to be stored on the same node.
/// Format: `{tag}key` or `key{tag}` - only the tag is hashed.
/// Only the first `{` counts, and an empty tag (`{}`) means the whole key is hashed.
fn extract_hash_tag(key: &[u8]) -> Option<&[u8]> {
    let start = memchr::memchr(b'{', key)?;
    let rest = &key[start + 1..];
    let end = memchr::memchr(b'}', rest)?;
    if end == 0 {
        return None;
    }
    Some(&rest[..end])
}

/// Calculate hash slot for a key (CRC16 mod 16384)
///
/// # Example
/// ```
/// use slot_traffic::cluster::hash_slot::hash_slot;
///
/// assert_eq!(hash_slot(b"foo"), 12182);
///
/// // Hash tags ensure same slot
/// let slot1 = hash_slot(b"user:{1001}:profile");
/// let slot2 = hash_slot(b"user:{1001}:settings");
/// assert_eq!(slot1, slot2);
/// ```
pub fn hash_slot(key: &[u8]) -> u16 {
    let hash_key = extract_hash_tag(key).unwrap_or(key);
    CRC16.checksum(hash_key) % TOTAL_SLOTS
}

/// Calculate hash slot for a string key
pub fn hash_slot_str(key: &str) -> u16 {
    hash_slot(key.as_bytes())
}
