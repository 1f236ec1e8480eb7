//! Time-ordered checkpoint identifiers in the version-6 UUID layout: a
//! 60-bit timestamp (100ns ticks since the Gregorian epoch, high-to-low),
//! a 14-bit clock sequence, and a 48-bit node id, matching
//! `^[0-9a-f]{8}-[0-9a-f]{4}-6[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$`.
//!
//! No published crate in the dependency stack emits this exact bit layout
//! (uuid's own v6 support is behind an unstable feature this crate doesn't
//! depend on), so the encoding is implemented directly against `uuid::Uuid`
//! as a byte-layout helper.

use chrono::{DateTime, Utc};
use rand::RngCore;
use uuid::Uuid;

const GREGORIAN_EPOCH_OFFSET_100NS: i64 = 0x01B2_1DD2_1381_4000;

/// Generates checkpoint ids, time-ordered within a process. `clock_seq =
/// None` draws a fresh random sequence per call, treating it the same as an
/// explicit "-1 means random" request.
pub struct CheckpointIdGenerator {
    node_id: [u8; 6],
}

impl Default for CheckpointIdGenerator {
    fn default() -> Self {
        let mut node_id = [0u8; 6];
        rand::rng().fill_bytes(&mut node_id);
        node_id[0] |= 0x01; // multicast bit, matches conventional node-id generation
        Self { node_id }
    }
}

impl CheckpointIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> String {
        self.generate_at(Utc::now(), None)
    }

    pub fn generate_at(&self, ts: DateTime<Utc>, clock_seq: Option<u16>) -> String {
        let ticks = ((ts.timestamp_nanos_opt().unwrap_or(0) / 100) + GREGORIAN_EPOCH_OFFSET_100NS)
            .max(0) as u64;
        let ticks = ticks & 0x0FFF_FFFF_FFFF_FFFF; // keep to 60 bits

        let time_high = (ticks >> 28) as u32; // 32 bits
        let time_mid = ((ticks >> 12) & 0xFFFF) as u16; // 16 bits
        let time_low_ver = (((ticks & 0x0FFF) as u16) | 0x6000) as u16; // 12 bits + version nibble

        let clock_seq = clock_seq.unwrap_or_else(|| (rand::rng().next_u32() & 0x3FFF) as u16);
        let clock_seq_variant = (clock_seq & 0x3FFF) | 0x8000; // RFC4122 variant in top bits

        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&time_high.to_be_bytes());
        bytes[4..6].copy_from_slice(&time_mid.to_be_bytes());
        bytes[6..8].copy_from_slice(&time_low_ver.to_be_bytes());
        bytes[8..10].copy_from_slice(&clock_seq_variant.to_be_bytes());
        bytes[10..16].copy_from_slice(&self.node_id);

        Uuid::from_bytes(bytes).to_string()
    }
}

/// Validates the canonical string form described in the module docs above.
pub fn is_canonical_checkpoint_id(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    let groups = [8, 4, 4, 4, 12];
    let mut pos = 0;
    for (i, &len) in groups.iter().enumerate() {
        if i > 0 {
            if bytes[pos] != b'-' {
                return false;
            }
            pos += 1;
        }
        let group = &s[pos..pos + len];
        if i == 2 {
            if !group.starts_with('6') || !group[1..].chars().all(|c| c.is_ascii_hexdigit()) {
                return false;
            }
        } else if !group.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        pos += len;
    }
    pos == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_canonical() {
        let gen = CheckpointIdGenerator::new();
        let id = gen.generate();
        assert!(is_canonical_checkpoint_id(&id), "{id} is not canonical");
    }

    #[test]
    fn ids_are_time_ordered() {
        let gen = CheckpointIdGenerator::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::milliseconds(5);
        let a = gen.generate_at(t0, Some(0));
        let b = gen.generate_at(t1, Some(0));
        assert!(a < b);
    }
}
