use std::collections::BTreeSet;

/// Bit index of a physical switch position inside a report.
pub type Key = usize;

/// Keys whose switch is physically ON in one report.
pub type ActiveSet = BTreeSet<Key>;

/// Keys whose ON/OFF state differs between two consecutive reports.
pub type ChangeSet = BTreeSet<Key>;

/// Decode a raw input report into the set of active keys.
///
/// The report is read as one big-endian integer: key 0 is the least
/// significant bit of the last byte, key 8 the least significant bit of the
/// byte before it, and so on. Any length is accepted, including zero.
pub fn decode(report: &[u8]) -> ActiveSet {
    let mut active = ActiveSet::new();
    for (byte_index, byte) in report.iter().rev().enumerate() {
        for bit in 0..8 {
            if byte & (1u8 << bit) != 0 {
                active.insert(byte_index * 8 + bit);
            }
        }
    }
    active
}

/// Keys present in exactly one of the two sets.
pub fn diff(current: &ActiveSet, previous: &ActiveSet) -> ChangeSet {
    current.symmetric_difference(previous).copied().collect()
}
