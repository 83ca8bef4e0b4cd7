//! Leverage common functionality across the quorum signing crates.

use prost::{encode_length_delimiter, length_delimiter_len};

/// Converts bytes to a hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Compute the default threshold `t` for a quorum of `n` peers (`t = n / 3`).
///
/// A signing round then requires `t + 1` peers. If `n` is too small to tolerate
/// any faults, this function returns `None`.
pub fn default_threshold(n: u32) -> Option<u32> {
    let t = n / 3;
    if t == 0 {
        return None;
    }
    Some(t)
}

/// Concatenate a namespace and a message, prepended by a varint encoding of the namespace length.
///
/// This produces a unique byte sequence (i.e. no collisions) for each `(namespace, msg)` pair.
pub fn union_unique(namespace: &[u8], msg: &[u8]) -> Vec<u8> {
    let ld_len = length_delimiter_len(namespace.len());
    let mut result = Vec::with_capacity(ld_len + namespace.len() + msg.len());
    encode_length_delimiter(namespace.len(), &mut result).expect("vec has sufficient capacity");
    result.extend_from_slice(namespace);
    result.extend_from_slice(msg);
    result
}
