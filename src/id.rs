use sha2::{Digest, Sha256};

/// Hex digits kept from the digest.
const ID_HEX_LEN: usize = 12;

/// Derive a stable entity id from a kind prefix and ordered semantic parts.
///
/// `assign_id("ch", &["Daisy"])` always yields the same `ch_<12 hex>` value;
/// the parts are joined with `|` before hashing, so part order matters.
pub fn assign_id(kind: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    for part in parts {
        hasher.update(b"|");
        hasher.update(part.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}_{}", kind, &digest[..ID_HEX_LEN])
}

pub fn character_id(name: &str) -> String {
    assign_id("ch", &[name])
}

pub fn weapon_id(name: &str, weapon_type: &str) -> String {
    assign_id("wp", &[name, weapon_type])
}
