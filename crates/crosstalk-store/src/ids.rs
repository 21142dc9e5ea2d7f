//! Identifier and secret generation

use rand::RngCore;

/// Opaque record identifier: 16 random bytes, hex
pub fn generate_id() -> String {
    random_hex(16)
}

/// Tenant bearer secret: 32 random bytes, hex
pub fn generate_secret() -> String {
    random_hex(32)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
