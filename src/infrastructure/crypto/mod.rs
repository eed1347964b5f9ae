use sha2::{Digest, Sha256};

/// One-way digest used for the offline exit credential. Hex-encoded so it can
/// sit in a device-state JSON record.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
