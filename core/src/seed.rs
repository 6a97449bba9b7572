//! Labelled seed derivation shared by every deterministic random stream.

use sha2::{Digest, Sha256};

/// Derives an independent seed for the named random stream.
///
/// Each subsystem draws from its own stream so that adding a draw in one
/// place never perturbs the sequence observed by another.
#[must_use]
pub fn derive_stream_seed(seed: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
