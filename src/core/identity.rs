//! The hash chain that binds a recognition result to one specific account.
//!
//! Two one-way stages: stage1 = sha256(lower(username) + lower(name)),
//! then hash_face = sha256(hex(stage1) + account_record_id). Because the
//! record id only exists after the account document is first inserted, the
//! full hash is derived in two phases (insert with the stage1 value, read
//! back the id, overwrite with the chained value). Verification recomputes
//! the chain with the classifier's *predicted* display name, so a match is
//! always checked against the logged-in account rather than globally.

use sha2::{Digest, Sha256};

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// First stage of the chain; also the provisional hash_face stored before
/// the account record id exists.
pub fn stage1_digest(username: &str, name: &str) -> String {
    sha256_hex(&(username.to_lowercase() + &name.to_lowercase()))
}

pub fn derive_at_enrollment(username: &str, name: &str, account_id: &str) -> String {
    let stage1 = stage1_digest(username, name);
    sha256_hex(&(stage1 + account_id))
}

/// True iff the predicted display name chains to the stored hash for this
/// account. A mismatch is an ordinary negative outcome, not an error.
pub fn verify_at_login(
    predicted_name: &str,
    username: &str,
    account_id: &str,
    stored_hash_face: &str,
) -> bool {
    derive_at_enrollment(username, predicted_name, account_id) == stored_hash_face
}

pub fn hash_password(password: &str) -> String {
    sha256_hex(password)
}
