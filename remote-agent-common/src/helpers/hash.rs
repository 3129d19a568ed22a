use data_encoding::HEXLOWER;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::secret::Secret;

/// 32 random bytes, hex-encoded. Used for pairing challenges and bearer tokens.
pub fn generate_token() -> Secret<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes[..]);
    Secret::new(HEXLOWER.encode(&bytes))
}

/// SHA-256 hex digest of a token, as stored at rest in the pairing credential
/// file (`PairedClient::token_hash`). Tokens themselves are never persisted.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    HEXLOWER.encode(&digest)
}

pub fn verify_token(token: &str, expected_hash: &str) -> bool {
    hash_token(token) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
    }

    #[test]
    fn verify_roundtrip() {
        let token = generate_token();
        let hash = hash_token(token.expose_secret());
        assert!(verify_token(token.expose_secret(), &hash));
        assert!(!verify_token("wrong", &hash));
    }
}
