//! Random token generation and hashing shared by sessions and CSRF.

use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// 32 random bytes, URL-safe base64 without padding.
pub(super) fn generate_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; 32];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token so raw values are never used as storage keys.
pub(super) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Compare two tokens through their digests so timing does not depend on a
/// shared prefix of the raw values.
pub(super) fn tokens_match(expected: &str, submitted: &str) -> bool {
    let expected = hash_token(expected);
    let submitted = hash_token(submitted);
    expected
        .iter()
        .zip(submitted.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn generate_token_round_trip() -> Result<()> {
        let token = generate_token()?;
        let decoded = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .context("decode token")?;
        assert_eq!(decoded.len(), 32);
        Ok(())
    }

    #[test]
    fn generate_token_is_random() -> Result<()> {
        assert_ne!(generate_token()?, generate_token()?);
        Ok(())
    }

    #[test]
    fn hash_token_stable() {
        let first = hash_token("token");
        let second = hash_token("token");
        let different = hash_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn tokens_match_only_equal_values() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", ""));
    }
}
