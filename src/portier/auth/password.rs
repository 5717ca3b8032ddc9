//! Password hashing and verification (Argon2id, PHC strings).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to encode password: {0}")]
    Encoding(String),
    #[error("credentials do not match")]
    Mismatch,
}

/// One-way password codec.
///
/// Hashes embed their own parameters, so a codec built with different
/// parameters still verifies hashes produced elsewhere.
#[derive(Clone)]
pub struct CredentialCodec {
    argon2: Argon2<'static>,
}

impl Default for CredentialCodec {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialCodec {
    /// Build a codec with explicit Argon2id cost parameters.
    ///
    /// # Errors
    /// Returns an error if the parameters are out of range.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| CredentialError::Encoding(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Produce a salted PHC string for `plaintext`.
    ///
    /// # Errors
    /// Returns [`CredentialError::Encoding`] if salting or hashing fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Encoding(e.to_string()))
    }

    /// Check `plaintext` against a stored PHC string.
    ///
    /// An unparseable stored hash is reported as a mismatch.
    ///
    /// # Errors
    /// Returns [`CredentialError::Mismatch`] when the password is wrong.
    pub fn verify(&self, plaintext: &str, hashed: &str) -> Result<(), CredentialError> {
        let parsed = PasswordHash::new(hashed).map_err(|_| CredentialError::Mismatch)?;
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .map_err(|_| CredentialError::Mismatch)
    }

    /// [`Self::hash`] on the blocking pool; Argon2 is too slow for a runtime worker.
    pub(crate) async fn hash_blocking(
        &self,
        plaintext: &SecretString,
    ) -> Result<String, CredentialError> {
        let codec = self.clone();
        let plaintext = plaintext.clone();
        tokio::task::spawn_blocking(move || codec.hash(plaintext.expose_secret()))
            .await
            .map_err(|e| CredentialError::Encoding(e.to_string()))?
    }

    pub(crate) async fn verify_blocking(
        &self,
        plaintext: &SecretString,
        hashed: &str,
    ) -> Result<(), CredentialError> {
        let codec = self.clone();
        let plaintext = plaintext.clone();
        let hashed = hashed.to_string();
        tokio::task::spawn_blocking(move || codec.verify(plaintext.expose_secret(), &hashed))
            .await
            .map_err(|e| CredentialError::Encoding(e.to_string()))?
    }
}

#[cfg(test)]
pub(crate) fn test_codec() -> CredentialCodec {
    // Minimum Argon2 cost keeps debug-mode tests fast.
    match CredentialCodec::with_params(8, 1, 1) {
        Ok(codec) => codec,
        Err(err) => panic!("invalid test parameters: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn verify_accepts_the_hashed_password() -> Result<()> {
        let codec = test_codec();
        let hashed = codec.hash("correct horse")?;
        assert!(hashed.starts_with("$argon2id$"));
        codec.verify("correct horse", &hashed)?;
        Ok(())
    }

    #[test]
    fn verify_rejects_other_passwords() -> Result<()> {
        let codec = test_codec();
        for (stored, attempt) in [("pw123456", "pw123457"), ("secret", ""), ("a", "A")] {
            let hashed = codec.hash(stored)?;
            assert!(matches!(
                codec.verify(attempt, &hashed),
                Err(CredentialError::Mismatch)
            ));
        }
        Ok(())
    }

    #[test]
    fn hash_is_salted() -> Result<()> {
        let codec = test_codec();
        let first = codec.hash("same")?;
        let second = codec.hash("same")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let codec = test_codec();
        assert!(matches!(
            codec.verify("pw", "not-a-phc-string"),
            Err(CredentialError::Mismatch)
        ));
    }

    #[test]
    fn hashes_verify_across_parameter_sets() -> Result<()> {
        let hashed = test_codec().hash("portable")?;
        let other = CredentialCodec::with_params(16, 2, 1)?;
        other.verify("portable", &hashed)?;
        Ok(())
    }

    #[test]
    fn invalid_params_are_an_encoding_error() {
        assert!(matches!(
            CredentialCodec::with_params(0, 0, 0),
            Err(CredentialError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn blocking_variants_round_trip() -> Result<()> {
        let codec = test_codec();
        let password = SecretString::from("pw123456".to_string());
        let hashed = codec.hash_blocking(&password).await?;
        codec.verify_blocking(&password, &hashed).await?;

        let wrong = SecretString::from("pw654321".to_string());
        assert!(matches!(
            codec.verify_blocking(&wrong, &hashed).await,
            Err(CredentialError::Mismatch)
        ));
        Ok(())
    }
}
