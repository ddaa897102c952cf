//! Argon2id password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...`) carrying their own salt
//! and parameters, so verification always uses what the digest says. Hashing
//! is CPU-bound and runs on the blocking pool.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::task::spawn_blocking;

use crate::auth::PasswordHasher;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    fn to_argon2(self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| anyhow!("invalid argon2 params: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Argon2Params,
    /// Digest of a random throwaway password, verified against when the
    /// username is unknown.
    decoy: String,
}

impl Argon2Hasher {
    /// # Errors
    /// Returns an error if the parameters are out of range.
    pub fn new(params: Argon2Params) -> Result<Self> {
        let decoy_password = SaltString::generate(&mut OsRng);
        let decoy = hash_blocking(params, decoy_password.as_str())
            .context("failed to prepare decoy digest")?;
        Ok(Self { params, decoy })
    }

    #[must_use]
    pub fn params(&self) -> Argon2Params {
        self.params
    }
}

fn hash_blocking(params: Argon2Params, plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = params
        .to_argon2()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(digest.to_string())
}

fn verify_blocking(plaintext: &str, digest: &str) -> Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| anyhow!("malformed stored digest: {e}"))?;
    // Parameters come from the digest; the default instance only supplies the algorithm code.
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    async fn hash(&self, plaintext: &SecretString) -> Result<String> {
        let params = self.params;
        let plaintext = plaintext.clone();
        spawn_blocking(move || hash_blocking(params, plaintext.expose_secret()))
            .await
            .context("hashing task panicked")?
    }

    async fn verify(&self, plaintext: &SecretString, digest: &str) -> Result<bool> {
        let plaintext = plaintext.clone();
        let digest = digest.to_string();
        spawn_blocking(move || verify_blocking(plaintext.expose_secret(), &digest))
            .await
            .context("verification task panicked")?
    }

    async fn verify_absent(&self, plaintext: &SecretString) -> Result<()> {
        self.verify(plaintext, &self.decoy).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn cheap() -> Argon2Params {
        Argon2Params {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn hash_then_verify() -> Result<()> {
        let hasher = Argon2Hasher::new(cheap())?;
        let digest = hasher.hash(&secret("P@ss1")).await?;

        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("P@ss1"));
        assert!(hasher.verify(&secret("P@ss1"), &digest).await?);
        assert!(!hasher.verify(&secret("P@ss2"), &digest).await?);
        Ok(())
    }

    #[tokio::test]
    async fn same_password_different_salt() -> Result<()> {
        let hasher = Argon2Hasher::new(cheap())?;
        let first = hasher.hash(&secret("same")).await?;
        let second = hasher.hash(&secret("same")).await?;

        assert_ne!(first, second);
        assert!(hasher.verify(&secret("same"), &first).await?);
        assert!(hasher.verify(&secret("same"), &second).await?);
        Ok(())
    }

    #[tokio::test]
    async fn verify_uses_params_embedded_in_digest() -> Result<()> {
        let digest = Argon2Hasher::new(cheap())?.hash(&secret("pw")).await?;
        let other = Argon2Hasher::new(Argon2Params {
            memory_kib: 128,
            iterations: 2,
            parallelism: 1,
        })?;
        assert!(other.verify(&secret("pw"), &digest).await?);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_digest_is_an_error() -> Result<()> {
        let hasher = Argon2Hasher::new(cheap())?;
        assert!(hasher.verify(&secret("pw"), "plaintext-not-a-phc").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn verify_absent_succeeds() -> Result<()> {
        let hasher = Argon2Hasher::new(cheap())?;
        hasher.verify_absent(&secret("anything")).await
    }

    #[test]
    fn rejects_out_of_range_params() {
        let params = Argon2Params {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(Argon2Hasher::new(params).is_err());
    }
}
