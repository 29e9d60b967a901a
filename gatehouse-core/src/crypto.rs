//! Peppered Argon2id credential hashing for the bundled providers.
//!
//! Hashing and verification run on tokio's blocking pool; at production cost
//! a single call holds tens of MiB and would otherwise stall a runtime worker.
//! Verification reads the cost from the stored PHC string, so raising
//! [`HashingCost`] only affects passwords hashed afterwards.

use std::fmt;
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString};
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Argon2id cost, configured under `[crypto]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl HashingCost {
    /// Cheapest cost Argon2 accepts. Only for tests and throwaway setups.
    pub fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    /// True when either memory or iterations fall below `baseline`.
    pub fn is_weaker_than(&self, baseline: &HashingCost) -> bool {
        self.memory_kib < baseline.memory_kib || self.iterations < baseline.iterations
    }

    fn params(&self) -> Result<Params, HashError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|err| HashError::Cost(err.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password pepper must not be empty")]
    MissingPepper,

    #[error("argon2 cost rejected: {0}")]
    Cost(String),

    #[error("stored credential is not a PHC string: {0}")]
    Malformed(String),

    #[error("unable to generate salt: {0}")]
    Salt(String),

    #[error("argon2 failure: {0}")]
    Argon2(String),

    #[error("hashing task did not complete: {0}")]
    Task(String),
}

struct Keyed {
    cost: HashingCost,
    params: Params,
    pepper: Zeroizing<Vec<u8>>,
}

impl Keyed {
    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Password followed by the pepper, wiped on drop.
    fn input(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut input = Zeroizing::new(Vec::with_capacity(password.len() + self.pepper.len()));
        input.extend_from_slice(password.as_bytes());
        input.extend_from_slice(&self.pepper);
        input
    }

    fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut raw_salt = [0u8; Salt::RECOMMENDED_LENGTH];
        OsRng
            .try_fill_bytes(&mut raw_salt)
            .map_err(|err| HashError::Salt(err.to_string()))?;
        let salt =
            SaltString::encode_b64(&raw_salt).map_err(|err| HashError::Salt(err.to_string()))?;

        self.argon2()
            .hash_password(&self.input(password), &salt)
            .map(|phc| phc.to_string())
            .map_err(|err| HashError::Argon2(err.to_string()))
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, HashError> {
        let parsed =
            PasswordHash::new(stored).map_err(|err| HashError::Malformed(err.to_string()))?;

        match self.argon2().verify_password(&self.input(password), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(HashError::Argon2(err.to_string())),
        }
    }
}

/// Cheap to clone; clones share the pepper and parameters.
#[derive(Clone)]
pub struct CredentialHasher {
    keyed: Arc<Keyed>,
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("cost", &self.keyed.cost)
            .finish_non_exhaustive()
    }
}

impl CredentialHasher {
    pub fn new(pepper: impl AsRef<[u8]>, cost: HashingCost) -> Result<Self, HashError> {
        let pepper = pepper.as_ref();
        if pepper.is_empty() {
            return Err(HashError::MissingPepper);
        }

        Ok(Self {
            keyed: Arc::new(Keyed {
                cost,
                params: cost.params()?,
                pepper: Zeroizing::new(pepper.to_vec()),
            }),
        })
    }

    pub fn cost(&self) -> HashingCost {
        self.keyed.cost
    }

    /// Hash with a fresh random salt, returning a PHC string.
    pub async fn hash(&self, password: &str) -> Result<String, HashError> {
        let keyed = Arc::clone(&self.keyed);
        let password = Zeroizing::new(password.to_owned());

        tokio::task::spawn_blocking(move || keyed.hash(&password))
            .await
            .map_err(|err| HashError::Task(err.to_string()))?
    }

    /// `Ok(false)` on mismatch; errors are reserved for unusable stored values.
    pub async fn verify(&self, password: &str, stored: &str) -> Result<bool, HashError> {
        let keyed = Arc::clone(&self.keyed);
        let password = Zeroizing::new(password.to_owned());
        let stored = stored.to_owned();

        tokio::task::spawn_blocking(move || keyed.verify(&password, &stored))
            .await
            .map_err(|err| HashError::Task(err.to_string()))?
    }
}
