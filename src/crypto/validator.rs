//! Pluggable signature validation
//!
//! The coordinator only asks "does this signature from this key cover this
//! digest". Validators are pure and may run concurrently without locking.

use thiserror::Error;

use super::keys::{public_key_from_hex, verify_signature};

/// Why a signature was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed public key")]
    MalformedKey,
    #[error("malformed signature payload")]
    MalformedSignature,
    #[error("signature does not match message")]
    Mismatch,
}

/// Checks a signature against a public key and message digest
pub trait SignatureValidator: Send + Sync {
    fn validate(
        &self,
        public_key: &str,
        message: &[u8],
        signature: &str,
    ) -> Result<(), ValidationError>;
}

/// secp256k1 ECDSA validator over hex-encoded keys and compact signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Validator;

impl SignatureValidator for Secp256k1Validator {
    fn validate(
        &self,
        public_key: &str,
        message: &[u8],
        signature: &str,
    ) -> Result<(), ValidationError> {
        let key = public_key_from_hex(public_key).map_err(|_| ValidationError::MalformedKey)?;
        let sig = hex::decode(signature).map_err(|_| ValidationError::MalformedSignature)?;

        match verify_signature(&key, message, &sig) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ValidationError::Mismatch),
            Err(_) => Err(ValidationError::MalformedSignature),
        }
    }
}
