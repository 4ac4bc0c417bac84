//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing and the length-prefixed digest builder
//! - ECDSA key handling (secp256k1)
//! - The pluggable signature validator used by the coordinator

pub mod hash;
pub mod keys;
pub mod validator;

pub use hash::{sha256, FieldHasher};
pub use keys::{public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair};
pub use validator::{Secp256k1Validator, SignatureValidator, ValidationError};
