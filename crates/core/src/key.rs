//! Cryptographic keys for transaction signers. Ed25519 and secp256k1
//! schemes are supported.

use std::fmt::{self, Display};

use borsh::{BorshDeserialize, BorshSerialize};
use data_encoding::HEXLOWER;
use k256::ecdsa::signature::{Signer, Verifier};
use thiserror::Error;

use crate::address::Address;

/// Ed25519 public key length
pub const ED25519_PK_LEN: usize = 32;
/// Compressed secp256k1 public key length
pub const SECP256K1_PK_LEN: usize = 33;
/// Signature length of both schemes
pub const SIGNATURE_LEN: usize = 64;

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifySigError {
    #[error("Malformed public key: {0}")]
    MalformedKey(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Signature verification failed: {0}")]
    SigVerifyError(String),
}

/// Signature scheme of a key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeType {
    /// Ed25519
    Ed25519,
    /// Secp256k1 with ECDSA over sha256
    Secp256k1,
}

/// A signer public key
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum PublicKey {
    /// Ed25519 verification key bytes
    Ed25519([u8; ED25519_PK_LEN]),
    /// Compressed SEC1 secp256k1 key bytes
    Secp256k1([u8; SECP256K1_PK_LEN]),
}

impl PublicKey {
    /// The scheme of the key
    pub fn scheme(&self) -> SchemeType {
        match self {
            PublicKey::Ed25519(_) => SchemeType::Ed25519,
            PublicKey::Secp256k1(_) => SchemeType::Secp256k1,
        }
    }

    /// The raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes,
            PublicKey::Secp256k1(bytes) => bytes,
        }
    }

    /// The address owned by this key
    pub fn address(&self) -> Address {
        Address::from_hash_of(self.as_bytes())
    }

    /// Verify a signature over a message
    pub fn verify(
        &self,
        msg: &[u8],
        sig: &[u8],
    ) -> Result<(), VerifySigError> {
        let sig: [u8; SIGNATURE_LEN] = sig.try_into().map_err(|_| {
            VerifySigError::MalformedSignature(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                sig.len()
            ))
        })?;
        match self {
            PublicKey::Ed25519(bytes) => {
                let vk = ed25519_consensus::VerificationKey::try_from(*bytes)
                    .map_err(|err| {
                        VerifySigError::MalformedKey(err.to_string())
                    })?;
                vk.verify(&ed25519_consensus::Signature::from(sig), msg)
                    .map_err(|err| {
                        VerifySigError::SigVerifyError(err.to_string())
                    })
            }
            PublicKey::Secp256k1(bytes) => {
                let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
                    .map_err(|err| {
                        VerifySigError::MalformedKey(err.to_string())
                    })?;
                let sig = k256::ecdsa::Signature::from_slice(&sig).map_err(
                    |err| VerifySigError::MalformedSignature(err.to_string()),
                )?;
                vk.verify(msg, &sig).map_err(|err| {
                    VerifySigError::SigVerifyError(err.to_string())
                })
            }
        }
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(self.as_bytes()))
    }
}

/// A signer secret key, used by clients and tests to sign transactions
#[derive(Clone)]
pub enum SecretKey {
    /// Ed25519 signing key
    Ed25519(ed25519_consensus::SigningKey),
    /// Secp256k1 signing key
    Secp256k1(k256::ecdsa::SigningKey),
}

impl SecretKey {
    /// Build an ed25519 key from a 32 byte seed
    pub fn ed25519_from_seed(seed: [u8; 32]) -> Self {
        SecretKey::Ed25519(ed25519_consensus::SigningKey::from(seed))
    }

    /// Build a secp256k1 key from 32 secret scalar bytes
    pub fn secp256k1_from_bytes(
        bytes: [u8; 32],
    ) -> Result<Self, VerifySigError> {
        k256::ecdsa::SigningKey::from_slice(&bytes)
            .map(SecretKey::Secp256k1)
            .map_err(|err| VerifySigError::MalformedKey(err.to_string()))
    }

    /// The public key of this secret key
    pub fn ref_to(&self) -> PublicKey {
        match self {
            SecretKey::Ed25519(sk) => {
                PublicKey::Ed25519(sk.verification_key().to_bytes())
            }
            SecretKey::Secp256k1(sk) => {
                let point = sk.verifying_key().to_encoded_point(true);
                let mut bytes = [0u8; SECP256K1_PK_LEN];
                bytes.copy_from_slice(point.as_bytes());
                PublicKey::Secp256k1(bytes)
            }
        }
    }

    /// Sign a message
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        match self {
            SecretKey::Ed25519(sk) => sk.sign(msg).to_bytes().to_vec(),
            SecretKey::Secp256k1(sk) => {
                let sig: k256::ecdsa::Signature = sk.sign(msg);
                sig.to_bytes().to_vec()
            }
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", self.ref_to())
    }
}

/// Helpers for testing with keys.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    /// A sampled ed25519 keypair for tests
    pub fn keypair_1() -> SecretKey {
        SecretKey::ed25519_from_seed([1; 32])
    }

    /// A sampled ed25519 keypair for tests
    pub fn keypair_2() -> SecretKey {
        SecretKey::ed25519_from_seed([2; 32])
    }

    /// A sampled secp256k1 keypair for tests
    pub fn keypair_3() -> SecretKey {
        SecretKey::secp256k1_from_bytes([3; 32])
            .expect("Test secret key must be valid")
    }
}
