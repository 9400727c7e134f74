//! Signing of relay requests.
//!
//! Key material arrives as PEM-encoded PKCS#8 and is decoded once into a [SigningCredential]. The
//! credential never hands out its private key; it only signs messages and reports its public key.

use std::fmt::{self, Debug, Formatter};

use base64::{Engine as _, engine::general_purpose};
use k256::{
    ecdsa::signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner},
    pkcs8::{DecodePrivateKey, SecretDocument},
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{InteropError, Result};

/// The elliptic curves we accept signing keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// NIST P-256, used by Fabric identities.
    P256,
    Secp256k1,
}

#[derive(Clone)]
enum EcdsaKey {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

/// An ECDSA private key used to sign relay requests.
#[derive(Clone)]
pub struct SigningCredential {
    key: EcdsaKey,
}

impl SigningCredential {
    /// Decodes a PEM-encoded PKCS#8 elliptic-curve private key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (_label, document) =
            SecretDocument::from_pem(pem).map_err(|e| InteropError::KeyDecode(e.to_string()))?;
        Self::from_pkcs8_der(document.as_bytes())
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
            return Ok(SigningCredential {
                key: EcdsaKey::P256(key),
            });
        }
        match k256::ecdsa::SigningKey::from_pkcs8_der(der) {
            Ok(key) => Ok(SigningCredential {
                key: EcdsaKey::Secp256k1(key),
            }),
            Err(e) => Err(InteropError::KeyParse(format!(
                "not a P-256 or secp256k1 key: {e}"
            ))),
        }
    }

    pub fn curve(&self) -> Curve {
        match self.key {
            EcdsaKey::P256(_) => Curve::P256,
            EcdsaKey::Secp256k1(_) => Curve::Secp256k1,
        }
    }

    /// The compressed SEC1 encoding of the public key.
    pub fn verifying_key_sec1(&self) -> Vec<u8> {
        match &self.key {
            EcdsaKey::P256(key) => key
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
            EcdsaKey::Secp256k1(key) => key
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        }
    }

    /// Hashes `message` with SHA-256 and signs the digest, returning an ASN.1 DER encoded signature.
    /// Every call draws a fresh nonce from the operating system's random source.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = hash_message(message);
        let signature = match &self.key {
            EcdsaKey::P256(key) => {
                let signature: p256::ecdsa::Signature = key
                    .sign_prehash_with_rng(&mut OsRng, &digest)
                    .map_err(InteropError::Signing)?;
                signature.to_der().as_bytes().to_vec()
            }
            EcdsaKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash_with_rng(&mut OsRng, &digest)
                    .map_err(InteropError::Signing)?;
                signature.to_der().as_bytes().to_vec()
            }
        };
        Ok(signature)
    }

    /// Checks a DER signature produced by [SigningCredential::sign] over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let digest = hash_message(message);
        match &self.key {
            EcdsaKey::P256(key) => {
                let signature =
                    p256::ecdsa::Signature::from_der(signature).map_err(InteropError::Signing)?;
                key.verifying_key()
                    .verify_prehash(&digest, &signature)
                    .map_err(InteropError::Signing)
            }
            EcdsaKey::Secp256k1(key) => {
                let signature =
                    k256::ecdsa::Signature::from_der(signature).map_err(InteropError::Signing)?;
                key.verifying_key()
                    .verify_prehash(&digest, &signature)
                    .map_err(InteropError::Signing)
            }
        }
    }
}

impl Debug for SigningCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

/// Who we are when talking to the relay.
#[derive(Debug, Clone)]
pub struct Identity {
    pub network_id: String,
    pub org: String,
    pub credential: SigningCredential,
    /// PEM-encoded certificate matching the credential.
    pub certificate: String,
}

impl Identity {
    pub fn new(network_id: &str, org: &str, key_pem: &str, certificate: &str) -> Result<Self> {
        Ok(Identity {
            network_id: network_id.to_owned(),
            org: org.to_owned(),
            credential: SigningCredential::from_pem(key_pem)?,
            certificate: certificate.to_owned(),
        })
    }
}

pub fn hash_message(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

/// A fresh request nonce: the base64 encoding of a random UUID's textual form.
pub fn generate_nonce() -> String {
    general_purpose::STANDARD.encode(Uuid::new_v4().to_string())
}

/// The bytes a request signature covers. The signature is bound to this exact address and nonce.
pub fn signed_message(address: &str, nonce: &str) -> Vec<u8> {
    [address.as_bytes(), nonce.as_bytes()].concat()
}
