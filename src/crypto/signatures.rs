// treekem
// Copyright (C) 2020 The treekem authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see http://www.gnu.org/licenses/.

use crate::codec::*;
use crate::creds::Identity;
use crate::crypto::CipherSuite;
use ed25519_dalek::Verifier;
use rand::rngs::OsRng;
use std::convert::TryFrom;
use std::fmt;

#[derive(Debug)]
pub enum SignatureError {
    InvalidAlgorithm,
    WrongKeyLength,
}

#[derive(PartialEq, Clone, Copy, Debug)]
#[repr(u8)]
pub enum SignatureAlgorithm {
    Ed25519 = 1,
    INVALID = 255,
}

impl From<CipherSuite> for SignatureAlgorithm {
    fn from(value: CipherSuite) -> Self {
        match value {
            CipherSuite::X25519_SHA256_AES128GCM_Ed25519 => SignatureAlgorithm::Ed25519,
            CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519 => SignatureAlgorithm::Ed25519,
            CipherSuite::INVALID => SignatureAlgorithm::INVALID,
        }
    }
}

/// Anything carrying a signature over its own wire encoding. The payload is
/// the encoding of every field preceding the signature.
pub trait Signable: Sized {
    fn unsigned_payload(&self) -> Result<Vec<u8>, CodecError>;

    fn sign(&self, identity: &Identity) -> Signature {
        identity.sign(&self.unsigned_payload().unwrap())
    }
    fn verify_signature(&self, public_key: &SignaturePublicKey, signature: &Signature) -> bool {
        public_key.verify(&self.unsigned_payload().unwrap(), signature)
    }
}

/// Opaque signature bytes. A corrupted value fails verification instead of
/// failing to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    value: Vec<u8>,
}

impl Signature {
    pub fn new_empty() -> Self {
        Signature { value: vec![] }
    }
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Signature {
            value: bytes.to_vec(),
        }
    }
    pub fn as_slice(&self) -> &[u8] {
        &self.value
    }
}

impl Codec for Signature {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU16, buffer, &self.value)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let value = decode_vec(VecSize::VecU16, cursor)?;
        Ok(Signature { value })
    }
}

#[derive(Clone)]
pub struct SignaturePublicKey {
    key: ed25519_dalek::PublicKey,
}

impl SignaturePublicKey {
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
        let value = match ed25519_dalek::Signature::try_from(signature.as_slice()) {
            Ok(value) => value,
            Err(_) => return false,
        };
        self.key.verify(payload, &value).is_ok()
    }
    pub fn from_slice(bytes: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        if algorithm != SignatureAlgorithm::Ed25519 {
            return Err(SignatureError::InvalidAlgorithm);
        }
        match ed25519_dalek::PublicKey::from_bytes(bytes) {
            Ok(key) => Ok(SignaturePublicKey { key }),
            Err(_) => Err(SignatureError::WrongKeyLength),
        }
    }
    pub fn as_slice(&self) -> Vec<u8> {
        self.key.to_bytes().to_vec()
    }
}

impl PartialEq for SignaturePublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.as_bytes() == other.key.as_bytes()
    }
}

impl fmt::Debug for SignaturePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignaturePublicKey({})",
            crate::utils::bytes_to_hex(self.key.as_bytes())
        )
    }
}

impl Codec for SignaturePublicKey {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU16, buffer, &self.key.to_bytes())?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let key_bytes = decode_vec(VecSize::VecU16, cursor)?;
        match ed25519_dalek::PublicKey::from_bytes(&key_bytes) {
            Ok(key) => Ok(SignaturePublicKey { key }),
            Err(_) => Err(CodecError::DecodingError),
        }
    }
}

pub struct SignatureKeypair {
    secret_key: ed25519_dalek::SecretKey,
    public_key: ed25519_dalek::PublicKey,
}

impl SignatureKeypair {
    pub fn new(algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        if algorithm != SignatureAlgorithm::Ed25519 {
            return Err(SignatureError::InvalidAlgorithm);
        }
        let secret_key = ed25519_dalek::SecretKey::generate(&mut OsRng);
        let public_key = ed25519_dalek::PublicKey::from(&secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }
    pub fn sign(&self, payload: &[u8]) -> Signature {
        let expanded = ed25519_dalek::ExpandedSecretKey::from(&self.secret_key);
        Signature {
            value: expanded.sign(payload, &self.public_key).to_bytes().to_vec(),
        }
    }
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
        self.get_public_key().verify(payload, signature)
    }
    pub fn get_public_key(&self) -> SignaturePublicKey {
        SignaturePublicKey {
            key: self.public_key,
        }
    }
}

impl Clone for SignatureKeypair {
    fn clone(&self) -> Self {
        let secret_key = ed25519_dalek::SecretKey::from_bytes(self.secret_key.as_bytes())
            .expect("secret key bytes round-trip");
        SignatureKeypair {
            secret_key,
            public_key: self.public_key,
        }
    }
}

impl fmt::Debug for SignatureKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<SignatureKeypair>")
    }
}

#[test]
fn test_sign_verify() {
    let keypair = SignatureKeypair::new(SignatureAlgorithm::Ed25519).unwrap();
    let payload = vec![0, 1, 2, 3];
    let signature = keypair.sign(&payload);
    assert!(keypair.verify(&payload, &signature));
    assert!(!keypair.verify(&payload[1..], &signature));
}

#[test]
fn test_tampered_signature() {
    let keypair = SignatureKeypair::new(SignatureAlgorithm::Ed25519).unwrap();
    let payload = vec![4, 5, 6];
    let signature = keypair.sign(&payload);
    for i in 0..signature.as_slice().len() {
        let mut bytes = signature.as_slice().to_vec();
        bytes[i] ^= 0x01;
        assert!(!keypair.verify(&payload, &Signature::from_bytes(&bytes)));
    }
}

#[test]
fn test_public_key_codec() {
    let keypair = SignatureKeypair::new(SignatureAlgorithm::Ed25519).unwrap();
    let pk = keypair.get_public_key();
    let decoded = SignaturePublicKey::decode_detached(&pk.encode_detached().unwrap()).unwrap();
    assert_eq!(pk, decoded);
}
