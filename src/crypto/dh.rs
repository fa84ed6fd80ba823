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
use crate::crypto::hash::{hash, HashAlgorithm};
use crate::crypto::CipherSuite;
use rand::rngs::OsRng;
use std::fmt;

pub const X25519_PRIVATE_KEY_BYTES: usize = 32;
pub const X25519_PUBLIC_KEY_BYTES: usize = 32;
pub const X25519_SHARED_SECRET_BYTES: usize = 32;

#[derive(PartialEq, Clone, Copy, Debug)]
#[repr(u8)]
pub enum DHAlgorithm {
    X25519 = 1,
    INVALID = 255,
}

impl From<CipherSuite> for DHAlgorithm {
    fn from(value: CipherSuite) -> Self {
        match value {
            CipherSuite::X25519_SHA256_AES128GCM_Ed25519 => DHAlgorithm::X25519,
            CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519 => DHAlgorithm::X25519,
            CipherSuite::INVALID => DHAlgorithm::INVALID,
        }
    }
}

#[derive(Debug)]
pub enum DHError {
    WrongKeySize,
    InvalidAlgorithm,
}

pub fn shared_secret_length(algorithm: DHAlgorithm) -> usize {
    match algorithm {
        DHAlgorithm::X25519 => X25519_SHARED_SECRET_BYTES,
        DHAlgorithm::INVALID => 0,
    }
}

#[derive(Clone)]
pub struct DHPublicKey {
    key: x25519_dalek::PublicKey,
}

impl DHPublicKey {
    pub fn from_slice(bytes: &[u8], algorithm: DHAlgorithm) -> Result<DHPublicKey, DHError> {
        if algorithm != DHAlgorithm::X25519 {
            return Err(DHError::InvalidAlgorithm);
        }
        if bytes.len() != X25519_PUBLIC_KEY_BYTES {
            return Err(DHError::WrongKeySize);
        }
        let mut value = [0u8; X25519_PUBLIC_KEY_BYTES];
        value.copy_from_slice(bytes);
        Ok(DHPublicKey {
            key: x25519_dalek::PublicKey::from(value),
        })
    }
    pub fn as_slice(&self) -> Vec<u8> {
        self.key.as_bytes().to_vec()
    }
}

impl PartialEq for DHPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.as_bytes() == other.key.as_bytes()
    }
}

impl fmt::Debug for DHPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DHPublicKey({})", crate::utils::bytes_to_hex(self.key.as_bytes()))
    }
}

impl Codec for DHPublicKey {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU8, buffer, self.key.as_bytes())?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let key_bytes = decode_vec(VecSize::VecU8, cursor)?;
        DHPublicKey::from_slice(&key_bytes, DHAlgorithm::X25519)
            .map_err(|_| CodecError::DecodingError)
    }
}

#[derive(Clone)]
pub struct DHPrivateKey {
    key: x25519_dalek::StaticSecret,
}

impl DHPrivateKey {
    pub fn new(algorithm: DHAlgorithm) -> Result<Self, DHError> {
        if algorithm != DHAlgorithm::X25519 {
            return Err(DHError::InvalidAlgorithm);
        }
        Ok(Self {
            key: x25519_dalek::StaticSecret::new(&mut OsRng),
        })
    }
    /// Deterministic derivation from a seed. The scalar is the digest of the
    /// seed, so equal seeds yield equal key pairs on every member.
    pub fn derive(algorithm: DHAlgorithm, seed: &[u8]) -> Result<Self, DHError> {
        if algorithm != DHAlgorithm::X25519 {
            return Err(DHError::InvalidAlgorithm);
        }
        let digest = hash(HashAlgorithm::SHA256, seed);
        let mut value = [0u8; X25519_PRIVATE_KEY_BYTES];
        value.copy_from_slice(&digest[..X25519_PRIVATE_KEY_BYTES]);
        Ok(Self {
            key: x25519_dalek::StaticSecret::from(value),
        })
    }
    pub fn shared_secret(&self, public_key: &DHPublicKey) -> Result<Vec<u8>, DHError> {
        let shared_secret = self.key.diffie_hellman(&public_key.key);
        Ok(shared_secret.as_bytes().to_vec())
    }
    pub fn derive_public_key(&self) -> DHPublicKey {
        DHPublicKey {
            key: x25519_dalek::PublicKey::from(&self.key),
        }
    }
    pub fn from_slice(bytes: &[u8], algorithm: DHAlgorithm) -> Result<DHPrivateKey, DHError> {
        if algorithm != DHAlgorithm::X25519 {
            return Err(DHError::InvalidAlgorithm);
        }
        if bytes.len() != X25519_PRIVATE_KEY_BYTES {
            return Err(DHError::WrongKeySize);
        }
        let mut value = [0u8; X25519_PRIVATE_KEY_BYTES];
        value.copy_from_slice(bytes);
        Ok(DHPrivateKey {
            key: x25519_dalek::StaticSecret::from(value),
        })
    }
    pub fn as_slice(&self) -> Vec<u8> {
        self.key.to_bytes().to_vec()
    }
}

impl fmt::Debug for DHPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<DHPrivateKey>")
    }
}

#[derive(Debug, Clone)]
pub struct DHKeyPair {
    pub private_key: DHPrivateKey,
    pub public_key: DHPublicKey,
}

impl DHKeyPair {
    pub fn new(algorithm: DHAlgorithm) -> Result<DHKeyPair, DHError> {
        let private_key = DHPrivateKey::new(algorithm)?;
        Ok(DHKeyPair::from_private_key(&private_key))
    }
    pub fn from_private_key(private_key: &DHPrivateKey) -> DHKeyPair {
        DHKeyPair {
            private_key: private_key.clone(),
            public_key: private_key.derive_public_key(),
        }
    }
}

#[test]
fn test_shared_secret_agreement() {
    let alice = DHKeyPair::new(DHAlgorithm::X25519).unwrap();
    let bob = DHKeyPair::new(DHAlgorithm::X25519).unwrap();
    assert_eq!(
        alice.private_key.shared_secret(&bob.public_key).unwrap(),
        bob.private_key.shared_secret(&alice.public_key).unwrap()
    );
}

#[test]
fn test_derive_is_deterministic() {
    let seed = crate::utils::randombytes(32);
    let k1 = DHPrivateKey::derive(DHAlgorithm::X25519, &seed).unwrap();
    let k2 = DHPrivateKey::derive(DHAlgorithm::X25519, &seed).unwrap();
    assert_eq!(k1.derive_public_key(), k2.derive_public_key());

    let other = DHPrivateKey::derive(DHAlgorithm::X25519, b"other seed").unwrap();
    assert_ne!(k1.derive_public_key(), other.derive_public_key());
}

#[test]
fn test_public_key_codec() {
    let keypair = DHKeyPair::new(DHAlgorithm::X25519).unwrap();
    let encoded = keypair.public_key.encode_detached().unwrap();
    assert_eq!(encoded.len(), X25519_PUBLIC_KEY_BYTES + 1);
    let decoded = DHPublicKey::decode_detached(&encoded).unwrap();
    assert_eq!(decoded, keypair.public_key);
}
