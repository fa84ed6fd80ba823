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

use crate::crypto::CipherSuite;
use aead::generic_array::GenericArray;
use aead::{Aead, NewAead, Payload};
use aes_gcm::Aes128Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroize;

#[derive(Copy, Clone, PartialEq)]
pub enum AEADAlgorithm {
    AES128GCM,
    CHACHA20POLY1305,
    INVALID,
}

impl From<CipherSuite> for AEADAlgorithm {
    fn from(value: CipherSuite) -> Self {
        match value {
            CipherSuite::X25519_SHA256_AES128GCM_Ed25519 => AEADAlgorithm::AES128GCM,
            CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519 => AEADAlgorithm::CHACHA20POLY1305,
            CipherSuite::INVALID => AEADAlgorithm::INVALID,
        }
    }
}

#[derive(Debug)]
pub enum AEADError {
    EncryptionError,
    DecryptionError,
    WrongKeyLength,
}

pub const NONCEBYTES: usize = 12;
pub const AES128KEYBYTES: usize = 16;
pub const CHACHAKEYBYTES: usize = 32;

#[derive(PartialEq, Debug)]
pub struct Nonce([u8; NONCEBYTES]);

impl Nonce {
    pub fn from_slice(slice: &[u8]) -> Result<Nonce, AEADError> {
        if slice.len() != NONCEBYTES {
            return Err(AEADError::WrongKeyLength);
        }
        let mut bytes = [0u8; NONCEBYTES];
        bytes.copy_from_slice(slice);
        Ok(Nonce(bytes))
    }
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
    pub fn nonce_length(algorithm: AEADAlgorithm) -> Result<usize, AEADError> {
        match algorithm {
            AEADAlgorithm::INVALID => Err(AEADError::WrongKeyLength),
            _ => Ok(NONCEBYTES),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct AEADKey {
    value: Vec<u8>,
}

impl AEADKey {
    pub fn from_slice(algorithm: AEADAlgorithm, slice: &[u8]) -> Result<AEADKey, AEADError> {
        if slice.len() != AEADKey::key_length(algorithm)? {
            return Err(AEADError::WrongKeyLength);
        }
        Ok(AEADKey {
            value: slice.to_vec(),
        })
    }
    pub fn as_slice(&self) -> &[u8] {
        self.value.as_slice()
    }
    pub fn key_length(algorithm: AEADAlgorithm) -> Result<usize, AEADError> {
        match algorithm {
            AEADAlgorithm::AES128GCM => Ok(AES128KEYBYTES),
            AEADAlgorithm::CHACHA20POLY1305 => Ok(CHACHAKEYBYTES),
            AEADAlgorithm::INVALID => Err(AEADError::WrongKeyLength),
        }
    }
}

impl Drop for AEADKey {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

pub fn aead_seal(
    algorithm: AEADAlgorithm,
    msg: &[u8],
    aad: &[u8],
    key: &AEADKey,
    nonce: &Nonce,
) -> Result<Vec<u8>, AEADError> {
    let payload = Payload { msg, aad };
    let nonce = GenericArray::from_slice(nonce.as_slice());
    match algorithm {
        AEADAlgorithm::AES128GCM => {
            let cipher = Aes128Gcm::new(GenericArray::from_slice(key.as_slice()));
            cipher
                .encrypt(nonce, payload)
                .map_err(|_| AEADError::EncryptionError)
        }
        AEADAlgorithm::CHACHA20POLY1305 => {
            let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key.as_slice()));
            cipher
                .encrypt(nonce, payload)
                .map_err(|_| AEADError::EncryptionError)
        }
        AEADAlgorithm::INVALID => Err(AEADError::EncryptionError),
    }
}

pub fn aead_open(
    algorithm: AEADAlgorithm,
    ciphertext: &[u8],
    aad: &[u8],
    key: &AEADKey,
    nonce: &Nonce,
) -> Result<Vec<u8>, AEADError> {
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    let nonce = GenericArray::from_slice(nonce.as_slice());
    match algorithm {
        AEADAlgorithm::AES128GCM => {
            let cipher = Aes128Gcm::new(GenericArray::from_slice(key.as_slice()));
            cipher
                .decrypt(nonce, payload)
                .map_err(|_| AEADError::DecryptionError)
        }
        AEADAlgorithm::CHACHA20POLY1305 => {
            let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(key.as_slice()));
            cipher
                .decrypt(nonce, payload)
                .map_err(|_| AEADError::DecryptionError)
        }
        AEADAlgorithm::INVALID => Err(AEADError::DecryptionError),
    }
}
