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
use hmac::{Hmac, Mac, NewMac};
use sha2::{Sha256, Sha512};

#[derive(Copy, Clone)]
pub enum HMACAlgorithm {
    SHA256,
    SHA512,
    INVALID,
}

impl From<CipherSuite> for HMACAlgorithm {
    fn from(value: CipherSuite) -> Self {
        match value {
            CipherSuite::X25519_SHA256_AES128GCM_Ed25519 => HMACAlgorithm::SHA256,
            CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519 => HMACAlgorithm::SHA256,
            CipherSuite::INVALID => HMACAlgorithm::INVALID,
        }
    }
}

#[derive(Debug)]
pub enum HMACError {
    InvalidKeyLength,
    InvalidAlgorithm,
}

pub fn hash_length(algorithm: HMACAlgorithm) -> usize {
    match algorithm {
        HMACAlgorithm::SHA256 => 32,
        HMACAlgorithm::SHA512 => 64,
        _ => 0,
    }
}

#[allow(clippy::large_enum_variant)]
enum HMACType {
    SHA256(Hmac<Sha256>),
    SHA512(Hmac<Sha512>),
}

pub struct HMAC {
    inner: HMACType,
}

impl HMAC {
    pub fn new(algorithm: HMACAlgorithm, key: &[u8]) -> Result<Self, HMACError> {
        match algorithm {
            HMACAlgorithm::SHA256 => match Hmac::new_varkey(key) {
                Ok(inner) => Ok(Self {
                    inner: HMACType::SHA256(inner),
                }),
                Err(_) => Err(HMACError::InvalidKeyLength),
            },
            HMACAlgorithm::SHA512 => match Hmac::new_varkey(key) {
                Ok(inner) => Ok(Self {
                    inner: HMACType::SHA512(inner),
                }),
                Err(_) => Err(HMACError::InvalidKeyLength),
            },
            HMACAlgorithm::INVALID => Err(HMACError::InvalidAlgorithm),
        }
    }

    pub fn input(&mut self, data: &[u8]) {
        match &mut self.inner {
            HMACType::SHA256(mac) => mac.update(data),
            HMACType::SHA512(mac) => mac.update(data),
        }
    }

    pub fn result(self) -> Vec<u8> {
        match self.inner {
            HMACType::SHA256(mac) => mac.finalize().into_bytes().to_vec(),
            HMACType::SHA512(mac) => mac.finalize().into_bytes().to_vec(),
        }
    }
}

#[test]
fn test_rfc4231_case_2() {
    use crate::utils::*;

    let mut mac = HMAC::new(HMACAlgorithm::SHA256, b"Jefe").unwrap();
    mac.input(b"what do ya want for nothing?");
    assert_eq!(
        mac.result(),
        hex_to_bytes("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
    );
}
