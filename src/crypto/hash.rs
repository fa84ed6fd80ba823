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
use sha2::{Digest, Sha256, Sha512};

#[derive(Copy, Clone)]
pub enum HashAlgorithm {
    SHA256,
    SHA512,
    INVALID,
}

impl From<CipherSuite> for HashAlgorithm {
    fn from(value: CipherSuite) -> Self {
        match value {
            CipherSuite::X25519_SHA256_AES128GCM_Ed25519 => HashAlgorithm::SHA256,
            CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519 => HashAlgorithm::SHA256,
            CipherSuite::INVALID => HashAlgorithm::INVALID,
        }
    }
}

pub fn hash_length(algorithm: HashAlgorithm) -> usize {
    match algorithm {
        HashAlgorithm::SHA256 => 32,
        HashAlgorithm::SHA512 => 64,
        _ => 0,
    }
}

pub fn hash(algorithm: HashAlgorithm, payload: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::SHA256 => Sha256::digest(payload).as_slice().to_vec(),
        HashAlgorithm::SHA512 => Sha512::digest(payload).as_slice().to_vec(),
        _ => vec![],
    }
}

#[test]
fn test_sha256_empty_input() {
    use crate::utils::*;
    assert_eq!(
        hash(HashAlgorithm::SHA256, b""),
        hex_to_bytes("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
    );
}
