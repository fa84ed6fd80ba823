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

//! The labeled HKDF derivations that chain one epoch into the next. The
//! label strings are wire-visible: they feed HKDF and therefore the epoch
//! keys, so they are part of the protocol contract.

use crate::codec::*;
use crate::crypto::hash::{hash_length, HashAlgorithm};
use crate::crypto::hkdf;
use crate::crypto::CipherSuite;

pub fn derive_secret(
    ciphersuite: CipherSuite,
    secret: &[u8],
    label: &str,
    state_hash: &[u8],
) -> Vec<u8> {
    hkdf_expand_label(
        ciphersuite,
        secret,
        label,
        state_hash,
        hash_length(HashAlgorithm::from(ciphersuite)),
    )
}

pub fn hkdf_expand_label(
    ciphersuite: CipherSuite,
    secret: &[u8],
    label: &str,
    context: &[u8],
    length: usize,
) -> Vec<u8> {
    let hkdf_label = HkdfLabel::new(context, label, length);
    let info = hkdf_label.serialize();
    hkdf::expand(ciphersuite.into(), secret, &info, length).unwrap()
}

pub struct HkdfLabel {
    length: u16,
    label: String,
    context: Vec<u8>,
}

impl HkdfLabel {
    pub fn new(context: &[u8], label: &str, length: usize) -> Self {
        let full_label = "mls10 ".to_owned() + label;
        HkdfLabel {
            length: length as u16,
            label: full_label,
            context: context.to_vec(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.length.encode(&mut buffer).unwrap();
        encode_vec(VecSize::VecU8, &mut buffer, self.label.as_bytes()).unwrap();
        encode_vec(VecSize::VecU32, &mut buffer, &self.context).unwrap();
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::randombytes;

    #[test]
    fn labels_separate_outputs() {
        let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let secret = randombytes(32);
        let state_hash = randombytes(32);

        let msg = derive_secret(suite, &secret, "msg", &state_hash);
        let init = derive_secret(suite, &secret, "init", &state_hash);
        assert_eq!(msg.len(), 32);
        assert_ne!(msg, init);

        // Same inputs, same output.
        assert_eq!(msg, derive_secret(suite, &secret, "msg", &state_hash));
        // Different context, different output.
        assert_ne!(
            msg,
            derive_secret(suite, &secret, "msg", &randombytes(32))
        );
    }

    #[test]
    fn label_serialization() {
        let label = HkdfLabel::new(&[1, 2], "msg", 32);
        let mut expected = vec![0u8, 32u8];
        expected.push(9);
        expected.extend_from_slice(b"mls10 msg");
        expected.extend_from_slice(&[0, 0, 0, 2, 1, 2]);
        assert_eq!(label.serialize(), expected);
    }
}
