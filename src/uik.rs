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
use crate::creds::*;
use crate::crypto::dh::*;
use crate::crypto::signatures::*;
use crate::crypto::CipherSuite;

/// The pre-keying envelope a prospective member publishes: one DH init key
/// per offered cipher suite, signed by the long-term identity key. The same
/// init secret seeds every entry, so the holder can re-derive the private
/// half for whichever suite the group picks.
#[derive(Debug, PartialEq, Clone)]
pub struct UserInitKey {
    pub cipher_suites: Vec<CipherSuite>,
    pub init_keys: Vec<DHPublicKey>,
    pub identity_key: SignaturePublicKey,
    pub signature: Signature,
}

impl UserInitKey {
    pub fn new(
        cipher_suites: Vec<CipherSuite>,
        init_secret: &[u8],
        identity: &Identity,
    ) -> Result<Self, DHError> {
        let mut init_keys = Vec::with_capacity(cipher_suites.len());
        for suite in cipher_suites.iter() {
            let private_key = DHPrivateKey::derive((*suite).into(), init_secret)?;
            init_keys.push(private_key.derive_public_key());
        }
        let mut init_key = Self {
            cipher_suites,
            init_keys,
            identity_key: identity.public_key(),
            signature: Signature::new_empty(),
        };
        init_key.signature = init_key.sign(identity);
        Ok(init_key)
    }

    /// The init key offered for `ciphersuite`, if any.
    pub fn init_key_for(&self, ciphersuite: CipherSuite) -> Option<&DHPublicKey> {
        self.cipher_suites
            .iter()
            .position(|&suite| suite == ciphersuite)
            .map(|position| &self.init_keys[position])
    }

    pub fn supports(&self, ciphersuite: CipherSuite) -> bool {
        self.cipher_suites.contains(&ciphersuite)
    }

    pub fn verify(&self) -> bool {
        if self.cipher_suites.is_empty() || self.cipher_suites.len() != self.init_keys.len() {
            return false;
        }
        self.verify_signature(&self.identity_key, &self.signature)
    }
}

impl Signable for UserInitKey {
    fn unsigned_payload(&self) -> Result<Vec<u8>, CodecError> {
        let buffer = &mut Vec::new();
        encode_vec(VecSize::VecU8, buffer, &self.cipher_suites)?;
        encode_vec(VecSize::VecU16, buffer, &self.init_keys)?;
        self.identity_key.encode(buffer)?;
        Ok(buffer.to_vec())
    }
}

impl Codec for UserInitKey {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        buffer.append(&mut self.unsigned_payload()?);
        self.signature.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let cipher_suites = decode_vec(VecSize::VecU8, cursor)?;
        let init_keys = decode_vec(VecSize::VecU16, cursor)?;
        let identity_key = SignaturePublicKey::decode(cursor)?;
        let signature = Signature::decode(cursor)?;
        Ok(UserInitKey {
            cipher_suites,
            init_keys,
            identity_key,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::randombytes;

    #[test]
    fn generate_and_verify() {
        let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let identity = Identity::new(suite, vec![1, 2, 3]);
        let init_secret = randombytes(32);
        let init_key = UserInitKey::new(
            vec![
                CipherSuite::X25519_SHA256_AES128GCM_Ed25519,
                CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519,
            ],
            &init_secret,
            &identity,
        )
        .unwrap();
        assert!(init_key.verify());
        assert!(init_key.supports(suite));
        assert!(init_key.init_key_for(suite).is_some());

        // The published key matches a re-derivation from the init secret.
        let rederived = DHPrivateKey::derive(suite.into(), &init_secret).unwrap();
        assert_eq!(
            init_key.init_key_for(suite).unwrap(),
            &rederived.derive_public_key()
        );
    }

    #[test]
    fn tampering_is_detected() {
        let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let identity = Identity::new(suite, vec![4]);
        let mut init_key =
            UserInitKey::new(vec![suite], &randombytes(32), &identity).unwrap();

        let other = Identity::new(suite, vec![5]);
        init_key.identity_key = other.public_key();
        assert!(!init_key.verify());
    }

    #[test]
    fn mismatched_key_list_fails() {
        let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let identity = Identity::new(suite, vec![6]);
        let mut init_key =
            UserInitKey::new(vec![suite], &randombytes(32), &identity).unwrap();
        init_key.init_keys.clear();
        assert!(!init_key.verify());
    }

    #[test]
    fn codec_round_trip() {
        let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let identity = Identity::new(suite, vec![7]);
        let init_key = UserInitKey::new(vec![suite], &randombytes(32), &identity).unwrap();
        let decoded = UserInitKey::decode_detached(&init_key.encode_detached().unwrap()).unwrap();
        assert_eq!(init_key, decoded);
        assert!(decoded.verify());
    }
}
