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

//! Single-shot base-mode HPKE: ephemeral encap against the recipient's DH
//! key, labeled HKDF key schedule, AEAD seal. Used to carry path secrets
//! between tree members.

use crate::codec::*;
use crate::crypto::aead::*;
use crate::crypto::dh::*;
use crate::crypto::hkdf;
use crate::crypto::hmac::{hash_length, HMACAlgorithm};
use crate::crypto::CipherSuite;
use crate::utils::zero;

#[derive(Debug)]
pub enum HPKEError {
    DecryptionError,
    AEAD(AEADError),
    Codec(CodecError),
    DH(DHError),
}

impl From<AEADError> for HPKEError {
    fn from(err: AEADError) -> HPKEError {
        HPKEError::AEAD(err)
    }
}

impl From<CodecError> for HPKEError {
    fn from(err: CodecError) -> HPKEError {
        HPKEError::Codec(err)
    }
}

impl From<DHError> for HPKEError {
    fn from(err: DHError) -> HPKEError {
        HPKEError::DH(err)
    }
}

pub type HPKEPublicKey = DHPublicKey;
pub type HPKEPrivateKey = DHPrivateKey;
pub type HPKEKeyPair = DHKeyPair;

const MODE_BASE: u8 = 0;

#[derive(Debug, PartialEq, Clone)]
pub struct HpkeCiphertext {
    pub kem_output: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Codec for HpkeCiphertext {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU16, buffer, &self.kem_output)?;
        encode_vec(VecSize::VecU16, buffer, &self.ciphertext)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let kem_output = decode_vec(VecSize::VecU16, cursor)?;
        let ciphertext = decode_vec(VecSize::VecU16, cursor)?;
        Ok(HpkeCiphertext {
            kem_output,
            ciphertext,
        })
    }
}

impl HpkeCiphertext {
    pub fn seal(
        ciphersuite: CipherSuite,
        public_key: &DHPublicKey,
        payload: &[u8],
        aad: Option<&[u8]>,
        info: Option<&[u8]>,
    ) -> Result<HpkeCiphertext, HPKEError> {
        let (zz, kem_output) = encap(ciphersuite, public_key)?;
        let (key, nonce) = key_schedule(ciphersuite, &zz, info.unwrap_or(&[]))?;
        let ciphertext = aead_seal(
            ciphersuite.into(),
            payload,
            aad.unwrap_or(&[]),
            &key,
            &nonce,
        )?;
        Ok(HpkeCiphertext {
            kem_output,
            ciphertext,
        })
    }

    pub fn open(
        &self,
        ciphersuite: CipherSuite,
        private_key: &DHPrivateKey,
        aad: Option<&[u8]>,
        info: Option<&[u8]>,
    ) -> Result<Vec<u8>, HPKEError> {
        let zz = decap(ciphersuite, &self.kem_output, private_key)?;
        let (key, nonce) = key_schedule(ciphersuite, &zz, info.unwrap_or(&[]))?;
        aead_open(
            ciphersuite.into(),
            &self.ciphertext,
            aad.unwrap_or(&[]),
            &key,
            &nonce,
        )
        .map_err(|_| HPKEError::DecryptionError)
    }
}

fn encap(ciphersuite: CipherSuite, pkr: &DHPublicKey) -> Result<(Vec<u8>, Vec<u8>), DHError> {
    let keypair = DHKeyPair::new(ciphersuite.into())?;
    encap_with_keypair(ciphersuite, pkr, &keypair.private_key, &keypair.public_key)
}

fn encap_with_keypair(
    ciphersuite: CipherSuite,
    pkr: &DHPublicKey,
    ske: &DHPrivateKey,
    pke: &DHPublicKey,
) -> Result<(Vec<u8>, Vec<u8>), DHError> {
    let dh = ske.shared_secret(pkr)?;
    let enc = pke.as_slice();
    let kem_context = concat(&[enc.clone(), pkr.as_slice()]);
    let zz = extract_and_expand(ciphersuite, &dh, &kem_context);
    Ok((zz, enc))
}

fn decap(
    ciphersuite: CipherSuite,
    enc: &[u8],
    skr: &DHPrivateKey,
) -> Result<Vec<u8>, DHError> {
    let pke = DHPublicKey::from_slice(enc, ciphersuite.into())?;
    let dh = skr.shared_secret(&pke)?;
    let pkrm = skr.derive_public_key().as_slice();
    let kem_context = concat(&[enc.to_vec(), pkrm]);
    Ok(extract_and_expand(ciphersuite, &dh, &kem_context))
}

fn extract_and_expand(ciphersuite: CipherSuite, dh: &[u8], kem_context: &[u8]) -> Vec<u8> {
    let nh = hash_length(HMACAlgorithm::from(ciphersuite));
    let prk = labeled_extract(ciphersuite, &zero(nh), b"dh", dh);
    labeled_expand(
        ciphersuite,
        &prk,
        b"prk",
        kem_context,
        shared_secret_length(ciphersuite.into()),
    )
}

fn key_schedule(
    ciphersuite: CipherSuite,
    zz: &[u8],
    info: &[u8],
) -> Result<(AEADKey, Nonce), HPKEError> {
    let nh = hash_length(HMACAlgorithm::from(ciphersuite));
    let info_hash = labeled_extract(ciphersuite, &zero(nh), b"info", info);
    let context = concat(&[vec![MODE_BASE], info_hash]);

    let secret = labeled_extract(ciphersuite, &zero(nh), b"zz", zz);
    let key_bytes = labeled_expand(
        ciphersuite,
        &secret,
        b"key",
        &context,
        AEADKey::key_length(ciphersuite.into())?,
    );
    let nonce_bytes = labeled_expand(ciphersuite, &secret, b"nonce", &context, NONCEBYTES);

    let key = AEADKey::from_slice(ciphersuite.into(), &key_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes)?;
    Ok((key, nonce))
}

fn labeled_extract(ciphersuite: CipherSuite, salt: &[u8], label: &[u8], ikm: &[u8]) -> Vec<u8> {
    let labeled_ikm = concat(&[b"RFCXXXX ".to_vec(), label.to_vec(), ikm.to_vec()]);
    hkdf::extract(ciphersuite.into(), salt, &labeled_ikm)
}

fn labeled_expand(
    ciphersuite: CipherSuite,
    prk: &[u8],
    label: &[u8],
    info: &[u8],
    length: usize,
) -> Vec<u8> {
    let labeled_info = concat(&[
        (length as u16).encode_detached().unwrap(),
        b"RFCXXXX ".to_vec(),
        label.to_vec(),
        info.to_vec(),
    ]);
    hkdf::expand(ciphersuite.into(), prk, &labeled_info, length).unwrap()
}

fn concat(values: &[Vec<u8>]) -> Vec<u8> {
    values.join(&[][..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encap_decap() {
        let ciphersuite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let keypair = DHKeyPair::new(ciphersuite.into()).unwrap();
        let (zz1, enc) = encap(ciphersuite, &keypair.public_key).unwrap();
        let zz2 = decap(ciphersuite, &enc, &keypair.private_key).unwrap();
        assert_eq!(zz1, zz2);
    }

    #[test]
    fn seal_open_aes() {
        seal_open(CipherSuite::X25519_SHA256_AES128GCM_Ed25519);
    }

    #[test]
    fn seal_open_chacha() {
        seal_open(CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519);
    }

    fn seal_open(ciphersuite: CipherSuite) {
        let keypair = DHKeyPair::new(ciphersuite.into()).unwrap();
        let cleartext = vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let aad = b"path level 0";

        let sealed = HpkeCiphertext::seal(
            ciphersuite,
            &keypair.public_key,
            &cleartext,
            Some(aad),
            None,
        )
        .unwrap();
        let opened = sealed
            .open(ciphersuite, &keypair.private_key, Some(aad), None)
            .unwrap();
        assert_eq!(cleartext, opened);

        // Wrong recipient key and wrong AAD both fail.
        let other = DHKeyPair::new(ciphersuite.into()).unwrap();
        assert!(sealed
            .open(ciphersuite, &other.private_key, Some(aad), None)
            .is_err());
        assert!(sealed
            .open(ciphersuite, &keypair.private_key, Some(b"path level 1"), None)
            .is_err());
    }

    #[test]
    fn codec_round_trip() {
        let ciphersuite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
        let keypair = DHKeyPair::new(ciphersuite.into()).unwrap();
        let sealed =
            HpkeCiphertext::seal(ciphersuite, &keypair.public_key, b"secret", None, None).unwrap();
        let decoded = HpkeCiphertext::decode_detached(&sealed.encode_detached().unwrap()).unwrap();
        assert_eq!(sealed, decoded);
    }
}
