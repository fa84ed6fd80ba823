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
use crate::crypto::signatures::*;
use crate::crypto::CipherSuite;
use crate::messages::LeafIndex;

use std::convert::TryFrom;

/// A long-term signing identity. The private half never leaves this struct;
/// the public half travels as a `Credential`.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Vec<u8>,
    pub ciphersuite: CipherSuite,
    keypair: SignatureKeypair,
}

impl Identity {
    pub fn new(ciphersuite: CipherSuite, id: Vec<u8>) -> Self {
        let keypair = SignatureKeypair::new(ciphersuite.into()).unwrap();
        Self {
            id,
            ciphersuite,
            keypair,
        }
    }
    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.keypair.sign(payload)
    }
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
        self.keypair.verify(payload, signature)
    }
    pub fn public_key(&self) -> SignaturePublicKey {
        self.keypair.get_public_key()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(u16)]
pub enum CredentialType {
    Raw = 1,
}

impl TryFrom<u16> for CredentialType {
    type Error = &'static str;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CredentialType::Raw),
            _ => Err("Undefined CredentialType"),
        }
    }
}

impl Codec for CredentialType {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        (*self as u16).encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        CredentialType::try_from(u16::decode(cursor)?).map_err(|_| CodecError::DecodingError)
    }
}

/// A member's public signing identity as carried in the roster and at
/// occupied tree leaves.
#[derive(Debug, PartialEq, Clone)]
pub enum Credential {
    Raw(RawKeyCredential),
}

impl Credential {
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
        match self {
            Credential::Raw(raw) => raw.public_key.verify(payload, signature),
        }
    }
    pub fn public_key(&self) -> &SignaturePublicKey {
        match self {
            Credential::Raw(raw) => &raw.public_key,
        }
    }
}

impl Codec for Credential {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Credential::Raw(raw) => {
                CredentialType::Raw.encode(buffer)?;
                raw.encode(buffer)?;
            }
        }
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        match CredentialType::decode(cursor)? {
            CredentialType::Raw => Ok(Credential::Raw(RawKeyCredential::decode(cursor)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawKeyCredential {
    pub public_key: SignaturePublicKey,
}

impl From<&Identity> for RawKeyCredential {
    fn from(identity: &Identity) -> Self {
        RawKeyCredential {
            public_key: identity.public_key(),
        }
    }
}

impl From<SignaturePublicKey> for RawKeyCredential {
    fn from(public_key: SignaturePublicKey) -> Self {
        RawKeyCredential { public_key }
    }
}

impl Codec for RawKeyCredential {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.public_key.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let public_key = SignaturePublicKey::decode(cursor)?;
        Ok(RawKeyCredential { public_key })
    }
}

/// Ordered mapping from leaf index to member credential. Append-only, except
/// that Remove records the remover's credential over the removed slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Roster {
    credentials: Vec<Credential>,
}

impl Roster {
    pub fn new() -> Self {
        Roster {
            credentials: vec![],
        }
    }
    pub fn add(&mut self, credential: Credential) {
        self.credentials.push(credential);
    }
    pub fn get(&self, index: LeafIndex) -> Option<&Credential> {
        self.credentials.get(index.as_usize())
    }
    pub fn copy(&mut self, dst: LeafIndex, src: LeafIndex) {
        let credential = self.credentials[src.as_usize()].clone();
        self.credentials[dst.as_usize()] = credential;
    }
    pub fn len(&self) -> usize {
        self.credentials.len()
    }
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
    pub fn truncate(&mut self, length: usize) {
        self.credentials.truncate(length);
    }
}

impl Codec for Roster {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU24, buffer, &self.credentials)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let credentials = decode_vec(VecSize::VecU24, cursor)?;
        Ok(Roster { credentials })
    }
}

#[test]
fn test_credential_verify() {
    let identity = Identity::new(CipherSuite::X25519_SHA256_AES128GCM_Ed25519, vec![1, 2, 3]);
    let credential = Credential::Raw(RawKeyCredential::from(&identity));
    let payload = b"signed payload";
    let signature = identity.sign(payload);
    assert!(credential.verify(payload, &signature));
    assert!(!credential.verify(b"other payload", &signature));
}

#[test]
fn test_roster_copy() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
    let alice = Identity::new(suite, vec![b'a']);
    let bob = Identity::new(suite, vec![b'b']);
    let mut roster = Roster::new();
    roster.add(Credential::Raw(RawKeyCredential::from(&alice)));
    roster.add(Credential::Raw(RawKeyCredential::from(&bob)));

    roster.copy(LeafIndex::from(1u32), LeafIndex::from(0u32));
    assert_eq!(
        roster.get(LeafIndex::from(1u32)),
        roster.get(LeafIndex::from(0u32))
    );
    assert_eq!(roster.len(), 2);
}

#[test]
fn test_roster_codec() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
    let mut roster = Roster::new();
    roster.add(Credential::Raw(RawKeyCredential::from(&Identity::new(
        suite,
        vec![b'a'],
    ))));
    let decoded = Roster::decode_detached(&roster.encode_detached().unwrap()).unwrap();
    assert_eq!(roster, decoded);
}
