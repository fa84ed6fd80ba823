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

//! The group state machine. A `State` is one member's view of the group at
//! one epoch; `handle` produces the successor state and never mutates the
//! receiver, so a failed handshake leaves the caller exactly where it was.

use crate::codec::*;
use crate::creds::*;
use crate::crypto::dh::DHPrivateKey;
use crate::crypto::hash::{hash, HashAlgorithm};
use crate::crypto::hkdf;
use crate::crypto::CipherSuite;
use crate::messages::*;
use crate::schedule::derive_secret;
use crate::tree::*;
use crate::uik::*;
use crate::utils::*;
use log::debug;

const LEAF_SECRET_BYTES: usize = 32;

#[derive(Debug, PartialEq)]
pub enum GroupError {
    InvalidParameter(&'static str),
    Protocol(&'static str),
    Crypto(&'static str),
    Codec(CodecError),
}

impl From<CodecError> for GroupError {
    fn from(err: CodecError) -> GroupError {
        GroupError::Codec(err)
    }
}

impl From<TreeError> for GroupError {
    fn from(err: TreeError) -> GroupError {
        match err {
            TreeError::IndexOutOfBounds => GroupError::InvalidParameter("leaf index out of bounds"),
            TreeError::LeafOccupied => GroupError::InvalidParameter("leaf already occupied"),
            TreeError::MalformedDirectPath => GroupError::Protocol("malformed direct path"),
            TreeError::EncryptionFailure => GroupError::Crypto("path encryption failed"),
            TreeError::DecryptionFailure => GroupError::Crypto("path decryption failed"),
            TreeError::PublicKeyMismatch => {
                GroupError::Protocol("re-derived public key does not match direct path")
            }
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct GroupId {
    pub value: Vec<u8>,
}

impl GroupId {
    pub fn random() -> Self {
        Self {
            value: randombytes(16),
        }
    }
    pub fn from_bytes(bytes: &[u8]) -> Self {
        GroupId {
            value: bytes.to_vec(),
        }
    }
}

impl Codec for GroupId {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU8, buffer, &self.value)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let value = decode_vec(VecSize::VecU8, cursor)?;
        Ok(GroupId { value })
    }
}

#[derive(Debug, Clone)]
pub struct State {
    ciphersuite: CipherSuite,
    group_id: GroupId,
    epoch: u32,
    index: LeafIndex,
    identity: Identity,
    roster: Roster,
    tree: RatchetTree,
    transcript: Vec<GroupOperation>,
    init_secret: Vec<u8>,
    message_master_secret: Vec<u8>,
    cached_leaf_secret: Option<Vec<u8>>,
}

/// Two members agree on the group exactly when the public state and the
/// chained secrets agree; private tree knowledge is allowed to differ.
impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch
            && self.group_id == other.group_id
            && self.roster == other.roster
            && self.tree == other.tree
            && self.message_master_secret == other.message_master_secret
            && self.init_secret == other.init_secret
    }
}

impl State {
    /// Founds a group with the caller as its only member at leaf 0.
    pub fn new_group(
        group_id: GroupId,
        ciphersuite: CipherSuite,
        identity: Identity,
    ) -> Result<State, GroupError> {
        let credential = Credential::Raw(RawKeyCredential::from(&identity));
        let leaf_secret = randombytes(LEAF_SECRET_BYTES);
        let tree = RatchetTree::new(ciphersuite, &leaf_secret, credential.clone())?;
        let mut roster = Roster::new();
        roster.add(credential);
        Ok(State {
            ciphersuite,
            group_id,
            epoch: 0,
            index: LeafIndex::from(0u32),
            identity,
            roster,
            tree,
            transcript: vec![],
            init_secret: zero(32),
            message_master_secret: vec![],
            cached_leaf_secret: None,
        })
    }

    /// Founds a group around an invitee's published init key: picks the
    /// first cipher suite both sides support, adds the invitee, and returns
    /// the founder's post-add state together with the invitee's Welcome and
    /// the Add handshake.
    pub fn negotiate(
        group_id: GroupId,
        supported_ciphersuites: &[CipherSuite],
        identity: Identity,
        user_init_key: &UserInitKey,
    ) -> Result<(State, Welcome, Handshake), GroupError> {
        let mut selected = None;
        for &mine in supported_ciphersuites {
            if user_init_key.supports(mine) {
                selected = Some(mine);
                break;
            }
        }
        let ciphersuite = selected.ok_or(GroupError::Protocol("no common cipher suite"))?;

        let mut state = State::new_group(group_id, ciphersuite, identity)?;
        let (welcome, handshake) = state.add(user_init_key)?;
        state = state.handle(&handshake)?;
        Ok((state, welcome, handshake))
    }

    /// Proposes adding the holder of `user_init_key` at the next free leaf.
    /// The Welcome snapshots the pre-add state; the Handshake carries the
    /// encrypted path for current members.
    pub fn add(&self, user_init_key: &UserInitKey) -> Result<(Welcome, Handshake), GroupError> {
        if !user_init_key.verify() {
            return Err(GroupError::Protocol("bad signature on user init key"));
        }
        let init_pub = user_init_key
            .init_key_for(self.ciphersuite)
            .ok_or(GroupError::Protocol(
                "new member does not support the group's cipher suite",
            ))?
            .clone();

        let index = LeafIndex::from(self.tree.leaf_span().as_u32());
        let credential = Credential::Raw(RawKeyCredential::from(
            user_init_key.identity_key.clone(),
        ));
        let leaf_secret = randombytes(LEAF_SECRET_BYTES);

        // The path is computed against the grown tree the group will have
        // once the add is applied.
        let mut grown = self.tree.clone();
        grown.add_leaf(index, init_pub, credential)?;
        let path = grown.encrypt(index, &leaf_secret, &self.path_context())?;

        let welcome = Welcome {
            group_id: self.group_id.value.clone(),
            epoch: self.epoch,
            cipher_suite: self.ciphersuite,
            roster: self.roster.clone(),
            tree: self.tree.clone(),
            transcript: self.transcript.clone(),
            init_secret: self.init_secret.clone(),
            leaf_secret,
        };
        let handshake = self.sign(GroupOperation::Add(Add {
            path,
            init_key: user_init_key.clone(),
        }))?;
        Ok((welcome, handshake))
    }

    /// Rotates the caller's own leaf secret. The secret is cached so the
    /// caller can apply its own handshake without decrypting it.
    pub fn update(&mut self, leaf_secret: &[u8]) -> Result<Handshake, GroupError> {
        let path = self
            .tree
            .encrypt(self.index, leaf_secret, &self.path_context())?;
        self.cached_leaf_secret = Some(leaf_secret.to_vec());
        self.sign(GroupOperation::Update(Update { path }))
    }

    /// Evicts the member at `removed` by injecting a fresh path toward its
    /// leaf. The target leaf is blanked before the path is computed, so the
    /// ciphertexts are addressed to the remaining members only.
    pub fn remove(&self, removed: LeafIndex) -> Result<Handshake, GroupError> {
        if removed.as_u32() >= self.tree.leaf_span().as_u32() {
            return Err(GroupError::InvalidParameter("removed index out of bounds"));
        }
        if !self.tree.occupied(removed) {
            return Err(GroupError::InvalidParameter("removed leaf is already blank"));
        }
        let evict_secret = randombytes(LEAF_SECRET_BYTES);
        let mut blanked = self.tree.clone();
        blanked.blank_leaf(removed);
        let path = blanked.encrypt(removed, &evict_secret, &self.path_context())?;
        self.sign(GroupOperation::Remove(Remove { removed, path }))
    }

    /// Applies a handshake and returns the successor state. The receiver is
    /// left untouched; on any error the successor is discarded.
    pub fn handle(&self, handshake: &Handshake) -> Result<State, GroupError> {
        if handshake.prior_epoch != self.epoch {
            return Err(GroupError::InvalidParameter("epoch mismatch"));
        }
        if handshake.signer_index.as_usize() >= self.roster.len() {
            return Err(GroupError::InvalidParameter("signer index out of bounds"));
        }

        let next = self.apply(handshake.signer_index, &handshake.operation)?;

        let credential = next
            .roster
            .get(handshake.signer_index)
            .ok_or(GroupError::InvalidParameter("signer index out of bounds"))?;
        let tbs = next.group_state()?;
        if !credential.verify(&tbs, &handshake.signature) {
            debug!(
                "rejecting {:?} handshake at epoch {}: bad signature",
                handshake.operation.get_type(),
                self.epoch
            );
            return Err(GroupError::Crypto("handshake signature verification failed"));
        }
        Ok(next)
    }

    /// The receiver-of-Add constructor: assembles the state a Welcome and
    /// its Add handshake describe, with the caller at the new leaf.
    pub fn join(
        identity: Identity,
        init_secret: &[u8],
        welcome: &Welcome,
        handshake: &Handshake,
    ) -> Result<State, GroupError> {
        let add = match &handshake.operation {
            GroupOperation::Add(add) => add,
            _ => return Err(GroupError::InvalidParameter("handshake does not carry an add")),
        };
        if add.init_key.identity_key != identity.public_key() {
            return Err(GroupError::InvalidParameter(
                "add not addressed to this identity",
            ));
        }

        // The init key the adder picked for the group's suite must be the
        // one our init secret generates.
        let ciphersuite = welcome.cipher_suite;
        let init_pub = add
            .init_key
            .init_key_for(ciphersuite)
            .ok_or(GroupError::Protocol("selected cipher suite not supported"))?;
        let init_priv = DHPrivateKey::derive(ciphersuite.into(), init_secret)
            .map_err(|_| GroupError::Crypto("init key derivation failed"))?;
        if init_pub != &init_priv.derive_public_key() {
            return Err(GroupError::Protocol("incorrect init key"));
        }

        let index = LeafIndex::from(welcome.tree.leaf_span().as_u32());
        let credential = Credential::Raw(RawKeyCredential::from(
            add.init_key.identity_key.clone(),
        ));
        let mut state = State {
            ciphersuite,
            group_id: GroupId::from_bytes(&welcome.group_id),
            epoch: welcome.epoch + 1,
            index,
            identity,
            roster: welcome.roster.clone(),
            tree: welcome.tree.clone(),
            transcript: welcome.transcript.clone(),
            init_secret: welcome.init_secret.clone(),
            message_master_secret: vec![],
            cached_leaf_secret: None,
        };
        state.roster.add(credential.clone());
        state.tree.add_leaf(index, init_pub.clone(), credential)?;
        state.tree.set_path(index, &welcome.leaf_secret)?;
        state.transcript.push(handshake.operation.clone());

        let update_secret = state.tree.root_secret();
        state.derive_epoch_keys(&update_secret)?;

        let signer_credential = state
            .roster
            .get(handshake.signer_index)
            .ok_or(GroupError::InvalidParameter("signer index out of bounds"))?;
        let tbs = state.group_state()?;
        if !signer_credential.verify(&tbs, &handshake.signature) {
            return Err(GroupError::Crypto("handshake signature verification failed"));
        }
        debug!("joined group at epoch {} as leaf {}", state.epoch, index.as_u32());
        Ok(state)
    }

    pub fn ciphersuite(&self) -> CipherSuite {
        self.ciphersuite
    }
    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }
    pub fn epoch(&self) -> u32 {
        self.epoch
    }
    pub fn index(&self) -> LeafIndex {
        self.index
    }
    pub fn roster(&self) -> &Roster {
        &self.roster
    }
    pub fn tree(&self) -> &RatchetTree {
        &self.tree
    }
    pub fn message_master_secret(&self) -> &[u8] {
        &self.message_master_secret
    }

    /// The signed and transcripted view of the state:
    /// `group_id || epoch || roster || tree || transcript`.
    pub fn group_state(&self) -> Result<Vec<u8>, CodecError> {
        let buffer = &mut Vec::new();
        encode_vec(VecSize::VecU8, buffer, &self.group_id.value)?;
        self.epoch.encode(buffer)?;
        self.roster.encode(buffer)?;
        self.tree.encode(buffer)?;
        encode_vec(VecSize::VecU24, buffer, &self.transcript)?;
        Ok(buffer.to_vec())
    }

    fn sign(&self, operation: GroupOperation) -> Result<Handshake, GroupError> {
        let next = self.apply(self.index, &operation)?;
        let tbs = next.group_state()?;
        let signature = self.identity.sign(&tbs);
        Ok(Handshake {
            prior_epoch: self.epoch,
            operation,
            signer_index: self.index,
            signature,
        })
    }

    fn apply(&self, signer: LeafIndex, operation: &GroupOperation) -> Result<State, GroupError> {
        // Path ciphertexts were sealed under the sender's pre-apply context.
        let context = self.path_context();
        let mut next = self.clone();
        next.epoch = self.epoch + 1;

        let update_secret = match operation {
            GroupOperation::Add(add) => next.apply_add(add, &context)?,
            GroupOperation::Update(update) => next.apply_update(signer, update, &context)?,
            GroupOperation::Remove(remove) => next.apply_remove(signer, remove, &context)?,
        };

        next.transcript.push(operation.clone());
        next.derive_epoch_keys(&update_secret)?;
        debug!(
            "epoch {} -> {} via {:?}",
            self.epoch,
            next.epoch,
            operation.get_type()
        );
        Ok(next)
    }

    fn apply_add(&mut self, add: &Add, context: &[u8]) -> Result<Vec<u8>, GroupError> {
        if !add.init_key.verify() {
            return Err(GroupError::Protocol("bad signature on user init key"));
        }
        let init_pub = add
            .init_key
            .init_key_for(self.ciphersuite)
            .ok_or(GroupError::Protocol(
                "new member does not support the group's cipher suite",
            ))?
            .clone();
        let credential = Credential::Raw(RawKeyCredential::from(
            add.init_key.identity_key.clone(),
        ));

        let index = LeafIndex::from(self.tree.leaf_span().as_u32());
        self.tree.add_leaf(index, init_pub, credential.clone())?;
        let info = self.tree.decrypt(index, &add.path, context)?;
        self.tree.merge_path(index, info)?;
        self.roster.add(credential);
        Ok(self.tree.root_secret())
    }

    fn apply_update(
        &mut self,
        signer: LeafIndex,
        update: &Update,
        context: &[u8],
    ) -> Result<Vec<u8>, GroupError> {
        if signer == self.index {
            let leaf_secret = self
                .cached_leaf_secret
                .take()
                .ok_or(GroupError::InvalidParameter(
                    "self-update without a cached leaf secret",
                ))?;
            self.tree.set_path(signer, &leaf_secret)?;
        } else {
            let info = self.tree.decrypt(signer, &update.path, context)?;
            self.tree.merge_path(signer, info)?;
        }
        Ok(self.tree.root_secret())
    }

    fn apply_remove(
        &mut self,
        signer: LeafIndex,
        remove: &Remove,
        context: &[u8],
    ) -> Result<Vec<u8>, GroupError> {
        if remove.removed.as_u32() >= self.tree.leaf_span().as_u32() {
            return Err(GroupError::InvalidParameter("removed index out of bounds"));
        }
        if !self.tree.occupied(remove.removed) {
            return Err(GroupError::InvalidParameter("removed leaf is already blank"));
        }

        let info = self.tree.decrypt(remove.removed, &remove.path, context)?;
        self.tree.merge_path(remove.removed, info)?;
        let update_secret = self.tree.root_secret();

        // The evicted slot goes blank; the roster keeps a record of who
        // expelled whom.
        self.tree.blank_leaf(remove.removed);
        self.roster.copy(remove.removed, signer);
        Ok(update_secret)
    }

    fn derive_epoch_keys(&mut self, update_secret: &[u8]) -> Result<(), GroupError> {
        let epoch_secret = hkdf::extract(self.ciphersuite.into(), &self.init_secret, update_secret);
        let state_hash = hash(HashAlgorithm::from(self.ciphersuite), &self.group_state()?);
        self.message_master_secret =
            derive_secret(self.ciphersuite, &epoch_secret, "msg", &state_hash);
        self.init_secret = derive_secret(self.ciphersuite, &epoch_secret, "init", &state_hash);
        Ok(())
    }

    /// AAD prefix for path-secret encryption: `group_id || epoch`. The
    /// level index is appended per ciphertext by the tree.
    fn path_context(&self) -> Vec<u8> {
        let buffer = &mut Vec::new();
        encode_vec(VecSize::VecU8, buffer, &self.group_id.value).unwrap();
        self.epoch.encode(buffer).unwrap();
        buffer.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;

    #[test]
    fn new_group_starts_at_epoch_zero() {
        let identity = Identity::new(SUITE, b"alice".to_vec());
        let state = State::new_group(GroupId::from_bytes(&[0x00]), SUITE, identity).unwrap();
        assert_eq!(state.epoch(), 0);
        assert_eq!(state.index(), LeafIndex::from(0u32));
        assert_eq!(state.roster().len(), 1);
        assert_eq!(state.tree().leaf_span().as_u32(), 1);
    }

    #[test]
    fn negotiate_picks_common_suite() {
        let alice = Identity::new(SUITE, b"alice".to_vec());
        let bob = Identity::new(SUITE, b"bob".to_vec());
        let init_secret = randombytes(32);
        let uik = UserInitKey::new(
            vec![CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519, SUITE],
            &init_secret,
            &bob,
        )
        .unwrap();

        let (state, welcome, handshake) = State::negotiate(
            GroupId::from_bytes(&[0x00]),
            &[SUITE],
            alice,
            &uik,
        )
        .unwrap();
        assert_eq!(state.ciphersuite(), SUITE);
        assert_eq!(state.epoch(), 1);

        let joined = State::join(bob, &init_secret, &welcome, &handshake).unwrap();
        assert_eq!(state, joined);
    }

    #[test]
    fn negotiate_rejects_disjoint_suites() {
        let alice = Identity::new(SUITE, b"alice".to_vec());
        let bob = Identity::new(SUITE, b"bob".to_vec());
        let uik = UserInitKey::new(
            vec![CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519],
            &randombytes(32),
            &bob,
        )
        .unwrap();

        let result = State::negotiate(GroupId::from_bytes(&[0x00]), &[SUITE], alice, &uik);
        assert_eq!(result.unwrap_err(), GroupError::Protocol("no common cipher suite"));
    }
}
