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

//! The ratchet tree: a left-balanced binary tree of DH key pairs whose root
//! secret is the group's shared secret. A member holds private keys exactly
//! on the nodes of its own direct path; everything else is public keys.

use crate::codec::*;
use crate::creds::*;
use crate::crypto::dh::*;
use crate::crypto::hash::{hash, hash_length, HashAlgorithm};
use crate::crypto::hpke::*;
use crate::crypto::CipherSuite;
use crate::messages::{LeafCount, LeafIndex, NodeIndex};
use crate::schedule::hkdf_expand_label;
use crate::treemath;
use log::trace;

#[derive(Debug, PartialEq)]
pub enum TreeError {
    IndexOutOfBounds,
    LeafOccupied,
    MalformedDirectPath,
    EncryptionFailure,
    DecryptionFailure,
    PublicKeyMismatch,
}

/// One slot of the tree. Equality covers the public parts only, so trees
/// held by different members compare equal even though each member knows a
/// different set of private keys.
#[derive(Debug, Clone)]
pub struct RatchetTreeNode {
    path_secret: Option<Vec<u8>>,
    private_key: Option<DHPrivateKey>,
    public_key: DHPublicKey,
    credential: Option<Credential>,
}

impl RatchetTreeNode {
    pub fn from_public_key(public_key: DHPublicKey) -> Self {
        RatchetTreeNode {
            path_secret: None,
            private_key: None,
            public_key,
            credential: None,
        }
    }
    pub fn from_private_key(path_secret: Option<Vec<u8>>, private_key: DHPrivateKey) -> Self {
        let public_key = private_key.derive_public_key();
        RatchetTreeNode {
            path_secret,
            private_key: Some(private_key),
            public_key,
            credential: None,
        }
    }
    pub fn public_key(&self) -> &DHPublicKey {
        &self.public_key
    }
    pub fn private_key(&self) -> Option<&DHPrivateKey> {
        self.private_key.as_ref()
    }
    pub fn secret(&self) -> Option<&[u8]> {
        self.path_secret.as_deref()
    }
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }
    /// Absorbs `other` into this slot. A changed public key invalidates any
    /// held private material; the credential stays with the slot.
    pub fn merge(&mut self, other: RatchetTreeNode) {
        if self.public_key != other.public_key {
            self.path_secret = None;
            self.private_key = None;
        }
        self.public_key = other.public_key;
        if other.private_key.is_some() {
            self.private_key = other.private_key;
            self.path_secret = other.path_secret;
        }
        if other.credential.is_some() {
            self.credential = other.credential;
        }
    }
}

impl PartialEq for RatchetTreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.credential == other.credential
    }
}

impl Codec for RatchetTreeNode {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.public_key.encode(buffer)?;
        self.credential.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let public_key = DHPublicKey::decode(cursor)?;
        let credential = Option::<Credential>::decode(cursor)?;
        Ok(RatchetTreeNode {
            path_secret: None,
            private_key: None,
            public_key,
            credential,
        })
    }
}

/// The outcome of decrypting a `DirectPath`: public keys for the levels
/// below the first recoverable one, recovered path secrets from there up.
#[derive(Debug, PartialEq)]
pub struct MergeInfo {
    pub public_keys: Vec<DHPublicKey>,
    pub secrets: Vec<Vec<u8>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct DirectPathNode {
    pub public_key: DHPublicKey,
    pub encrypted_path_secret: Vec<HpkeCiphertext>,
}

impl Codec for DirectPathNode {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.public_key.encode(buffer)?;
        encode_vec(VecSize::VecU16, buffer, &self.encrypted_path_secret)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let public_key = DHPublicKey::decode(cursor)?;
        let encrypted_path_secret = decode_vec(VecSize::VecU16, cursor)?;
        Ok(DirectPathNode {
            public_key,
            encrypted_path_secret,
        })
    }
}

/// One entry per node on the sender's path, leaf first. The leaf entry
/// carries the new leaf public key only; each level above carries the new
/// public key plus the level's path secret sealed to the resolution of the
/// copath node.
#[derive(Debug, PartialEq, Clone)]
pub struct DirectPath {
    pub nodes: Vec<DirectPathNode>,
}

impl Codec for DirectPath {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU16, buffer, &self.nodes)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let nodes = decode_vec(VecSize::VecU16, cursor)?;
        Ok(DirectPath { nodes })
    }
}

#[derive(Debug, Clone)]
pub struct RatchetTree {
    ciphersuite: CipherSuite,
    nodes: Vec<Option<RatchetTreeNode>>,
}

impl RatchetTree {
    pub fn new(
        ciphersuite: CipherSuite,
        leaf_secret: &[u8],
        credential: Credential,
    ) -> Result<RatchetTree, TreeError> {
        let mut leaf = Self::leaf_from_secret(ciphersuite, leaf_secret)?;
        leaf.set_credential(credential);
        Ok(RatchetTree {
            ciphersuite,
            nodes: vec![Some(leaf)],
        })
    }

    /// Reassembles a tree from its wire form. All nodes are public-only; the
    /// caller installs its own private path afterwards.
    pub fn new_from_nodes(
        ciphersuite: CipherSuite,
        nodes: Vec<Option<RatchetTreeNode>>,
    ) -> RatchetTree {
        RatchetTree { ciphersuite, nodes }
    }

    pub fn decode_with_suite(
        ciphersuite: CipherSuite,
        cursor: &mut Cursor,
    ) -> Result<RatchetTree, CodecError> {
        let nodes = decode_vec(VecSize::VecU24, cursor)?;
        Ok(RatchetTree::new_from_nodes(ciphersuite, nodes))
    }

    /// Builds a fully private tree by repeated add. Bootstrap and tests
    /// only: a real member never knows more than one leaf secret.
    pub fn new_from_secrets(
        ciphersuite: CipherSuite,
        secrets: &[Vec<u8>],
        credentials: &[Credential],
    ) -> Result<RatchetTree, TreeError> {
        if secrets.is_empty() || secrets.len() != credentials.len() {
            return Err(TreeError::IndexOutOfBounds);
        }
        let mut tree = RatchetTree::new(ciphersuite, &secrets[0], credentials[0].clone())?;
        for i in 1..secrets.len() {
            let index = LeafIndex::from(i);
            let leaf = Self::leaf_from_secret(ciphersuite, &secrets[i])?;
            tree.add_leaf(index, leaf.public_key().clone(), credentials[i].clone())?;
            tree.set_path(index, &secrets[i])?;
        }
        Ok(tree)
    }

    fn leaf_from_secret(
        ciphersuite: CipherSuite,
        leaf_secret: &[u8],
    ) -> Result<RatchetTreeNode, TreeError> {
        let private_key = DHPrivateKey::derive(ciphersuite.into(), leaf_secret)
            .map_err(|_| TreeError::EncryptionFailure)?;
        Ok(RatchetTreeNode::from_private_key(
            Some(leaf_secret.to_vec()),
            private_key,
        ))
    }

    pub fn ciphersuite(&self) -> CipherSuite {
        self.ciphersuite
    }

    pub fn node_size(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_span(&self) -> LeafCount {
        if self.nodes.is_empty() {
            LeafCount::from(0u32)
        } else {
            LeafCount::from((self.nodes.len() + 1) / 2)
        }
    }

    pub fn occupied(&self, index: LeafIndex) -> bool {
        let node_index = NodeIndex::from(index).as_usize();
        node_index < self.nodes.len() && self.nodes[node_index].is_some()
    }

    pub fn get_credential(&self, index: LeafIndex) -> Option<&Credential> {
        let node_index = NodeIndex::from(index).as_usize();
        self.nodes
            .get(node_index)
            .and_then(|node| node.as_ref())
            .and_then(|node| node.credential())
    }

    /// The minimal set of non-blank nodes whose subtrees tile `index`'s
    /// subtree. A blank parent descends into its children; a blank leaf
    /// resolves to nothing.
    fn resolve(&self, index: NodeIndex) -> Vec<NodeIndex> {
        if self.nodes[index.as_usize()].is_some() {
            return vec![index];
        }
        if treemath::level(index) == 0 {
            return vec![];
        }
        let mut left = self.resolve(treemath::left(index));
        let right = self.resolve(treemath::right(index, self.leaf_span()));
        left.extend(right);
        left
    }

    fn merge_node(&mut self, index: NodeIndex, node: RatchetTreeNode) {
        match &mut self.nodes[index.as_usize()] {
            Some(existing) => existing.merge(node),
            slot => *slot = Some(node),
        }
    }

    fn path_step(&self, path_secret: &[u8]) -> Vec<u8> {
        let length = hash_length(HashAlgorithm::from(self.ciphersuite));
        hkdf_expand_label(self.ciphersuite, path_secret, "path", &[], length)
    }

    fn node_step(&self, path_secret: &[u8]) -> Vec<u8> {
        let length = hash_length(HashAlgorithm::from(self.ciphersuite));
        hkdf_expand_label(self.ciphersuite, path_secret, "node", &[], length)
    }

    /// An interior node rebuilt from a level's path secret.
    fn new_path_node(&self, path_secret: &[u8]) -> Result<RatchetTreeNode, TreeError> {
        let node_secret = self.node_step(path_secret);
        let private_key = DHPrivateKey::derive(self.ciphersuite.into(), &node_secret)
            .map_err(|_| TreeError::EncryptionFailure)?;
        Ok(RatchetTreeNode::from_private_key(
            Some(path_secret.to_vec()),
            private_key,
        ))
    }

    /// Fills the blank slot at `index` or grows the tree to hold it, then
    /// blanks the direct path so later derivations depend on a fresh path.
    pub fn add_leaf(
        &mut self,
        index: LeafIndex,
        public_key: DHPublicKey,
        credential: Credential,
    ) -> Result<(), TreeError> {
        let span = self.leaf_span();
        let node_index = NodeIndex::from(index);
        if index.as_u32() < span.as_u32() {
            if self.nodes[node_index.as_usize()].is_some() {
                return Err(TreeError::LeafOccupied);
            }
        } else if index.as_u32() == span.as_u32() {
            let new_width = treemath::node_width(LeafCount::from(index.as_u32() + 1));
            while self.nodes.len() < new_width {
                self.nodes.push(None);
            }
        } else {
            return Err(TreeError::IndexOutOfBounds);
        }

        let mut leaf = RatchetTreeNode::from_public_key(public_key);
        leaf.set_credential(credential);
        self.nodes[node_index.as_usize()] = Some(leaf);
        self.blank_path(index);
        Ok(())
    }

    /// Overwrites every node on `index`'s direct path with a blank.
    pub fn blank_path(&mut self, index: LeafIndex) {
        let node_index = NodeIndex::from(index);
        for d in treemath::direct_path(node_index, self.leaf_span()) {
            self.nodes[d.as_usize()] = None;
        }
    }

    pub fn blank_leaf(&mut self, index: LeafIndex) {
        self.nodes[NodeIndex::from(index).as_usize()] = None;
    }

    /// Re-derives the whole direct path from a leaf secret the caller knows
    /// in full: leaf key from the secret itself, then one path step per
    /// level.
    pub fn set_path(&mut self, index: LeafIndex, leaf_secret: &[u8]) -> Result<(), TreeError> {
        let node_index = NodeIndex::from(index);
        if node_index.as_usize() >= self.nodes.len() {
            return Err(TreeError::IndexOutOfBounds);
        }
        let leaf = Self::leaf_from_secret(self.ciphersuite, leaf_secret)?;
        self.merge_node(node_index, leaf);

        let mut path_secret = leaf_secret.to_vec();
        for d in treemath::direct_path(node_index, self.leaf_span()) {
            path_secret = self.path_step(&path_secret);
            let node = self.new_path_node(&path_secret)?;
            self.merge_node(d, node);
        }
        Ok(())
    }

    /// Computes the `DirectPath` announcing a fresh leaf secret at `from`:
    /// new public keys for the whole path, plus each level's path secret
    /// sealed to the resolution of the copath node at that level. Does not
    /// mutate the tree.
    pub fn encrypt(
        &self,
        from: LeafIndex,
        leaf_secret: &[u8],
        context: &[u8],
    ) -> Result<DirectPath, TreeError> {
        let node_index = NodeIndex::from(from);
        if node_index.as_usize() >= self.nodes.len() {
            return Err(TreeError::IndexOutOfBounds);
        }
        let leaf = Self::leaf_from_secret(self.ciphersuite, leaf_secret)?;
        let mut nodes = vec![DirectPathNode {
            public_key: leaf.public_key().clone(),
            encrypted_path_secret: vec![],
        }];

        let copath = treemath::copath(node_index, self.leaf_span());
        let mut path_secret = leaf_secret.to_vec();
        for (level, copath_node) in copath.iter().enumerate() {
            path_secret = self.path_step(&path_secret);
            let node = self.new_path_node(&path_secret)?;
            let aad = path_aad(context, level);
            let mut encrypted_path_secret = vec![];
            for resolved in self.resolve(*copath_node) {
                let public_key = self.nodes[resolved.as_usize()]
                    .as_ref()
                    .map(|node| node.public_key().clone())
                    .ok_or(TreeError::EncryptionFailure)?;
                let ciphertext = HpkeCiphertext::seal(
                    self.ciphersuite,
                    &public_key,
                    &path_secret,
                    Some(&aad),
                    None,
                )
                .map_err(|_| TreeError::EncryptionFailure)?;
                encrypted_path_secret.push(ciphertext);
            }
            nodes.push(DirectPathNode {
                public_key: node.public_key().clone(),
                encrypted_path_secret,
            });
        }
        Ok(DirectPath { nodes })
    }

    /// Recovers what this member can from a peer's `DirectPath`: the first
    /// level whose copath resolution contains one of our private keys yields
    /// a path secret; everything above is re-derived, everything below is
    /// absorbed as public keys. Leaves the tree untouched.
    pub fn decrypt(
        &self,
        from: LeafIndex,
        direct_path: &DirectPath,
        context: &[u8],
    ) -> Result<MergeInfo, TreeError> {
        let node_index = NodeIndex::from(from);
        if node_index.as_usize() >= self.nodes.len() {
            return Err(TreeError::IndexOutOfBounds);
        }
        let copath = treemath::copath(node_index, self.leaf_span());
        if direct_path.nodes.len() != copath.len() + 1 {
            return Err(TreeError::MalformedDirectPath);
        }

        let mut info = MergeInfo {
            public_keys: vec![direct_path.nodes[0].public_key.clone()],
            secrets: vec![],
        };

        let mut path_secret: Option<Vec<u8>> = None;
        for (level, copath_node) in copath.iter().enumerate() {
            let path_node = &direct_path.nodes[level + 1];
            path_secret = match path_secret {
                Some(secret) => Some(self.path_step(&secret)),
                None => {
                    let resolution = self.resolve(*copath_node);
                    if path_node.encrypted_path_secret.len() != resolution.len() {
                        return Err(TreeError::MalformedDirectPath);
                    }
                    let aad = path_aad(context, level);
                    let mut recovered = None;
                    for (position, resolved) in resolution.iter().enumerate() {
                        let private_key = match self.nodes[resolved.as_usize()]
                            .as_ref()
                            .and_then(|node| node.private_key())
                        {
                            Some(private_key) => private_key,
                            None => continue,
                        };
                        let secret = path_node.encrypted_path_secret[position]
                            .open(self.ciphersuite, private_key, Some(&aad), None)
                            .map_err(|_| TreeError::DecryptionFailure)?;
                        trace!("recovered path secret at level {}", level);
                        recovered = Some(secret);
                        break;
                    }
                    recovered
                }
            };

            match &path_secret {
                Some(secret) => {
                    let derived = self.new_path_node(secret)?;
                    if derived.public_key() != &path_node.public_key {
                        return Err(TreeError::PublicKeyMismatch);
                    }
                    info.secrets.push(secret.clone());
                }
                None => {
                    info.public_keys.push(path_node.public_key.clone());
                }
            }
        }

        if path_secret.is_none() {
            return Err(TreeError::DecryptionFailure);
        }
        Ok(info)
    }

    /// Writes a decrypted path into the tree: public keys below the
    /// recovery point, secret-bearing nodes from there to the root.
    pub fn merge_path(&mut self, from: LeafIndex, info: MergeInfo) -> Result<(), TreeError> {
        let node_index = NodeIndex::from(from);
        let mut targets = vec![node_index];
        targets.extend(treemath::direct_path(node_index, self.leaf_span()));
        if targets.len() != info.public_keys.len() + info.secrets.len() {
            return Err(TreeError::MalformedDirectPath);
        }

        for (i, target) in targets.iter().enumerate() {
            if i < info.public_keys.len() {
                let node = RatchetTreeNode::from_public_key(info.public_keys[i].clone());
                self.merge_node(*target, node);
            } else {
                let secret = &info.secrets[i - info.public_keys.len()];
                let node = self.new_path_node(secret)?;
                self.merge_node(*target, node);
            }
        }

        if !self.check_invariant(from) {
            panic!("ratchet tree left inconsistent after merge");
        }
        Ok(())
    }

    /// After a merge toward `from`, the whole path must be populated and the
    /// root must hold a secret.
    pub fn check_invariant(&self, from: LeafIndex) -> bool {
        let node_index = NodeIndex::from(from);
        if self.nodes[node_index.as_usize()].is_none() {
            return false;
        }
        for d in treemath::direct_path(node_index, self.leaf_span()) {
            if self.nodes[d.as_usize()].is_none() {
                return false;
            }
        }
        let root = treemath::root(self.leaf_span());
        self.nodes[root.as_usize()]
            .as_ref()
            .map(|node| node.secret().is_some())
            .unwrap_or(false)
    }

    /// The group's current shared secret.
    pub fn root_secret(&self) -> Vec<u8> {
        let root = treemath::root(self.leaf_span());
        self.nodes[root.as_usize()]
            .as_ref()
            .and_then(|node| node.secret())
            .expect("root node holds no secret")
            .to_vec()
    }

    /// Merkle-style commitment to the tree's shape and public keys.
    pub fn root_hash(&self) -> Vec<u8> {
        self.node_hash(treemath::root(self.leaf_span()))
    }

    fn node_hash(&self, index: NodeIndex) -> Vec<u8> {
        let algorithm = HashAlgorithm::from(self.ciphersuite);
        if treemath::level(index) == 0 {
            let input = LeafNodeHashInput {
                node: self.nodes[index.as_usize()].clone(),
            };
            hash(algorithm, &input.encode_detached().unwrap())
        } else {
            let left_hash = self.node_hash(treemath::left(index));
            let right_hash = self.node_hash(treemath::right(index, self.leaf_span()));
            let input = ParentNodeHashInput {
                public_key: self.nodes[index.as_usize()]
                    .as_ref()
                    .map(|node| node.public_key().clone()),
                left_hash,
                right_hash,
            };
            hash(algorithm, &input.encode_detached().unwrap())
        }
    }

    /// Drops trailing blank leaves so the span ends at the highest occupied
    /// leaf.
    pub fn truncate(&mut self) {
        while self.nodes.len() > 1 && self.nodes.last().map(|n| n.is_none()).unwrap_or(false) {
            self.nodes.pop();
            self.nodes.pop();
        }
    }
}

impl PartialEq for RatchetTree {
    fn eq(&self, other: &Self) -> bool {
        self.ciphersuite == other.ciphersuite && self.nodes == other.nodes
    }
}

impl Codec for RatchetTree {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU24, buffer, &self.nodes)?;
        Ok(())
    }
}

fn path_aad(context: &[u8], level: usize) -> Vec<u8> {
    let mut aad = context.to_vec();
    (level as u32).encode(&mut aad).unwrap();
    aad
}

struct LeafNodeHashInput {
    node: Option<RatchetTreeNode>,
}

impl Codec for LeafNodeHashInput {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.node.encode(buffer)?;
        Ok(())
    }
}

struct ParentNodeHashInput {
    public_key: Option<DHPublicKey>,
    left_hash: Vec<u8>,
    right_hash: Vec<u8>,
}

impl Codec for ParentNodeHashInput {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.public_key.encode(buffer)?;
        encode_vec(VecSize::VecU8, buffer, &self.left_hash)?;
        encode_vec(VecSize::VecU8, buffer, &self.right_hash)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::randombytes;

    const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;

    fn credential(id: u8) -> Credential {
        let identity = Identity::new(SUITE, vec![id]);
        Credential::Raw(RawKeyCredential::from(&identity))
    }

    #[test]
    fn single_leaf_tree() {
        let tree = RatchetTree::new(SUITE, &randombytes(32), credential(0)).unwrap();
        assert_eq!(tree.node_size(), 1);
        assert_eq!(tree.leaf_span(), LeafCount::from(1u32));
        assert!(tree.occupied(LeafIndex::from(0u32)));
        // A lone leaf is the root; its leaf secret is the root secret.
        assert!(!tree.root_secret().is_empty());
    }

    #[test]
    fn add_then_set_path_matches_decrypt_merge() {
        let cred_a = credential(0);
        let cred_b = credential(1);
        let secret_a = randombytes(32);
        let mut tree_a = RatchetTree::new(SUITE, &secret_a, cred_a).unwrap();
        let wire = tree_a.encode_detached().unwrap();

        // The adder grows a copy and encrypts toward the new leaf.
        let leaf_secret = randombytes(32);
        let init_leaf = randombytes(32);
        let init_pub = DHPrivateKey::derive(SUITE.into(), &init_leaf)
            .unwrap()
            .derive_public_key();
        let mut grown = tree_a.clone();
        grown
            .add_leaf(LeafIndex::from(1u32), init_pub.clone(), cred_b.clone())
            .unwrap();
        let path = grown
            .encrypt(LeafIndex::from(1u32), &leaf_secret, b"ctx")
            .unwrap();

        // The adder applies via decrypt + merge.
        tree_a
            .add_leaf(LeafIndex::from(1u32), init_pub.clone(), cred_b.clone())
            .unwrap();
        let info = tree_a.decrypt(LeafIndex::from(1u32), &path, b"ctx").unwrap();
        tree_a.merge_path(LeafIndex::from(1u32), info).unwrap();

        // The joiner reassembles the public tree and sets its own path.
        let mut tree_b =
            RatchetTree::decode_with_suite(SUITE, &mut Cursor::new(&wire)).unwrap();
        tree_b
            .add_leaf(LeafIndex::from(1u32), init_pub, cred_b)
            .unwrap();
        tree_b.set_path(LeafIndex::from(1u32), &leaf_secret).unwrap();

        assert_eq!(tree_a, tree_b);
        assert_eq!(tree_a.root_secret(), tree_b.root_secret());
        assert_eq!(tree_a.root_hash(), tree_b.root_hash());
        assert_eq!(tree_a.node_size(), 3);
    }

    #[test]
    fn decrypt_needs_a_private_key() {
        let secrets = vec![randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1)];
        let tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        let path = tree
            .encrypt(LeafIndex::from(0u32), &randombytes(32), b"ctx")
            .unwrap();

        // A bystander holding only the public tree cannot recover anything.
        let wire = tree.encode_detached().unwrap();
        let public_tree =
            RatchetTree::decode_with_suite(SUITE, &mut Cursor::new(&wire)).unwrap();
        assert_eq!(
            public_tree.decrypt(LeafIndex::from(0u32), &path, b"ctx"),
            Err(TreeError::DecryptionFailure)
        );
    }

    #[test]
    fn mismatched_context_is_rejected() {
        let secrets = vec![randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1)];
        let tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        let path = tree
            .encrypt(LeafIndex::from(0u32), &randombytes(32), b"epoch 1")
            .unwrap();
        assert_eq!(
            tree.decrypt(LeafIndex::from(0u32), &path, b"epoch 2"),
            Err(TreeError::DecryptionFailure)
        );
    }

    #[test]
    fn tampered_path_public_key_is_rejected() {
        let secrets = vec![randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1)];
        let tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        let mut path = tree
            .encrypt(LeafIndex::from(0u32), &randombytes(32), b"ctx")
            .unwrap();
        let last = path.nodes.len() - 1;
        path.nodes[last].public_key = DHKeyPair::new(SUITE.into()).unwrap().public_key;
        assert_eq!(
            tree.decrypt(LeafIndex::from(0u32), &path, b"ctx"),
            Err(TreeError::PublicKeyMismatch)
        );
    }

    #[test]
    fn resolution_skips_blank_leaves() {
        let secrets = vec![randombytes(32), randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1), credential(2)];
        let mut tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        tree.blank_leaf(LeafIndex::from(1u32));
        tree.blank_path(LeafIndex::from(1u32));
        // Node 1's subtree now resolves to leaf 0 alone.
        assert_eq!(
            tree.resolve(NodeIndex::from(1u32)),
            vec![NodeIndex::from(0u32)]
        );
    }

    #[test]
    fn truncate_drops_trailing_blanks() {
        let secrets = vec![randombytes(32), randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1), credential(2)];
        let mut tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        assert_eq!(tree.node_size(), 5);
        tree.blank_leaf(LeafIndex::from(2u32));
        tree.blank_path(LeafIndex::from(2u32));
        tree.truncate();
        assert_eq!(tree.node_size(), 3);
        assert_eq!(tree.leaf_span(), LeafCount::from(2u32));
    }

    #[test]
    fn shape_invariant_holds_after_mutations() {
        let secrets = vec![randombytes(32), randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1), credential(2)];
        let tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        let span = tree.leaf_span().as_usize();
        assert_eq!(tree.node_size(), 2 * span - 1);
        assert!(tree.check_invariant(LeafIndex::from(2u32)));
    }

    #[test]
    fn root_hash_tracks_public_changes() {
        let secrets = vec![randombytes(32), randombytes(32)];
        let creds = vec![credential(0), credential(1)];
        let mut tree = RatchetTree::new_from_secrets(SUITE, &secrets, &creds).unwrap();
        let before = tree.root_hash();
        tree.set_path(LeafIndex::from(0u32), &randombytes(32)).unwrap();
        assert_ne!(before, tree.root_hash());
    }
}
