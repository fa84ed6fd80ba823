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
use crate::crypto::signatures::*;
use crate::crypto::CipherSuite;
use crate::tree::*;
use crate::uik::*;

/// Index of a node in the flat tree vector. Leaves sit at even positions,
/// parents at odd ones.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn as_u32(self) -> u32 {
        self.0
    }
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeIndex {
    fn from(i: u32) -> NodeIndex {
        NodeIndex(i)
    }
}

impl From<usize> for NodeIndex {
    fn from(i: usize) -> NodeIndex {
        NodeIndex(i as u32)
    }
}

impl From<LeafIndex> for NodeIndex {
    fn from(leaf_index: LeafIndex) -> NodeIndex {
        NodeIndex(leaf_index.as_u32() * 2)
    }
}

/// Index of a leaf, i.e. of a member slot. `node = 2 * leaf`.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
pub struct LeafIndex(u32);

impl LeafIndex {
    pub fn as_u32(self) -> u32 {
        self.0
    }
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LeafIndex {
    fn from(i: u32) -> LeafIndex {
        LeafIndex(i)
    }
}

impl From<usize> for LeafIndex {
    fn from(i: usize) -> LeafIndex {
        LeafIndex(i as u32)
    }
}

impl From<NodeIndex> for LeafIndex {
    fn from(node_index: NodeIndex) -> LeafIndex {
        LeafIndex(node_index.as_u32() / 2)
    }
}

/// Number of leaves in a tree. `n` leaves span `2n - 1` nodes.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Copy, Clone)]
pub struct LeafCount(u32);

impl LeafCount {
    pub fn as_u32(self) -> u32 {
        self.0
    }
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LeafCount {
    fn from(i: u32) -> LeafCount {
        LeafCount(i)
    }
}

impl From<usize> for LeafCount {
    fn from(i: usize) -> LeafCount {
        LeafCount(i as u32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(u8)]
pub enum GroupOperationType {
    Add = 0,
    Update = 1,
    Remove = 2,
    Default = 255,
}

impl From<u8> for GroupOperationType {
    fn from(value: u8) -> Self {
        match value {
            0 => GroupOperationType::Add,
            1 => GroupOperationType::Update,
            2 => GroupOperationType::Remove,
            _ => GroupOperationType::Default,
        }
    }
}

impl Codec for GroupOperationType {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        (*self as u8).encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        Ok(GroupOperationType::from(u8::decode(cursor)?))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Add {
    pub path: DirectPath,
    pub init_key: UserInitKey,
}

impl Codec for Add {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.path.encode(buffer)?;
        self.init_key.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let path = DirectPath::decode(cursor)?;
        let init_key = UserInitKey::decode(cursor)?;
        Ok(Add { path, init_key })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Update {
    pub path: DirectPath,
}

impl Codec for Update {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.path.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let path = DirectPath::decode(cursor)?;
        Ok(Update { path })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Remove {
    pub removed: LeafIndex,
    pub path: DirectPath,
}

impl Codec for Remove {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.removed.as_u32().encode(buffer)?;
        self.path.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let removed = LeafIndex::from(u32::decode(cursor)?);
        let path = DirectPath::decode(cursor)?;
        Ok(Remove { removed, path })
    }
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, PartialEq, Clone)]
pub enum GroupOperation {
    Add(Add),
    Update(Update),
    Remove(Remove),
}

impl GroupOperation {
    pub fn get_type(&self) -> GroupOperationType {
        match self {
            GroupOperation::Add(_) => GroupOperationType::Add,
            GroupOperation::Update(_) => GroupOperationType::Update,
            GroupOperation::Remove(_) => GroupOperationType::Remove,
        }
    }
}

impl Codec for GroupOperation {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.get_type().encode(buffer)?;
        match self {
            GroupOperation::Add(add) => add.encode(buffer)?,
            GroupOperation::Update(update) => update.encode(buffer)?,
            GroupOperation::Remove(remove) => remove.encode(buffer)?,
        }
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        match GroupOperationType::decode(cursor)? {
            GroupOperationType::Add => Ok(GroupOperation::Add(Add::decode(cursor)?)),
            GroupOperationType::Update => Ok(GroupOperation::Update(Update::decode(cursor)?)),
            GroupOperationType::Remove => Ok(GroupOperation::Remove(Remove::decode(cursor)?)),
            GroupOperationType::Default => Err(CodecError::DecodingError),
        }
    }
}

/// A signed group operation. The signature covers the successor group state,
/// not the handshake itself, so applying the operation and verifying are one
/// step.
#[derive(Debug, PartialEq, Clone)]
pub struct Handshake {
    pub prior_epoch: u32,
    pub operation: GroupOperation,
    pub signer_index: LeafIndex,
    pub signature: Signature,
}

impl Codec for Handshake {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        self.prior_epoch.encode(buffer)?;
        self.operation.encode(buffer)?;
        self.signer_index.as_u32().encode(buffer)?;
        self.signature.encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let prior_epoch = u32::decode(cursor)?;
        let operation = GroupOperation::decode(cursor)?;
        let signer_index = LeafIndex::from(u32::decode(cursor)?);
        let signature = Signature::decode(cursor)?;
        Ok(Handshake {
            prior_epoch,
            operation,
            signer_index,
            signature,
        })
    }
}

/// Everything a new member needs to assemble the group state it is being
/// added to: a snapshot of the pre-add state plus the adder's fresh leaf
/// secret.
#[derive(Debug, Clone)]
pub struct Welcome {
    pub group_id: Vec<u8>,
    pub epoch: u32,
    pub cipher_suite: CipherSuite,
    pub roster: Roster,
    pub tree: RatchetTree,
    pub transcript: Vec<GroupOperation>,
    pub init_secret: Vec<u8>,
    pub leaf_secret: Vec<u8>,
}

impl Codec for Welcome {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vec(VecSize::VecU8, buffer, &self.group_id)?;
        self.epoch.encode(buffer)?;
        self.cipher_suite.encode(buffer)?;
        self.roster.encode(buffer)?;
        self.tree.encode(buffer)?;
        encode_vec(VecSize::VecU24, buffer, &self.transcript)?;
        encode_vec(VecSize::VecU8, buffer, &self.init_secret)?;
        encode_vec(VecSize::VecU8, buffer, &self.leaf_secret)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let group_id = decode_vec(VecSize::VecU8, cursor)?;
        let epoch = u32::decode(cursor)?;
        // The suite tag precedes the tree so the node decoder has its
        // context.
        let cipher_suite = CipherSuite::decode(cursor)?;
        let roster = Roster::decode(cursor)?;
        let tree = RatchetTree::decode_with_suite(cipher_suite, cursor)?;
        let transcript = decode_vec(VecSize::VecU24, cursor)?;
        let init_secret = decode_vec(VecSize::VecU8, cursor)?;
        let leaf_secret = decode_vec(VecSize::VecU8, cursor)?;
        Ok(Welcome {
            group_id,
            epoch,
            cipher_suite,
            roster,
            tree,
            transcript,
            init_secret,
            leaf_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_conversions() {
        assert_eq!(NodeIndex::from(LeafIndex::from(0u32)), NodeIndex::from(0u32));
        assert_eq!(NodeIndex::from(LeafIndex::from(3u32)), NodeIndex::from(6u32));
        assert_eq!(LeafIndex::from(NodeIndex::from(4u32)), LeafIndex::from(2u32));
    }

    #[test]
    fn operation_type_values() {
        assert_eq!(
            GroupOperationType::Add.encode_detached().unwrap(),
            vec![0u8]
        );
        assert_eq!(
            GroupOperationType::Update.encode_detached().unwrap(),
            vec![1u8]
        );
        assert_eq!(
            GroupOperationType::Remove.encode_detached().unwrap(),
            vec![2u8]
        );
        assert!(GroupOperation::decode_detached(&[3u8]).is_err());
    }

    #[test]
    fn handshake_codec_round_trip() {
        let handshake = Handshake {
            prior_epoch: 7,
            operation: GroupOperation::Remove(Remove {
                removed: LeafIndex::from(1u32),
                path: DirectPath { nodes: vec![] },
            }),
            signer_index: LeafIndex::from(0u32),
            signature: Signature::from_bytes(&[42u8; 64]),
        };
        let decoded = Handshake::decode_detached(&handshake.encode_detached().unwrap()).unwrap();
        assert_eq!(handshake, decoded);
    }
}
