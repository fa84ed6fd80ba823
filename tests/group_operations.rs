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

//! End-to-end group lifecycle scenarios: add, update, remove, and the
//! rejection paths, exercised through full member views.

use treekem::codec::*;
use treekem::creds::*;
use treekem::crypto::signatures::Signature;
use treekem::crypto::CipherSuite;
use treekem::group::*;
use treekem::messages::*;
use treekem::uik::*;
use treekem::utils::randombytes;

const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
const GROUP_ID: &[u8] = &[0x00];

/// Founds a two-member group: Alice creates it, Bob joins via Welcome.
/// Returns both members' states and the Add handshake that got Bob in.
fn two_member_group() -> (State, State, Handshake) {
    let alice = Identity::new(SUITE, b"alice".to_vec());
    let bob = Identity::new(SUITE, b"bob".to_vec());

    let alice_state =
        State::new_group(GroupId::from_bytes(GROUP_ID), SUITE, alice).unwrap();

    let bob_init_secret = randombytes(32);
    let bob_uik = UserInitKey::new(vec![SUITE], &bob_init_secret, &bob).unwrap();

    let (welcome, add) = alice_state.add(&bob_uik).unwrap();
    let alice_state = alice_state.handle(&add).unwrap();
    let bob_state = State::join(bob, &bob_init_secret, &welcome, &add).unwrap();

    (alice_state, bob_state, add)
}

/// Grows the two-member group to three; Charlie joins at leaf 2.
fn three_member_group() -> (State, State, State) {
    let (alice_state, bob_state, _) = two_member_group();
    let charlie = Identity::new(SUITE, b"charlie".to_vec());
    let charlie_init_secret = randombytes(32);
    let charlie_uik = UserInitKey::new(vec![SUITE], &charlie_init_secret, &charlie).unwrap();

    let (welcome, add) = alice_state.add(&charlie_uik).unwrap();
    let alice_state = alice_state.handle(&add).unwrap();
    let bob_state = bob_state.handle(&add).unwrap();
    let charlie_state = State::join(charlie, &charlie_init_secret, &welcome, &add).unwrap();

    (alice_state, bob_state, charlie_state)
}

#[test]
fn two_member_add() {
    let (alice_state, bob_state, _) = two_member_group();

    assert_eq!(alice_state.epoch(), 1);
    assert_eq!(bob_state.epoch(), 1);
    assert_eq!(alice_state, bob_state);
    assert_eq!(
        alice_state.tree().root_secret(),
        bob_state.tree().root_secret()
    );
    assert_eq!(alice_state.roster().len(), 2);
    assert!(!alice_state.message_master_secret().is_empty());
}

#[test]
fn self_update() {
    let (mut alice_state, bob_state, _) = two_member_group();
    let master_before = alice_state.message_master_secret().to_vec();

    let update = alice_state.update(&[0x01; 32]).unwrap();
    let alice_next = alice_state.handle(&update).unwrap();
    let bob_next = bob_state.handle(&update).unwrap();

    assert_eq!(alice_next.epoch(), 2);
    assert_eq!(alice_next, bob_next);
    assert_ne!(alice_next.message_master_secret(), &master_before[..]);
}

#[test]
fn peer_update() {
    let (mut alice_state, mut bob_state, _) = two_member_group();

    let update = alice_state.update(&[0x01; 32]).unwrap();
    alice_state = alice_state.handle(&update).unwrap();
    bob_state = bob_state.handle(&update).unwrap();

    let update = bob_state.update(&[0x02; 32]).unwrap();
    let alice_next = alice_state.handle(&update).unwrap();
    let bob_next = bob_state.handle(&update).unwrap();

    assert_eq!(alice_next.epoch(), 3);
    assert_eq!(alice_next, bob_next);
    assert_eq!(
        alice_next.tree().root_secret(),
        bob_next.tree().root_secret()
    );
}

#[test]
fn remove_middle_member() {
    let (alice_state, bob_state, charlie_state) = three_member_group();

    let remove = alice_state.remove(LeafIndex::from(1u32)).unwrap();
    let alice_next = alice_state.handle(&remove).unwrap();
    let charlie_next = charlie_state.handle(&remove).unwrap();

    assert_eq!(alice_next.epoch(), 3);
    assert_eq!(alice_next, charlie_next);

    // The evicted slot is blank; the roster records the remover over it.
    assert!(!alice_next.tree().occupied(LeafIndex::from(1u32)));
    assert_eq!(
        alice_next.roster().get(LeafIndex::from(1u32)),
        alice_next.roster().get(LeafIndex::from(0u32))
    );
    assert_eq!(alice_next.roster().len(), 3);

    // The removed member cannot follow the group into the new epoch.
    assert!(bob_state.handle(&remove).is_err());
}

#[test]
fn remove_trailing_member() {
    let (alice_state, bob_state, charlie_state) = three_member_group();

    let remove = alice_state.remove(LeafIndex::from(2u32)).unwrap();
    let alice_next = alice_state.handle(&remove).unwrap();
    let bob_next = bob_state.handle(&remove).unwrap();

    assert_eq!(alice_next.epoch(), 3);
    assert_eq!(alice_next, bob_next);

    // The highest-index slot stays in place: the leaf is blanked but the
    // tree keeps its span and the roster retains the remover's credential
    // over the removed slot.
    assert!(!alice_next.tree().occupied(LeafIndex::from(2u32)));
    assert_eq!(alice_next.tree().node_size(), 5);
    assert_eq!(alice_next.tree().leaf_span().as_u32(), 3);
    assert_eq!(alice_next.roster().len(), 3);
    assert_eq!(
        alice_next.roster().get(LeafIndex::from(2u32)),
        alice_next.roster().get(LeafIndex::from(0u32))
    );

    assert!(charlie_state.handle(&remove).is_err());
}

#[test]
fn out_of_order_handshake_is_rejected() {
    let (mut alice_state, _, add) = two_member_group();
    let update = alice_state.update(&[0x01; 32]).unwrap();
    alice_state = alice_state.handle(&update).unwrap();

    let before = alice_state.clone();
    let result = alice_state.handle(&add);
    assert_eq!(
        result.unwrap_err(),
        GroupError::InvalidParameter("epoch mismatch")
    );
    assert_eq!(alice_state, before);
}

#[test]
fn tampered_signature_is_rejected() {
    let (mut alice_state, bob_state, _) = two_member_group();
    let update = alice_state.update(&[0x01; 32]).unwrap();

    let mut tampered = update.clone();
    let mut bytes = tampered.signature.as_slice().to_vec();
    bytes[0] ^= 0x01;
    tampered.signature = Signature::from_bytes(&bytes);

    let before = bob_state.clone();
    assert_eq!(
        bob_state.handle(&tampered).unwrap_err(),
        GroupError::Crypto("handshake signature verification failed")
    );
    assert_eq!(bob_state, before);

    // The untampered original still applies.
    assert!(bob_state.handle(&update).is_ok());
}

#[test]
fn members_converge_over_a_handshake_sequence() {
    let (mut alice_state, mut bob_state, _) = two_member_group();

    for round in 0..4 {
        let update = if round % 2 == 0 {
            alice_state.update(&randombytes(32)).unwrap()
        } else {
            bob_state.update(&randombytes(32)).unwrap()
        };
        let prior = alice_state.epoch();
        alice_state = alice_state.handle(&update).unwrap();
        bob_state = bob_state.handle(&update).unwrap();

        assert_eq!(alice_state.epoch(), prior + 1);
        assert_eq!(alice_state, bob_state);
        assert_eq!(
            alice_state.tree().root_secret(),
            bob_state.tree().root_secret()
        );
    }
}

#[test]
fn foreign_path_cannot_be_decrypted() {
    // A handshake from an unrelated group has the right shape but its path
    // secrets are sealed to other members' keys.
    let (alice_state, _, _) = two_member_group();
    let (_, mut other_bob, _) = two_member_group();

    let foreign_update = other_bob.update(&randombytes(32)).unwrap();
    let before = alice_state.clone();
    assert_eq!(
        alice_state.handle(&foreign_update).unwrap_err(),
        GroupError::Crypto("path decryption failed")
    );
    assert_eq!(alice_state, before);
}

#[test]
fn handshake_codec_round_trip() {
    let (mut alice_state, _, add) = two_member_group();

    let decoded = Handshake::decode_detached(&add.encode_detached().unwrap()).unwrap();
    assert_eq!(add, decoded);

    let update = alice_state.update(&randombytes(32)).unwrap();
    let decoded = Handshake::decode_detached(&update.encode_detached().unwrap()).unwrap();
    assert_eq!(update, decoded);

    // A decoded handshake still applies cleanly.
    assert!(alice_state.handle(&decoded).is_ok());
}

#[test]
fn welcome_codec_round_trip() {
    let alice = Identity::new(SUITE, b"alice".to_vec());
    let bob = Identity::new(SUITE, b"bob".to_vec());
    let alice_state = State::new_group(GroupId::from_bytes(GROUP_ID), SUITE, alice).unwrap();

    let bob_init_secret = randombytes(32);
    let bob_uik = UserInitKey::new(vec![SUITE], &bob_init_secret, &bob).unwrap();
    let (welcome, add) = alice_state.add(&bob_uik).unwrap();

    // Encoding is canonical: decode then re-encode yields the same bytes,
    // and the decoded Welcome still admits the new member.
    let encoded = welcome.encode_detached().unwrap();
    let decoded = Welcome::decode_detached(&encoded).unwrap();
    assert_eq!(decoded.encode_detached().unwrap(), encoded);

    let alice_state = alice_state.handle(&add).unwrap();
    let bob_state = State::join(bob, &bob_init_secret, &decoded, &add).unwrap();
    assert_eq!(alice_state, bob_state);
}

#[test]
fn misaddressed_add_is_rejected() {
    let alice = Identity::new(SUITE, b"alice".to_vec());
    let bob = Identity::new(SUITE, b"bob".to_vec());
    let mallory = Identity::new(SUITE, b"mallory".to_vec());
    let alice_state = State::new_group(GroupId::from_bytes(GROUP_ID), SUITE, alice).unwrap();

    let bob_init_secret = randombytes(32);
    let bob_uik = UserInitKey::new(vec![SUITE], &bob_init_secret, &bob).unwrap();
    let (welcome, add) = alice_state.add(&bob_uik).unwrap();

    assert_eq!(
        State::join(mallory, &bob_init_secret, &welcome, &add).unwrap_err(),
        GroupError::InvalidParameter("add not addressed to this identity")
    );
}

#[test]
fn join_with_wrong_init_secret_is_rejected() {
    let alice = Identity::new(SUITE, b"alice".to_vec());
    let bob = Identity::new(SUITE, b"bob".to_vec());
    let alice_state = State::new_group(GroupId::from_bytes(GROUP_ID), SUITE, alice).unwrap();

    let bob_init_secret = randombytes(32);
    let bob_uik = UserInitKey::new(vec![SUITE], &bob_init_secret, &bob).unwrap();
    let (welcome, add) = alice_state.add(&bob_uik).unwrap();

    assert_eq!(
        State::join(bob, &randombytes(32), &welcome, &add).unwrap_err(),
        GroupError::Protocol("incorrect init key")
    );
}

#[test]
fn add_requires_matching_suite() {
    let alice = Identity::new(SUITE, b"alice".to_vec());
    let bob = Identity::new(SUITE, b"bob".to_vec());
    let alice_state = State::new_group(GroupId::from_bytes(GROUP_ID), SUITE, alice).unwrap();

    let bob_uik = UserInitKey::new(
        vec![CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519],
        &randombytes(32),
        &bob,
    )
    .unwrap();

    assert_eq!(
        alice_state.add(&bob_uik).unwrap_err(),
        GroupError::Protocol("new member does not support the group's cipher suite")
    );
}
