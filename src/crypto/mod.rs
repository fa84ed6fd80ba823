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

pub mod aead;
pub mod dh;
pub mod hash;
pub mod hkdf;
pub mod hmac;
pub mod hpke;
pub mod signatures;

use crate::codec::*;

/// A cipher suite selects one coherent triple of DH group, HKDF digest and
/// AEAD, plus the matching signature scheme. Values derived under one suite
/// must never be mixed with another.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CipherSuite {
    X25519_SHA256_AES128GCM_Ed25519 = 0x0001,
    X25519_SHA256_CHACHA20POLY1305_Ed25519 = 0x0002,
    INVALID = 0xffff,
}

impl From<u16> for CipherSuite {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => CipherSuite::X25519_SHA256_AES128GCM_Ed25519,
            0x0002 => CipherSuite::X25519_SHA256_CHACHA20POLY1305_Ed25519,
            _ => CipherSuite::INVALID,
        }
    }
}

impl Codec for CipherSuite {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        (*self as u16).encode(buffer)?;
        Ok(())
    }
    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let suite = CipherSuite::from(u16::decode(cursor)?);
        if suite == CipherSuite::INVALID {
            return Err(CodecError::DecodingError);
        }
        Ok(suite)
    }
}

#[test]
fn test_cipher_suite_codec() {
    let suite = CipherSuite::X25519_SHA256_AES128GCM_Ed25519;
    let encoded = suite.encode_detached().unwrap();
    assert_eq!(encoded, vec![0x00, 0x01]);
    assert_eq!(CipherSuite::decode_detached(&encoded).unwrap(), suite);
    assert!(CipherSuite::decode_detached(&[0x00, 0x09]).is_err());
}
