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

extern crate aead;
extern crate aes_gcm;
extern crate byteorder;
extern crate chacha20poly1305;
extern crate ed25519_dalek;
extern crate hmac;
extern crate log;
extern crate rand;
extern crate sha2;
extern crate x25519_dalek;
extern crate zeroize;

pub mod codec;
pub mod creds;
pub mod crypto;
pub mod group;
pub mod messages;
pub mod schedule;
pub mod tree;
pub mod treemath;
pub mod uik;
pub mod utils;
