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

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

#[derive(Debug, PartialEq)]
pub enum CodecError {
    EncodingError,
    DecodingError,
}

/// Length prefix widths from the TLS presentation language. `VecU24` is the
/// 3-byte prefix carried by the `<1..2^24-1>` fields of the group state.
pub enum VecSize {
    VecU8,
    VecU16,
    VecU24,
    VecU32,
}

pub struct Cursor {
    buffer: Vec<u8>,
    position: usize,
}

impl Cursor {
    pub fn new(bytes: &[u8]) -> Cursor {
        Cursor {
            buffer: bytes.to_vec(),
            position: 0,
        }
    }

    pub fn consume(&mut self, length: usize) -> Result<&[u8], CodecError> {
        let unread_bytes = self.buffer.len() - self.position;
        if unread_bytes < length {
            return Err(CodecError::DecodingError);
        }

        let position = self.position;
        self.position += length;
        Ok(&self.buffer[position..position + length])
    }

    pub fn sub_cursor(&mut self, length: usize) -> Result<Cursor, CodecError> {
        self.consume(length).map(|buffer| Cursor::new(buffer))
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.buffer.len()
    }

    pub fn has_more(&self) -> bool {
        !self.is_empty()
    }
}

pub trait Codec: Sized {
    fn encode(&self, _buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        unimplemented!();
    }

    fn decode(_cursor: &mut Cursor) -> Result<Self, CodecError> {
        unimplemented!();
    }

    fn encode_detached(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = vec![];
        self.encode(&mut buffer)?;
        Ok(buffer)
    }

    fn decode_detached(bytes: &[u8]) -> Result<Self, CodecError> {
        let cursor = &mut Cursor::new(bytes);
        Self::decode(cursor)
    }
}

impl Codec for u8 {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        buffer.push(*self);
        Ok(())
    }

    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        Ok(cursor.consume(1)?[0])
    }
}

impl Codec for u16 {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        buffer
            .write_u16::<BigEndian>(*self)
            .map_err(|_| CodecError::EncodingError)
    }

    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let mut bytes = cursor.consume(2)?;
        bytes
            .read_u16::<BigEndian>()
            .map_err(|_| CodecError::DecodingError)
    }
}

impl Codec for u32 {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        buffer
            .write_u32::<BigEndian>(*self)
            .map_err(|_| CodecError::EncodingError)
    }

    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let mut bytes = cursor.consume(4)?;
        bytes
            .read_u32::<BigEndian>()
            .map_err(|_| CodecError::DecodingError)
    }
}

impl<T: Codec> Codec for Option<T> {
    fn encode(&self, buffer: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            None => buffer.push(0),
            Some(value) => {
                buffer.push(1);
                value.encode(buffer)?;
            }
        }
        Ok(())
    }

    fn decode(cursor: &mut Cursor) -> Result<Self, CodecError> {
        let tag = u8::decode(cursor)?;
        match tag {
            0 => Ok(None),
            1 => Ok(Some(T::decode(cursor)?)),
            _ => Err(CodecError::DecodingError),
        }
    }
}

fn write_length(vec_size: &VecSize, buffer: &mut Vec<u8>, length: usize) -> Result<(), CodecError> {
    match vec_size {
        VecSize::VecU8 => {
            if length > 0xff {
                return Err(CodecError::EncodingError);
            }
            (length as u8).encode(buffer)
        }
        VecSize::VecU16 => {
            if length > 0xffff {
                return Err(CodecError::EncodingError);
            }
            (length as u16).encode(buffer)
        }
        VecSize::VecU24 => {
            if length > 0x00ff_ffff {
                return Err(CodecError::EncodingError);
            }
            buffer
                .write_u24::<BigEndian>(length as u32)
                .map_err(|_| CodecError::EncodingError)
        }
        VecSize::VecU32 => {
            if length > 0xffff_ffff {
                return Err(CodecError::EncodingError);
            }
            (length as u32).encode(buffer)
        }
    }
}

fn read_length(vec_size: &VecSize, cursor: &mut Cursor) -> Result<usize, CodecError> {
    match vec_size {
        VecSize::VecU8 => Ok(usize::from(u8::decode(cursor)?)),
        VecSize::VecU16 => Ok(usize::from(u16::decode(cursor)?)),
        VecSize::VecU24 => {
            let mut bytes = cursor.consume(3)?;
            let length = bytes
                .read_u24::<BigEndian>()
                .map_err(|_| CodecError::DecodingError)?;
            Ok(length as usize)
        }
        VecSize::VecU32 => Ok(u32::decode(cursor)? as usize),
    }
}

pub fn encode_vec<T: Codec>(
    vec_size: VecSize,
    bytes: &mut Vec<u8>,
    slice: &[T],
) -> Result<(), CodecError> {
    let mut buffer = Vec::new();
    for e in slice.iter() {
        e.encode(&mut buffer)?;
    }
    write_length(&vec_size, bytes, buffer.len())?;
    bytes.extend(buffer);
    Ok(())
}

pub fn decode_vec<T: Codec>(vec_size: VecSize, cursor: &mut Cursor) -> Result<Vec<T>, CodecError> {
    let length = read_length(&vec_size, cursor)?;
    let mut sub_cursor = cursor.sub_cursor(length)?;
    let mut result: Vec<T> = Vec::new();
    while sub_cursor.has_more() {
        result.push(T::decode(&mut sub_cursor)?);
    }
    Ok(result)
}

#[test]
fn test_cursor() {
    let v = vec![1, 2, 3];
    let cursor = &mut Cursor::new(&v);
    assert_eq!(cursor.consume(2).unwrap().to_vec(), vec![1, 2]);
    assert_eq!(cursor.consume(1).unwrap().to_vec(), vec![3]);
    assert!(cursor.consume(1).is_err());
}

#[test]
fn test_primitives() {
    let mut buffer = vec![];
    1u8.encode(&mut buffer).unwrap();
    assert_eq!(buffer, vec![1u8]);

    let mut buffer = vec![];
    1u16.encode(&mut buffer).unwrap();
    assert_eq!(buffer, vec![0u8, 1u8]);

    let mut buffer = vec![];
    1u32.encode(&mut buffer).unwrap();
    assert_eq!(buffer, vec![0u8, 0u8, 0u8, 1u8]);

    assert_eq!(u16::decode_detached(&[0u8, 1u8]).unwrap(), 1u16);
    assert_eq!(u32::decode_detached(&[0u8, 0u8, 0u8, 1u8]).unwrap(), 1u32);
}

#[test]
fn test_encode_vec() {
    let v: Vec<u8> = vec![1, 2, 3];
    let mut vec_u8 = vec![];
    let mut vec_u16 = vec![];
    let mut vec_u24 = vec![];
    let mut vec_u32 = vec![];
    encode_vec(VecSize::VecU8, &mut vec_u8, &v).unwrap();
    encode_vec(VecSize::VecU16, &mut vec_u16, &v).unwrap();
    encode_vec(VecSize::VecU24, &mut vec_u24, &v).unwrap();
    encode_vec(VecSize::VecU32, &mut vec_u32, &v).unwrap();
    assert_eq!(vec_u8, vec![3u8, 1u8, 2u8, 3u8]);
    assert_eq!(vec_u16, vec![0u8, 3u8, 1u8, 2u8, 3u8]);
    assert_eq!(vec_u24, vec![0u8, 0u8, 3u8, 1u8, 2u8, 3u8]);
    assert_eq!(vec_u32, vec![0u8, 0u8, 0u8, 3u8, 1u8, 2u8, 3u8]);
    assert_eq!(
        decode_vec::<u8>(VecSize::VecU8, &mut Cursor::new(&vec_u8)).unwrap(),
        v
    );
    assert_eq!(
        decode_vec::<u8>(VecSize::VecU16, &mut Cursor::new(&vec_u16)).unwrap(),
        v
    );
    assert_eq!(
        decode_vec::<u8>(VecSize::VecU24, &mut Cursor::new(&vec_u24)).unwrap(),
        v
    );
    assert_eq!(
        decode_vec::<u8>(VecSize::VecU32, &mut Cursor::new(&vec_u32)).unwrap(),
        v
    );
}

#[test]
fn test_option() {
    let value: Option<u16> = Some(7);
    let encoded = value.encode_detached().unwrap();
    assert_eq!(encoded, vec![1u8, 0u8, 7u8]);
    assert_eq!(Option::<u16>::decode_detached(&encoded).unwrap(), value);

    let blank: Option<u16> = None;
    let encoded = blank.encode_detached().unwrap();
    assert_eq!(encoded, vec![0u8]);
    assert_eq!(Option::<u16>::decode_detached(&encoded).unwrap(), blank);
}
