/*
* Copyright (C) 2019-2023 EverX. All Rights Reserved.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific EVERX DEV software governing permissions and
* limitations under the License.
*/

use crate::cell::SliceData;
use num::FromPrimitive;
use sha2::Digest;
use std::{fmt, fmt::{LowerHex, UpperHex}, cmp, str, convert::TryInto};

pub type Result<T> = std::result::Result<T, failure::Error>;
pub type Status = Result<()>;

#[macro_export]
macro_rules! error {
    ($error:literal) => {
        failure::err_msg(format!("{} {}:{}", $error, file!(), line!()))
    };
    ($error:expr) => {
        failure::Error::from($error)
    };
    ($fmt:expr, $($arg:tt)+) => {
        failure::err_msg(format!("{} {}:{}", format!($fmt, $($arg)*), file!(), line!()))
    };
}

#[macro_export]
macro_rules! fail {
    ($error:literal) => {
        return Err(failure::err_msg(format!("{} {}:{}", $error, file!(), line!())))
    };
    ($error:expr) => {
        return Err($crate::error!($error))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err(failure::err_msg(format!("{} {}:{}", format!($fmt, $($arg)*), file!(), line!())))
    };
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct UInt256([u8; 32]);

impl PartialEq<SliceData> for UInt256 {
    fn eq(&self, other: &SliceData) -> bool {
        if other.remaining_bits() == 256 {
            return self.0 == other.get_bytestring(0).as_slice()
        }
        false
    }
}

impl PartialEq<&UInt256> for UInt256 {
    fn eq(&self, other: &&UInt256) -> bool {
        self.0 == other.0
    }
}

impl UInt256 {

    pub const fn new() -> Self {
        Self::ZERO
    }
    pub const fn with_array(data: [u8; 32]) -> Self {
        Self(data)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub const fn as_slice(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn as_array(&self) -> &[u8; 32] {
        &self.0
    }

    // Returns solid string like this: a80b23bfe4d301497f3ce11e753f23e8dec32368945ee279d044dbc1f91ace2a
    pub fn to_hex_string(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses 64 hex digits or 44 base64 characters
    pub fn from_str(value: &str) -> Result<Self> {
        let bytes = match value.len() {
            64 => hex::decode(value)?,
            44 => base64::decode(value)?,
            _ => fail!("invalid hash string length {} (64 expected)", value.len())
        };
        Self::from_slice_exact(&bytes)
    }

    pub fn from_slice_exact(value: &[u8]) -> Result<Self> {
        match value.try_into() {
            Ok(hash) => Ok(Self(hash)),
            Err(_) => fail!("32 bytes expected, got {}", value.len())
        }
    }

    pub fn calc_file_hash(bytes: &[u8]) -> Self {
        let hash: [u8; 32] = sha2::Sha256::digest(bytes).into();
        Self(hash)
    }

    pub fn from_be_bytes(value: &[u8]) -> Self {
        let mut data = [0; 32];
        let len = cmp::min(value.len(), 32);
        let offset = 32 - len;
        data[offset..].copy_from_slice(&value[..len]);
        Self(data)
    }

    pub fn rand() -> Self {
        Self(rand::random::<[u8; 32]>())
    }

    pub const ZERO: UInt256 = UInt256([0; 32]);
    pub const MAX: UInt256 = UInt256([0xFF; 32]);
    // hash of default cell 0x96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7;
    pub const DEFAULT_CELL_HASH: UInt256 = UInt256([150, 162, 150, 210, 36, 242, 133, 198, 123, 238, 147,
        195, 15, 138, 48, 145, 87, 240, 218, 163, 93, 197, 184, 126, 65, 11, 120, 99, 10, 9, 207, 199]);
}

impl From<[u8; 32]> for UInt256 {
    fn from(data: [u8; 32]) -> Self {
        UInt256(data)
    }
}

impl From<UInt256> for [u8; 32] {
    fn from(value: UInt256) -> Self {
        value.0
    }
}

impl str::FromStr for UInt256 {
    type Err = failure::Error;
    fn from_str(value: &str) -> Result<Self> {
        UInt256::from_str(value)
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        LowerHex::fmt(self, f)
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl LowerHex for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", hex::encode(self.0))
    }
}

impl UpperHex for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl AsRef<[u8]> for UInt256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Standard internal address: workchain and 256-bit account id
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgAddressStd {
    pub workchain_id: i8,
    pub address: UInt256,
}

impl MsgAddressStd {
    pub const fn with_address(workchain_id: i8, address: UInt256) -> Self {
        Self { workchain_id, address }
    }
}

impl fmt::Display for MsgAddressStd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{:x}", self.workchain_id, self.address)
    }
}

impl str::FromStr for MsgAddressStd {
    type Err = failure::Error;
    fn from_str(value: &str) -> Result<Self> {
        let mut parts = value.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(wc), Some(address), None) => {
                let workchain_id = wc.parse::<i8>()
                    .map_err(|err| error!("wrong workchain id {}: {}", wc, err))?;
                let address = UInt256::from_str(address)?;
                Ok(Self { workchain_id, address })
            }
            _ => fail!("wrong address format {}, expected workchain:hex", value)
        }
    }
}

// Exceptions *****************************************************************

#[derive(Clone, Copy, Debug, num_derive::FromPrimitive, PartialEq, Eq, failure::Fail)]
pub enum ExceptionCode {
    #[fail(display = "format error")]
    FormatError = 1,
    #[fail(display = "range check error")]
    RangeCheckError = 5,
    #[fail(display = "cell overflow")]
    CellOverflow = 8,
    #[fail(display = "cell underflow")]
    CellUnderflow = 9,
    #[fail(display = "dictionary error")]
    DictionaryError = 10,
    #[fail(display = "parse incomplete")]
    ParseIncomplete = 11,
    #[fail(display = "fatal error")]
    FatalError = 12,
}

impl ExceptionCode {
    pub fn from_usize(number: usize) -> Option<ExceptionCode> {
        FromPrimitive::from_usize(number)
    }
}

/// Malformed or unsupported bag of cells
#[derive(Clone, Debug, PartialEq, Eq, failure::Fail)]
pub enum BocError {
    #[fail(display = "wrong boc magic {:08X}", _0)]
    WrongMagic(u32),
    #[fail(display = "wrong boc flags {:08b}: {}", _0, _1)]
    WrongFlags(u8, &'static str),
    #[fail(display = "wrong reference size {}", _0)]
    WrongRefSize(usize),
    #[fail(display = "wrong offset size {}", _0)]
    WrongOffsetSize(usize),
    #[fail(display = "roots count {} exceeds cells count {}", roots, cells)]
    TooManyRoots { roots: usize, cells: usize },
    #[fail(display = "root #{} repeats an earlier root", _0)]
    DuplicateRoot(usize),
    #[fail(display = "absent cells are not supported, got {}", _0)]
    AbsentCells(usize),
    #[fail(display = "root index {} is out of {} cells", index, cells)]
    InvalidRootIndex { index: usize, cells: usize },
    #[fail(display = "crc mismatch: calculated {:08X}, stored {:08X}", calculated, stored)]
    WrongCrc { calculated: u32, stored: u32 },
    #[fail(display = "unexpected end of data while reading {}", _0)]
    UnexpectedEof(&'static str),
    #[fail(display = "cell #{} has {} references", index, refs)]
    TooManyRefs { index: usize, refs: usize },
    #[fail(display = "cell #{} refers to #{} out of {} cells", index, reference, cells)]
    InvalidRefIndex { index: usize, reference: usize, cells: usize },
    #[fail(display = "malicious data: {} cells can not fit into {} bytes", cells, size)]
    MaliciousCellCount { cells: usize, size: usize },
    #[fail(display = "cell #{} refers to previous cell #{} without index", index, reference)]
    NotTopologicalOrder { index: usize, reference: usize },
    #[fail(display = "cells graph contains a cycle through cell #{}", _0)]
    CyclicReference(usize),
    #[fail(display = "cells order did not converge after {} passes", _0)]
    ReorderNotConverged(usize),
    #[fail(display = "cells data size {} mismatches declared {}", real, declared)]
    WrongDataSize { real: usize, declared: usize },
    #[fail(display = "corrupted cell #{}: {}", _0, _1)]
    CorruptedCell(usize, &'static str),
}

pub trait ByteOrderRead {
    fn read_be_uint(&mut self, bytes: usize) -> std::io::Result<usize>;
    fn read_byte(&mut self) -> std::io::Result<u8>;
    fn read_be_u32(&mut self) -> std::io::Result<u32>;
    fn read_le_u32(&mut self) -> std::io::Result<u32>;
}

impl<T: std::io::Read> ByteOrderRead for T {
    fn read_be_uint(&mut self, bytes: usize) -> std::io::Result<usize> {
        match bytes {
            1 => {
                let mut buf = [0];
                self.read_exact(&mut buf)?;
                Ok(buf[0] as usize)
            }
            2 => {
                let mut buf = [0; 2];
                self.read_exact(&mut buf)?;
                Ok(u16::from_be_bytes(buf) as usize)
            }
            3..=4 => {
                let mut buf = [0; 4];
                self.read_exact(&mut buf[4 - bytes..])?;
                Ok(u32::from_be_bytes(buf) as usize)
            },
            5..=8 => {
                let mut buf = [0; 8];
                self.read_exact(&mut buf[8 - bytes..])?;
                Ok(u64::from_be_bytes(buf) as usize)
            },
            _ => Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many bytes to read in usize")),
        }
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        self.read_be_uint(1).map(|value| value as u8)
    }

    fn read_be_u32(&mut self) -> std::io::Result<u32> {
        self.read_be_uint(4).map(|value| value as u32)
    }

    fn read_le_u32(&mut self) -> std::io::Result<u32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

#[cfg(test)]
#[path = "tests/test_types.rs"]
mod tests;
