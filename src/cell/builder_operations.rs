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

use crate::fail;
use crate::cell::{BuilderData, Cell, find_tag, MAX_REFERENCES_COUNT, SliceData};
use crate::types::{ExceptionCode, MsgAddressStd, Result};
use num::{bigint::Sign, BigInt, One, Zero};

// first cell of snake string keeps room for a 32-bit prefix
const SNAKE_HEAD_BYTES: usize = 123;
const SNAKE_TAIL_BYTES: usize = 127;
pub const MAX_COINS_LEN: usize = 16;

impl BuilderData {
    /// maximum number of references
    pub fn references_capacity() -> usize {
        MAX_REFERENCES_COUNT
    }
    /// used number of references
    pub fn references_used(&self) -> usize {
        self.references().len()
    }
    /// free number of references
    pub fn references_free(&self) -> usize {
        MAX_REFERENCES_COUNT - self.references().len()
    }
    /// maximum number of bits
    pub fn bits_capacity(&self) -> usize {
        self.capacity()
    }
    /// used number of bits
    pub fn bits_used(&self) -> usize {
        self.length_in_bits()
    }
    /// free number of bits
    pub fn bits_free(&self) -> usize {
        self.capacity().saturating_sub(self.bits_used())
    }

    pub fn check_enough_refs(&self, count: usize) -> bool {
        self.references().len() + count <= MAX_REFERENCES_COUNT
    }

    pub fn check_enough_space(&self, size: usize) -> bool {
        self.length_in_bits() + size <= self.capacity()
    }

    pub fn checked_append_references_and_data(&mut self, other: &SliceData) -> Result<&mut Self> {
        if self.bits_free() < other.remaining_bits() || self.references_free() < other.remaining_references() {
            fail!(ExceptionCode::CellOverflow)
        }
        self.append_raw(other.get_bytestring(0).as_slice(), other.remaining_bits())?;
        for i in 0..other.remaining_references() {
            self.checked_append_reference(other.reference(i)?)?;
        }
        Ok(self)
    }

    /// Stores unsigned integer in exactly `bits` bits
    pub fn store_uint(&mut self, value: &BigInt, bits: usize) -> Result<&mut Self> {
        if value.sign() == Sign::Minus || value.bits() as usize > bits {
            fail!(ExceptionCode::RangeCheckError)
        }
        if !self.check_enough_space(bits) {
            fail!(ExceptionCode::CellOverflow)
        }
        if bits == 0 {
            return Ok(self)
        }
        let bytes = (bits + 7) / 8;
        let aligned: BigInt = value << (bytes * 8 - bits);
        let (_, magnitude) = aligned.to_bytes_be();
        let mut buffer = vec![0u8; bytes];
        buffer[bytes - magnitude.len()..].copy_from_slice(&magnitude);
        self.append_raw(&buffer, bits)
    }

    /// Stores signed integer in two's complement form,
    /// value must fit into `[-2^(bits-1), 2^(bits-1))`
    pub fn store_int(&mut self, value: &BigInt, bits: usize) -> Result<&mut Self> {
        if bits == 0 {
            if value.is_zero() {
                return Ok(self)
            }
            fail!(ExceptionCode::RangeCheckError)
        }
        let bound = BigInt::one() << (bits - 1);
        if *value >= bound || *value < -&bound {
            fail!(ExceptionCode::RangeCheckError)
        }
        if value.sign() == Sign::Minus {
            let complement = (BigInt::one() << bits) + value;
            self.store_uint(&complement, bits)
        } else {
            self.store_uint(value, bits)
        }
    }

    /// VarUInteger n: length in bytes of `bitlen(n - 1)` bits then the value
    pub fn store_var_uint(&mut self, value: &BigInt, max_len: usize) -> Result<&mut Self> {
        if max_len == 0 {
            fail!(ExceptionCode::RangeCheckError)
        }
        if value.sign() == Sign::Minus {
            fail!(ExceptionCode::RangeCheckError)
        }
        let len = (value.bits() as usize + 7) / 8;
        if len >= max_len {
            fail!(ExceptionCode::RangeCheckError)
        }
        let len_bits = (usize::BITS - (max_len - 1).leading_zeros()) as usize;
        if !self.check_enough_space(len_bits + len * 8) {
            fail!(ExceptionCode::CellOverflow)
        }
        self.store_uint(&BigInt::from(len), len_bits)?;
        self.store_uint(value, len * 8)
    }

    pub fn store_coins(&mut self, value: &BigInt) -> Result<&mut Self> {
        self.store_var_uint(value, MAX_COINS_LEN)
    }

    /// `addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256`
    /// or `addr_none$00` for absent address
    pub fn store_address(&mut self, address: Option<&MsgAddressStd>) -> Result<&mut Self> {
        match address {
            None => {
                self.append_bits(0b00, 2)?;
            }
            Some(address) => {
                if !self.check_enough_space(2 + 1 + 8 + 256) {
                    fail!(ExceptionCode::CellOverflow)
                }
                self.append_bits(0b100, 3)?;
                self.append_i8(address.workchain_id)?;
                self.append_raw(address.address.as_slice(), 256)?;
            }
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self> {
        self.checked_append_reference(cell)
    }

    pub fn store_refs<I: IntoIterator<Item = Cell>>(&mut self, cells: I) -> Result<&mut Self> {
        for cell in cells {
            self.checked_append_reference(cell)?;
        }
        Ok(self)
    }

    /// `Maybe ^Cell`
    pub fn store_ref_maybe(&mut self, cell: Option<Cell>) -> Result<&mut Self> {
        match cell {
            Some(cell) => {
                if !self.check_enough_space(1) || !self.check_enough_refs(1) {
                    fail!(ExceptionCode::CellOverflow)
                }
                self.append_bit_one()?;
                self.checked_append_reference(cell)
            }
            None => self.append_bit_zero()
        }
    }

    /// Stores dictionary root as `Maybe ^Cell`, same as `HashmapE` serialization
    pub fn store_dict(&mut self, root: Option<Cell>) -> Result<&mut Self> {
        self.store_ref_maybe(root)
    }

    /// Stores serialized dictionary or any other structure inline
    pub fn store_dict_in_line(&mut self, dict: &SliceData) -> Result<&mut Self> {
        self.checked_append_references_and_data(dict)
    }

    /// Splits bytes into the chain of cells: current builder gets at most 123 bytes,
    /// every next cell at most 127 bytes in its single reference
    pub fn store_snake_string(&mut self, data: &[u8]) -> Result<&mut Self> {
        let head_len = data.len().min(SNAKE_HEAD_BYTES);
        let (head, mut rest) = data.split_at(head_len);
        let mut chunks = vec![];
        while !rest.is_empty() {
            let len = rest.len().min(SNAKE_TAIL_BYTES);
            chunks.push(&rest[..len]);
            rest = &rest[len..];
        }
        let mut tail: Option<Cell> = None;
        for chunk in chunks.into_iter().rev() {
            let mut builder = BuilderData::with_raw(chunk, chunk.len() * 8)?;
            if let Some(next) = tail.take() {
                builder.checked_append_reference(next)?;
            }
            tail = Some(builder.into_cell()?);
        }
        if !self.check_enough_space(head.len() * 8) || (tail.is_some() && !self.check_enough_refs(1)) {
            fail!(ExceptionCode::CellOverflow)
        }
        self.append_raw(head, head.len() * 8)?;
        if let Some(next) = tail {
            self.checked_append_reference(next)?;
        }
        Ok(self)
    }
}

pub trait IBitstring {
    fn prepend_builder(&mut self, data: &BuilderData) -> Result<&mut Self>;
    fn append_builder(&mut self, data: &BuilderData) -> Result<&mut Self>;
    fn append_bitstring(&mut self, data: &[u8]) -> Result<&mut Self>;
    fn append_bytestring(&mut self, data: &SliceData) -> Result<&mut Self>;
    fn append_bit_zero(&mut self) -> Result<&mut Self>;
    fn append_bit_one(&mut self) -> Result<&mut Self>;
    fn append_bit_bool(&mut self, bit: bool) -> Result<&mut Self>;
    fn append_bits(&mut self, value: usize, bits: usize) -> Result<&mut Self>;
    fn append_u8(&mut self, value: u8) -> Result<&mut Self>;
    fn append_u16(&mut self, value: u16) -> Result<&mut Self>;
    fn append_u32(&mut self, value: u32) -> Result<&mut Self>;
    fn append_u64(&mut self, value: u64) -> Result<&mut Self>;
    fn append_u128(&mut self, value: u128) -> Result<&mut Self>;
    fn append_i8(&mut self, value: i8) -> Result<&mut Self>;
    fn append_i16(&mut self, value: i16) -> Result<&mut Self>;
    fn append_i32(&mut self, value: i32) -> Result<&mut Self>;
    fn append_i64(&mut self, value: i64) -> Result<&mut Self>;
    fn append_i128(&mut self, value: i128) -> Result<&mut Self>;
}

impl IBitstring for BuilderData {
    fn prepend_builder(&mut self, data: &BuilderData) -> Result<&mut Self> {
        if !self.can_append(data) {
            fail!(ExceptionCode::CellOverflow)
        }
        let mut buffer = data.clone();
        buffer.append_raw(self.data(), self.length_in_bits())?;
        for child in self.references() {
            buffer.checked_append_reference(child.clone())?;
        }
        buffer.set_type(self.cell_type());
        *self = buffer;
        Ok(self)
    }
    fn append_builder(&mut self, data: &BuilderData) -> Result<&mut Self> {
        if !self.can_append(data) {
            fail!(ExceptionCode::CellOverflow)
        }
        self.append_raw(data.data(), data.length_in_bits())?;
        for child in data.references() {
            self.checked_append_reference(child.clone())?;
        }
        Ok(self)
    }
    fn append_bitstring(&mut self, data: &[u8]) -> Result<&mut Self> {
        let length_in_bits = find_tag(data);
        self.append_raw(data, length_in_bits)
    }
    fn append_bytestring(&mut self, data: &SliceData) -> Result<&mut Self> {
        self.append_raw(&data.get_bytestring(0), data.remaining_bits())
    }
    fn append_bit_zero(&mut self) -> Result<&mut Self> {
        self.append_raw(&[0x00], 1)
    }
    fn append_bit_one(&mut self) -> Result<&mut Self> {
        self.append_raw(&[0xFF], 1)
    }
    fn append_bit_bool(&mut self, bit: bool) -> Result<&mut Self> {
        self.append_raw(&[if bit { 0xFF } else { 0x00 }], 1)
    }
    fn append_bits(&mut self, value: usize, bits: usize) -> Result<&mut Self> {
        match bits {
            0 => Ok(self),
            1..=64 => self.append_raw(&((value as u64) << (64 - bits)).to_be_bytes(), bits),
            bits => fail!("bits: {}", bits)
        }
    }
    fn append_u8(&mut self, value: u8) -> Result<&mut Self> {
        self.append_raw(&[value], 8)
    }
    fn append_u16(&mut self, value: u16) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 16)
    }
    fn append_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 32)
    }
    fn append_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 64)
    }
    fn append_u128(&mut self, value: u128) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 128)
    }
    fn append_i8(&mut self, value: i8) -> Result<&mut Self> {
        self.append_raw(&[value as u8], 8)
    }
    fn append_i16(&mut self, value: i16) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 16)
    }
    fn append_i32(&mut self, value: i32) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 32)
    }
    fn append_i64(&mut self, value: i64) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 64)
    }
    fn append_i128(&mut self, value: i128) -> Result<&mut Self> {
        self.append_raw(&value.to_be_bytes(), 128)
    }
}

#[cfg(test)]
#[path = "tests/test_builder.rs"]
mod tests;
