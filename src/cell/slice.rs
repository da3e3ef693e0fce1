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

use std::cmp;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, Range, RangeBounds};

use crate::{error, fail, cell::{BuilderData, Cell, CellType, LevelMask}, parse_slice_base};
use crate::types::{ExceptionCode, MsgAddressStd, Result, Status, UInt256};
use num::{bigint::Sign, BigInt, One};
use smallvec::SmallVec;

/// Read cursor over a sealed cell: bit window and references window.
/// Loads shrink the windows, the cell itself is never changed
#[derive(Eq, Clone)]
pub struct SliceData {
    pub(super) cell: Cell,
    data_window: Range<usize>,
    references_window: Range<usize>,
}

impl PartialOrd for SliceData {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SliceData {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match self.remaining_bits().cmp(&other.remaining_bits()) {
            cmp::Ordering::Equal => self.get_bytestring(0).cmp(&other.get_bytestring(0)),
            ordering => ordering
        }
    }
}

impl Hash for SliceData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_bytestring(0).hash(state);
        for i in self.references_window.clone() {
            if let Ok(child) = self.cell.reference(i) {
                state.write(child.repr_hash().as_slice());
            }
        }
    }
}

impl PartialEq for SliceData {
    fn eq(&self, slice: &SliceData) -> bool {
        let refs_count = self.remaining_references();
        if self.remaining_bits() != slice.remaining_bits() || refs_count != slice.remaining_references() {
            return false;
        }
        if self.get_bytestring(0) != slice.get_bytestring(0) {
            return false;
        }
        (0..refs_count).all(|i| self.reference_opt(i) == slice.reference_opt(i))
    }
}

impl Default for SliceData {
    fn default() -> Self {
        Self {
            cell: Cell::default(),
            data_window: 0..0,
            references_window: 0..0,
        }
    }
}

impl From<&Cell> for SliceData {
    fn from(cell: &Cell) -> SliceData {
        SliceData {
            cell: cell.clone(),
            references_window: 0..cell.references_count(),
            data_window: 0..cell.bit_length(),
        }
    }
}

impl From<Cell> for SliceData {
    fn from(cell: Cell) -> SliceData {
        SliceData {
            references_window: 0..cell.references_count(),
            data_window: 0..cell.bit_length(),
            cell
        }
    }
}

impl SliceData {
    pub fn new_empty() -> SliceData {
        SliceData::default()
    }

    /// Data is closed by completion tag
    pub fn new(data: Vec<u8>) -> Result<SliceData> {
        Ok(BuilderData::with_bitstring(data)?.into_cell()?.into())
    }

    pub fn from_raw(data: Vec<u8>, length_in_bits: usize) -> Result<SliceData> {
        Ok(BuilderData::with_raw(data, length_in_bits)?.into_cell()?.into())
    }

    /// Parses fift hex notation like `x{4_}` or just `4_`
    pub fn from_string(value: &str) -> Result<SliceData> {
        let value = value.trim();
        let value = value.strip_prefix("x{").and_then(|v| v.strip_suffix('}')).unwrap_or(value);
        let vec = parse_slice_base(value, 0, 16).ok_or_else(|| error!(ExceptionCode::FatalError))?;
        Ok(BuilderData::with_bitstring(vec)?.into_cell()?.into())
    }

    pub fn remaining_references(&self) -> usize {
        self.references_window.end.saturating_sub(self.references_window.start)
    }

    pub fn remaining_bits(&self) -> usize {
        self.data_window.end.saturating_sub(self.data_window.start)
    }

    fn bounds<T: RangeBounds<usize>>(range: T, len: usize) -> (usize, usize) {
        let start = match range.start_bound() {
            Bound::Included(start) => *start,
            Bound::Excluded(start) => start + 1,
            Bound::Unbounded => 0
        };
        let end = match range.end_bound() {
            Bound::Included(end) => end + 1,
            Bound::Excluded(end) => *end,
            Bound::Unbounded => len
        };
        (start, end)
    }

    /// shrinks data_window: range - subrange of current window
    pub fn shrink_data<T: RangeBounds<usize>>(&mut self, range: T) {
        let (start, end) = Self::bounds(range, self.remaining_bits());
        if start <= end && end <= self.remaining_bits() {
            self.data_window.end = self.data_window.start + end;
            self.data_window.start += start;
        }
    }

    /// shrinks references_window: range - subrange of current window
    pub fn shrink_references<T: RangeBounds<usize>>(&mut self, range: T) {
        let (start, end) = Self::bounds(range, self.remaining_references());
        if start <= end && end <= self.remaining_references() {
            self.references_window.end = self.references_window.start + end;
            self.references_window.start += start;
        }
    }

    pub fn reference(&self, i: usize) -> Result<Cell> {
        self.reference_opt(i).ok_or_else(|| error!(ExceptionCode::CellUnderflow))
    }

    pub fn reference_opt(&self, i: usize) -> Option<Cell> {
        if self.references_window.start + i < self.references_window.end {
            self.cell.reference(self.references_window.start + i).ok()
        } else {
            None
        }
    }

    /// returns internal cell regardless window settings
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn is_full_cell_slice(&self) -> bool {
        self.data_window.start == 0 &&
        self.data_window.end == self.cell.bit_length() &&
        self.references_window.start == 0 &&
        self.references_window.end == self.cell.references_count()
    }

    /// constructs new cell trunking original regarding window settings
    pub fn into_cell(self) -> Result<Cell> {
        if self.is_full_cell_slice() {
            Ok(self.cell)
        } else {
            BuilderData::from_slice(&self)?.into_cell()
        }
    }

    pub fn checked_drain_reference(&mut self) -> Result<Cell> {
        let cell = self.reference(0)?;
        self.references_window.start += 1;
        Ok(cell)
    }

    /// Returns subslice of current slice without references
    pub fn get_slice(&self, offset: usize, size: usize) -> Result<SliceData> {
        if offset + size > self.remaining_bits() {
            fail!(ExceptionCode::CellUnderflow)
        }
        let mut slice = self.clone();
        slice.shrink_data(offset..offset + size);
        slice.shrink_references(..0);
        Ok(slice)
    }

    // reads up to 8 bits from absolute position, bounds are checked by callers
    fn raw_bits(&self, index: usize, bits: usize) -> u8 {
        let data = self.cell.data();
        let q = index / 8;
        let r = index % 8;
        let hi = (data.get(q).copied().unwrap_or_default() as u16) << 8;
        let lo = data.get(q + 1).copied().unwrap_or_default() as u16;
        (((hi | lo) >> (16 - r - bits)) & ((1u16 << bits) - 1)) as u8
    }

    pub fn get_bit_opt(&self, offset: usize) -> Option<bool> {
        if offset >= self.remaining_bits() {
            None
        } else {
            Some(self.raw_bits(self.data_window.start + offset, 1) != 0)
        }
    }

    pub fn get_bit(&self, offset: usize) -> Result<bool> {
        self.get_bit_opt(offset).ok_or_else(|| error!(ExceptionCode::CellUnderflow))
    }

    /// Returns up to 8 bits as lower bits of byte
    pub fn get_bits(&self, offset: usize, bits: usize) -> Result<u8> {
        if offset + bits > self.remaining_bits() {
            fail!(ExceptionCode::CellUnderflow)
        }
        if bits == 0 || bits > 8 {
            fail!(ExceptionCode::RangeCheckError)
        }
        Ok(self.raw_bits(self.data_window.start + offset, bits))
    }

    pub fn get_byte(&self, offset: usize) -> Result<u8> {
        self.get_bits(offset, 8)
    }

    /// Remaining bits from offset as bytes, last byte is padded by zeros
    pub fn get_bytestring(&self, offset: usize) -> Vec<u8> {
        let start = self.data_window.start + offset;
        let end = self.data_window.end;
        let mut ret = Vec::with_capacity((end.saturating_sub(start) + 7) / 8);
        let mut index = start;
        while index + 8 <= end {
            ret.push(self.raw_bits(index, 8));
            index += 8;
        }
        if index < end {
            let remainder = end - index;
            ret.push(self.raw_bits(index, remainder) << (8 - remainder));
        }
        ret
    }

    pub fn move_by(&mut self, offset: usize) -> Result<()> {
        if self.data_window.start + offset <= self.data_window.end {
            self.data_window.start += offset;
            Ok(())
        } else {
            fail!(ExceptionCode::CellUnderflow)
        }
    }

    pub fn pos(&self) -> usize {
        self.data_window.start
    }

    pub fn is_empty(&self) -> bool {
        self.data_window.start >= self.data_window.end
    }

    /// Reads bits as bytes padded by zeros and moves pointer
    pub fn get_next_bits(&mut self, bits: usize) -> Result<Vec<u8>> {
        if bits > self.remaining_bits() {
            fail!(ExceptionCode::CellUnderflow)
        }
        let mut vec = self.get_bytestring(0);
        vec.truncate((bits + 7) / 8);
        if bits % 8 != 0 {
            if let Some(last) = vec.last_mut() {
                *last &= 0xFFu8 << (8 - bits % 8);
            }
        }
        self.move_by(bits)?;
        Ok(vec)
    }

    pub fn get_next_bit(&mut self) -> Result<bool> {
        let bit = self.get_bit(0)?;
        self.move_by(1)?;
        Ok(bit)
    }

    pub fn get_next_byte(&mut self) -> Result<u8> {
        let value = self.get_byte(0)?;
        self.move_by(8)?;
        Ok(value)
    }

    pub fn get_next_int(&mut self, bits: usize) -> Result<u64> {
        let value = self.preload_int(bits)?;
        self.move_by(bits)?;
        Ok(value)
    }

    /// Reads integer of `bits` (at most 64) without moving pointer
    pub fn preload_int(&self, bits: usize) -> Result<u64> {
        if bits > 64 {
            fail!("too many bits {} > 64", bits)
        }
        if bits > self.remaining_bits() {
            fail!(ExceptionCode::CellUnderflow)
        }
        let mut value = 0u64;
        let mut read = 0;
        while read < bits {
            let chunk = cmp::min(8, bits - read);
            value = (value << chunk) | self.raw_bits(self.data_window.start + read, chunk) as u64;
            read += chunk;
        }
        Ok(value)
    }

    /// Reads number of `bitlen(max_value)` bits
    pub fn get_next_size(&mut self, max_value: usize) -> Result<u64> {
        if max_value == 0 {
            return Ok(0);
        }
        let bits = 16 - (max_value as u16).leading_zeros() as usize;
        self.get_next_int(bits)
    }

    pub fn get_next_u16(&mut self) -> Result<u16> {
        self.get_next_int(16).map(|value| value as u16)
    }

    pub fn get_next_u32(&mut self) -> Result<u32> {
        self.get_next_int(32).map(|value| value as u32)
    }

    pub fn get_next_u64(&mut self) -> Result<u64> {
        self.get_next_int(64)
    }

    pub fn get_next_i8(&mut self) -> Result<i8> {
        self.get_next_int(8).map(|value| value as u8 as i8)
    }

    pub fn get_next_i32(&mut self) -> Result<i32> {
        self.get_next_int(32).map(|value| value as u32 as i32)
    }

    pub fn get_next_hash(&mut self) -> Result<UInt256> {
        let bytes = self.get_next_bytes(32)?;
        UInt256::from_slice_exact(&bytes)
    }

    pub fn get_next_bytes(&mut self, bytes: usize) -> Result<Vec<u8>> {
        self.get_next_bits(bytes * 8)
    }

    /// Returns subslice of current slice and moves pointer
    pub fn get_next_slice(&mut self, size: usize) -> Result<SliceData> {
        let slice = self.get_slice(0, size)?;
        self.move_by(size)?;
        Ok(slice)
    }

    pub fn skip_bits(&mut self, bits: usize) -> Status {
        self.move_by(bits)
    }

    pub fn skip_refs(&mut self, count: usize) -> Status {
        if count > self.remaining_references() {
            fail!(ExceptionCode::CellUnderflow)
        }
        self.references_window.start += count;
        Ok(())
    }

    pub fn load_refs(&mut self, count: usize) -> Result<Vec<Cell>> {
        if count > self.remaining_references() {
            fail!(ExceptionCode::CellUnderflow)
        }
        (0..count).map(|_| self.checked_drain_reference()).collect()
    }

    pub fn preload_uint(&self, bits: usize) -> Result<BigInt> {
        if bits > self.remaining_bits() {
            fail!(ExceptionCode::CellUnderflow)
        }
        if bits == 0 {
            return Ok(BigInt::default())
        }
        let mut bytes = self.get_bytestring(0);
        bytes.truncate((bits + 7) / 8);
        let value = BigInt::from_bytes_be(Sign::Plus, &bytes);
        Ok(value >> (bytes.len() * 8 - bits))
    }

    /// Reads unsigned integer of any size
    pub fn load_uint(&mut self, bits: usize) -> Result<BigInt> {
        let value = self.preload_uint(bits)?;
        self.move_by(bits)?;
        Ok(value)
    }

    /// Reads signed integer of any size in two's complement form
    pub fn load_int(&mut self, bits: usize) -> Result<BigInt> {
        let value = self.load_uint(bits)?;
        if bits != 0 && value >= BigInt::one() << (bits - 1) {
            Ok(value - (BigInt::one() << bits))
        } else {
            Ok(value)
        }
    }

    /// `var_uint$_ {n:#} len:(#< n) value:(uint (len * 8)) = VarUInteger n`
    pub fn load_var_uint(&mut self, max_len: usize) -> Result<BigInt> {
        if max_len == 0 {
            fail!(ExceptionCode::RangeCheckError)
        }
        let len_bits = (usize::BITS - (max_len - 1).leading_zeros()) as usize;
        let len = self.get_next_int(len_bits)? as usize;
        self.load_uint(len * 8)
    }

    pub fn load_coins(&mut self) -> Result<BigInt> {
        self.load_var_uint(crate::cell::MAX_COINS_LEN)
    }

    /// `#<= n` encoded in `bitlen(n)` bits
    pub fn load_uint_leq(&mut self, n: u64) -> Result<u64> {
        let bits = (u64::BITS - n.leading_zeros()) as usize;
        let value = self.get_next_int(bits)?;
        if value > n {
            fail!(ExceptionCode::RangeCheckError)
        }
        Ok(value)
    }

    /// `#< n` encoded in `bitlen(n - 1)` bits
    pub fn load_uint_less(&mut self, n: u64) -> Result<u64> {
        if n == 0 {
            fail!(ExceptionCode::RangeCheckError)
        }
        self.load_uint_leq(n - 1)
    }

    /// `unary_zero$0`, `unary_succ$1`
    pub fn load_unary(&mut self) -> Result<usize> {
        let mut value = 0;
        while self.get_next_bit()? {
            value += 1;
        }
        Ok(value)
    }

    /// `Maybe ^Cell`
    pub fn load_maybe_ref(&mut self) -> Result<Option<Cell>> {
        if self.get_next_bit()? {
            Ok(Some(self.checked_drain_reference()?))
        } else {
            Ok(None)
        }
    }

    /// `addr_none$00` gives None, `addr_std$10` gives address, anycast is skipped
    pub fn load_address(&mut self) -> Result<Option<MsgAddressStd>> {
        if self.get_bits(0, 2)? == 0 {
            self.move_by(2)?;
            return Ok(None)
        }
        self.move_by(2 + 1)?;
        let workchain_id = self.get_next_i8()?;
        let address = self.get_next_hash()?;
        Ok(Some(MsgAddressStd::with_address(workchain_id, address)))
    }

    /// Concatenates bytes of the cell chain linked by single references.
    /// Any failure including more than one reference gives None and leaves the slice intact
    pub fn load_snake_string(&mut self) -> Option<Vec<u8>> {
        let mut result = Vec::new();
        let mut current = self.clone();
        loop {
            let bits = current.remaining_bits();
            result.extend(current.get_next_bits(bits).ok()?);
            match current.remaining_references() {
                0 => break,
                1 => current = SliceData::from(current.checked_drain_reference().ok()?),
                _ => return None
            }
        }
        *self = current;
        Some(result)
    }

    /// Fails if some data bits are not consumed
    pub fn end_parse(&self) -> Status {
        if self.remaining_bits() != 0 {
            fail!(ExceptionCode::ParseIncomplete)
        }
        Ok(())
    }

    /// returns false if prefix is not fully in self
    pub fn erase_prefix(&mut self, prefix: &SliceData) -> bool {
        if self.remaining_bits() < prefix.remaining_bits() {
            return false
        }
        if prefix.is_empty() {
            return true
        }
        match SliceData::common_prefix(self, prefix) {
            (_, _, Some(_)) => false,
            (_, remainder, None) => {
                match remainder {
                    Some(remainder) => *self = remainder,
                    None => self.shrink_data(0..0),
                }
                true
            }
        }
    }

    /// Splits two slices to common prefix and remainders
    pub fn common_prefix(a: &SliceData, b: &SliceData) -> (Option<SliceData>, Option<SliceData>, Option<SliceData>) {
        let max_len = cmp::min(a.remaining_bits(), b.remaining_bits());
        let mut offset = 0;
        while offset < max_len {
            let chunk = cmp::min(8, max_len - offset);
            let a_bits = a.raw_bits(a.data_window.start + offset, chunk);
            let b_bits = b.raw_bits(b.data_window.start + offset, chunk);
            if a_bits != b_bits {
                let diff = (a_bits ^ b_bits).leading_zeros() as usize - (8 - chunk);
                offset += diff;
                break
            }
            offset += chunk;
        }
        let mut prefix = a.clone();
        prefix.shrink_data(..offset);
        prefix.shrink_references(0..0);
        let mut rem_a = a.clone();
        rem_a.shrink_data(offset..);
        let mut rem_b = b.clone();
        rem_b.shrink_data(offset..);
        (
            if prefix.remaining_bits() > 0 { Some(prefix) } else { None },
            if rem_a.remaining_bits() > 0 { Some(rem_a) } else { None },
            if rem_b.remaining_bits() > 0 { Some(rem_b) } else { None },
        )
    }

    pub fn cell_type(&self) -> CellType {
        self.cell.cell_type()
    }
    pub fn level_mask(&self) -> LevelMask {
        self.cell.level_mask()
    }

    pub fn as_hex_string(&self) -> String {
        let len = self.remaining_bits();
        let mut data: SmallVec<[u8; 128]> = self.get_bytestring(0).into();
        super::append_tag(&mut data, len);
        super::to_hex_string(data.as_slice(), len, false)
    }
}

impl fmt::Debug for SliceData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{{{}}}", self.as_hex_string())
    }
}

impl fmt::Display for SliceData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "data: {}..{}, references: {}..{}, x{{{}}}",
            self.data_window.start,
            self.data_window.end,
            self.references_window.start,
            self.references_window.end,
            self.as_hex_string()
        )
    }
}

#[cfg(test)]
#[path = "tests/test_slice.rs"]
mod tests;
