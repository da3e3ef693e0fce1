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

use std::fmt;

use crate::fail;
use crate::cell::{
    append_tag, Cell, CellType, DataCell, find_tag, SliceData, MAX_DATA_BITS, MAX_REFERENCES_COUNT
};
use crate::types::{ExceptionCode, Result};
use smallvec::SmallVec;

/// Mutable accumulator of a cell. Nothing is hashed until `into_cell` seals it,
/// so builders may be freely composed with `append_builder` before that
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct BuilderData {
    data: SmallVec<[u8; 128]>,
    length_in_bits: usize,
    references: SmallVec<[Cell; 4]>,
    cell_type: CellType,
    bits_capacity: usize,
}

impl Default for BuilderData {
    fn default() -> Self {
        BuilderData::new()
    }
}

impl BuilderData {
    pub const fn new() -> Self {
        BuilderData {
            data: SmallVec::new_const(),
            length_in_bits: 0,
            references: SmallVec::new_const(),
            cell_type: CellType::Ordinary,
            bits_capacity: MAX_DATA_BITS,
        }
    }

    /// Builder with custom bit capacity. It limits writes only,
    /// sealing into cell still requires at most 1023 bits
    pub fn with_bit_capacity(bits_capacity: usize) -> Self {
        let mut builder = Self::new();
        builder.bits_capacity = bits_capacity;
        builder
    }

    pub fn with_raw(data: impl AsRef<[u8]>, length_in_bits: usize) -> Result<BuilderData> {
        let mut builder = BuilderData::new();
        builder.append_raw(data.as_ref(), length_in_bits)?;
        Ok(builder)
    }

    pub fn with_raw_and_refs<TRefs>(data: impl AsRef<[u8]>, length_in_bits: usize, refs: TRefs) -> Result<BuilderData>
    where
        TRefs: IntoIterator<Item = Cell>
    {
        let mut builder = BuilderData::with_raw(data, length_in_bits)?;
        for value in refs {
            builder.checked_append_reference(value)?;
        }
        Ok(builder)
    }

    /// Data is closed by completion tag
    pub fn with_bitstring(data: impl AsRef<[u8]>) -> Result<BuilderData> {
        let data = data.as_ref();
        BuilderData::with_raw(data, find_tag(data))
    }

    /// Copies data, references and type of the cell
    pub fn from_cell(cell: &Cell) -> Result<BuilderData> {
        let mut builder = BuilderData::with_raw(cell.data(), cell.bit_length())?;
        builder.references = cell.clone_references();
        builder.cell_type = cell.cell_type();
        Ok(builder)
    }

    /// Copies remaining data and references of the slice
    pub fn from_slice(slice: &SliceData) -> Result<BuilderData> {
        let mut builder = BuilderData::with_raw(slice.get_bytestring(0), slice.remaining_bits())?;
        for i in 0..slice.remaining_references() {
            builder.checked_append_reference(slice.reference(i)?)?;
        }
        Ok(builder)
    }

    /// Seals builder into immutable cell: detects exotic type, resolves level mask,
    /// calculates hashes and depths
    pub fn into_cell(self) -> Result<Cell> {
        let cell_type = match self.cell_type {
            CellType::Ordinary => CellType::Ordinary,
            declared => {
                let detected = CellType::classify(&self.data, self.length_in_bits, self.references.len());
                if detected == CellType::Unknown || (declared != CellType::Unknown && declared != detected) {
                    log::debug!(
                        target: "cell", "exotic cell {} is detected as {} ({} bits, {} refs)",
                        declared, detected, self.length_in_bits, self.references.len()
                    );
                    fail!(ExceptionCode::FormatError)
                }
                detected
            }
        };
        let mut data = self.data;
        append_tag(&mut data, self.length_in_bits);
        Ok(Cell::with_cell_impl(
            DataCell::with_params(self.references.into_vec(), &data, cell_type, None)?
        ))
    }

    pub fn references(&self) -> &[Cell] {
        self.references.as_slice()
    }

    /// Data without completion tag
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn length_in_bits(&self) -> usize {
        self.length_in_bits
    }

    pub fn can_append(&self, x: &BuilderData) -> bool {
        self.bits_free() >= x.bits_used() && self.references_free() >= x.references_used()
    }

    pub(super) fn capacity(&self) -> usize {
        self.bits_capacity
    }

    pub fn append_raw(&mut self, slice: &[u8], bits: usize) -> Result<&mut Self> {
        if slice.len() * 8 < bits {
            fail!(ExceptionCode::FatalError)
        } else if self.length_in_bits + bits > self.bits_capacity {
            fail!(ExceptionCode::CellOverflow)
        } else if bits == 0 {
            return Ok(self)
        }
        let bytes = bits / 8 + usize::from(bits % 8 != 0);
        let shift = self.length_in_bits % 8;
        self.data.truncate(self.length_in_bits / 8 + usize::from(shift != 0));
        if shift == 0 {
            self.data.extend_from_slice(&slice[..bytes]);
        } else {
            let mut acc = self.data.pop().unwrap_or_default() & (0xFFu8 << (8 - shift));
            for &byte in &slice[..bytes] {
                self.data.push(acc | (byte >> shift));
                acc = byte << (8 - shift);
            }
            self.data.push(acc);
        }
        self.length_in_bits += bits;
        self.data.truncate(self.length_in_bits / 8 + usize::from(self.length_in_bits % 8 != 0));
        let tail = self.length_in_bits % 8;
        if tail != 0 {
            if let Some(last_byte) = self.data.last_mut() {
                *last_byte &= 0xFFu8 << (8 - tail);
            }
        }
        Ok(self)
    }

    pub fn checked_append_reference(&mut self, child: Cell) -> Result<&mut Self> {
        if self.references.len() >= MAX_REFERENCES_COUNT {
            fail!(ExceptionCode::CellOverflow)
        }
        self.references.push(child);
        Ok(self)
    }

    pub fn checked_prepend_reference(&mut self, child: Cell) -> Result<&mut Self> {
        if self.references.len() >= MAX_REFERENCES_COUNT {
            fail!(ExceptionCode::CellOverflow)
        }
        self.references.insert(0, child);
        Ok(self)
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Marks cell as exotic of given type, checked on sealing
    pub fn set_type(&mut self, cell_type: CellType) {
        self.cell_type = cell_type;
    }

    /// Marks cell as exotic with type detected from data on sealing
    pub fn set_exotic(&mut self, exotic: bool) {
        self.cell_type = if exotic { CellType::Unknown } else { CellType::Ordinary };
    }

    pub fn is_empty(&self) -> bool {
        self.length_in_bits == 0 && self.references.is_empty()
    }

    pub fn trunc(&mut self, length_in_bits: usize) -> Result<()> {
        if self.length_in_bits < length_in_bits {
            fail!(ExceptionCode::FatalError)
        }
        self.length_in_bits = length_in_bits;
        self.data.truncate(length_in_bits / 8 + usize::from(length_in_bits % 8 != 0));
        if length_in_bits % 8 != 0 {
            if let Some(last_byte) = self.data.last_mut() {
                *last_byte &= 0xFFu8 << (8 - length_in_bits % 8);
            }
        }
        Ok(())
    }
}

impl fmt::Display for BuilderData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut data = self.data.clone();
        append_tag(&mut data, self.length_in_bits);
        write!(
            f, "x{{{}}} refs: {}",
            super::to_hex_string(&data, self.length_in_bits, false),
            self.references.len()
        )
    }
}

impl fmt::UpperHex for BuilderData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.data))
    }
}

impl fmt::Binary for BuilderData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.length_in_bits {
            write!(f, "{}", (self.data[i / 8] >> (7 - i % 8)) & 1)?;
        }
        Ok(())
    }
}
