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

use crate::{error, fail, types::{ExceptionCode, Result, UInt256}};
use sha2::{Digest, Sha256};
use smallvec::SmallVec;
use std::{
    cmp::{max, min}, collections::HashSet, convert::TryInto, fmt::{self, Display, Formatter},
    ops::{BitOr, BitOrAssign, Deref}, sync::Arc
};

pub const SHA256_SIZE: usize = 32;
pub const DEPTH_SIZE: usize = 2;
pub const MAX_REFERENCES_COUNT: usize = 4;
pub const MAX_DATA_BITS: usize = 1023;
pub const MAX_DATA_BYTES: usize = 128; // including tag
pub const MAX_LEVEL: usize = 3;
pub const MAX_LEVEL_MASK: u8 = 7;
pub const MAX_DEPTH: u16 = 1023;

pub(crate) const PRUNED_BRANCH_TYPE: u8 = 1;
pub(crate) const LIBRARY_REFERENCE_TYPE: u8 = 2;
pub(crate) const MERKLE_PROOF_TYPE: u8 = 3;
pub(crate) const MERKLE_UPDATE_TYPE: u8 = 4;

#[derive(Debug, Default, Eq, PartialEq, Clone, Copy, Hash)]
pub enum CellType {
    Unknown,
    #[default]
    Ordinary,
    PrunedBranch,
    LibraryReference,
    MerkleProof,
    MerkleUpdate,
}

impl CellType {
    /// Detects exotic cell type by its first byte and checks its shape.
    /// Shapes not matching any known exotic type give `Unknown`
    pub fn classify(data: &[u8], bit_len: usize, refs_count: usize) -> CellType {
        if bit_len < 8 || data.is_empty() {
            return CellType::Unknown
        }
        match data[0] {
            PRUNED_BRANCH_TYPE if bit_len >= 16 && refs_count == 0 => {
                let mask = data[1];
                let level = LevelMask::with_mask(mask).level() as usize;
                let expected = 8 * (1 + 1 + level * (SHA256_SIZE + DEPTH_SIZE));
                if LevelMask::is_valid(mask) && level != 0 && bit_len == expected {
                    CellType::PrunedBranch
                } else {
                    CellType::Unknown
                }
            }
            LIBRARY_REFERENCE_TYPE if bit_len == 8 * (1 + SHA256_SIZE) && refs_count == 0 => {
                CellType::LibraryReference
            }
            MERKLE_PROOF_TYPE if bit_len == 8 * (1 + SHA256_SIZE + DEPTH_SIZE) && refs_count == 1 => {
                CellType::MerkleProof
            }
            MERKLE_UPDATE_TYPE if bit_len == 8 * (1 + 2 * (SHA256_SIZE + DEPTH_SIZE)) && refs_count == 2 => {
                CellType::MerkleUpdate
            }
            _ => CellType::Unknown
        }
    }

    pub fn is_exotic(&self) -> bool {
        *self != CellType::Ordinary
    }
}

impl From<CellType> for u8 {
    fn from(ct: CellType) -> u8 {
        match ct {
            CellType::Unknown => 0,
            CellType::Ordinary => 0xff,
            CellType::PrunedBranch => PRUNED_BRANCH_TYPE,
            CellType::LibraryReference => LIBRARY_REFERENCE_TYPE,
            CellType::MerkleProof => MERKLE_PROOF_TYPE,
            CellType::MerkleUpdate => MERKLE_UPDATE_TYPE,
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            CellType::Ordinary => "Ordinary",
            CellType::PrunedBranch => "Pruned branch",
            CellType::LibraryReference => "Library reference",
            CellType::MerkleProof => "Merkle proof",
            CellType::MerkleUpdate => "Merkle update",
            CellType::Unknown => "Unknown",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Default, Eq, PartialEq, Clone, Copy, Hash)]
pub struct LevelMask(u8);

impl LevelMask {
    pub const fn with_level(level: u8) -> Self {
        LevelMask(match level {
            0 => 0,
            1 => 1,
            2 => 3,
            _ => 7,
        })
    }

    pub fn is_valid(mask: u8) -> bool {
        mask <= MAX_LEVEL_MASK
    }

    pub fn with_mask(mask: u8) -> Self {
        LevelMask(mask & MAX_LEVEL_MASK)
    }

    pub fn for_merkle_cell(children_mask: LevelMask) -> Self {
        LevelMask(children_mask.0 >> 1)
    }

    pub fn level(&self) -> u8 {
        // count of set bits (low three)
        (self.0 & 1) + ((self.0 >> 1) & 1) + ((self.0 >> 2) & 1)
    }

    pub fn mask(&self) -> u8 {
        self.0
    }

    // if cell contains required hash() - it will be returned,
    // else = max avaliable, but less then index
    //
    // rows - cell mask
    //       0(0)  1(1)  2(3)  3(7)  columns - index(mask)
    // 000     0     0     0     0     cells - index(AND result)
    // 001     0     1(1)  1(1)  1(1)
    // 010     0     0(0)  1(2)  1(2)
    // 011     0     1(1)  2(3)  2(3)
    // 100     0     0(0)  0(0)  1(4)
    // 101     0     1(1)  0(0)  2(5)
    // 110     0     0(0)  1(2)  2(6)
    // 111     0     1(1)  2(3)  3(7)
    pub fn calc_hash_index(&self, index: usize) -> usize {
        let index = min(index, MAX_LEVEL);
        LevelMask(self.0 & LevelMask::with_level(index as u8).0).level() as usize
    }

    pub fn is_significant_index(&self, index: usize) -> bool {
        index == 0 || (index <= MAX_LEVEL && self.0 & (1 << (index - 1)) != 0)
    }
}

impl BitOr for LevelMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        LevelMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for LevelMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for LevelMask {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:03b}", self.0)
    }
}

pub trait CellImpl: Sync + Send {
    /// Cell data closed by completion tag
    fn data(&self) -> &[u8];
    fn bit_length(&self) -> usize;
    fn references_count(&self) -> usize;
    fn reference(&self, index: usize) -> Result<Cell>;
    fn cell_type(&self) -> CellType;
    fn level_mask(&self) -> LevelMask;
    fn hash(&self, index: usize) -> UInt256;
    fn depth(&self, index: usize) -> u16;

    fn level(&self) -> u8 {
        self.level_mask().level()
    }

    fn is_merkle(&self) -> bool {
        self.cell_type() == CellType::MerkleProof || self.cell_type() == CellType::MerkleUpdate
    }

    fn is_pruned(&self) -> bool {
        self.cell_type() == CellType::PrunedBranch
    }

    fn tree_bits_count(&self) -> u64 { 0 }

    fn tree_cell_count(&self) -> u64 { 0 }
}

/// Sealed cell. Hashes and depths are computed once on construction,
/// after that the cell is immutable and may be shared between threads
pub struct Cell(Arc<dyn CellImpl>);

lazy_static::lazy_static!{
    pub(crate) static ref CELL_DEFAULT: Cell = Cell(Arc::new(DataCell::new()));
}

impl Clone for Cell {
    fn clone(&self) -> Self {
        Cell(self.0.clone())
    }
}

impl Cell {
    pub fn with_cell_impl<T: 'static + CellImpl>(cell_impl: T) -> Self {
        Cell(Arc::new(cell_impl))
    }

    pub fn with_cell_impl_arc(cell_impl: Arc<dyn CellImpl>) -> Self {
        Cell(cell_impl)
    }

    pub fn reference(&self, index: usize) -> Result<Cell> {
        self.0.reference(index)
    }

    pub fn clone_references(&self) -> SmallVec<[Cell; 4]> {
        (0..self.0.references_count())
            .filter_map(|i| self.0.reference(i).ok())
            .collect()
    }

    pub fn data(&self) -> &[u8] {
        self.0.data()
    }

    pub fn bit_length(&self) -> usize {
        self.0.bit_length()
    }

    pub fn cell_type(&self) -> CellType {
        self.0.cell_type()
    }

    pub fn is_exotic(&self) -> bool {
        self.0.cell_type().is_exotic()
    }

    pub fn level(&self) -> u8 {
        self.0.level()
    }

    pub fn level_mask(&self) -> LevelMask {
        self.0.level_mask()
    }

    pub fn references_count(&self) -> usize {
        self.0.references_count()
    }

    /// Counts unique cells of the tree, fails if there are more than `max`
    pub fn count_cells(&self, max: usize) -> Result<usize> {
        let mut visited = HashSet::new();
        let mut queue = vec!(self.clone());
        while let Some(cell) = queue.pop() {
            if !visited.insert(cell.repr_hash()) {
                continue
            }
            if visited.len() > max {
                fail!("count exceeds max {}", max)
            }
            for i in 0..cell.references_count() {
                queue.push(cell.reference(i)?);
            }
        }
        Ok(visited.len())
    }

    /// Returns cell's higher hash for given index (last one - representation hash)
    pub fn hash(&self, index: usize) -> UInt256 {
        self.0.hash(index)
    }

    /// Returns cell's depth for given index
    pub fn depth(&self, index: usize) -> u16 {
        self.0.depth(index)
    }

    /// Returns cell's hashes (representation and highers)
    pub fn hashes(&self) -> Vec<UInt256> {
        let mask = self.level_mask();
        (0..=MAX_LEVEL)
            .filter(|i| mask.is_significant_index(*i))
            .map(|i| self.hash(i))
            .collect()
    }

    /// Returns cell's depth (for current state and each level)
    pub fn depths(&self) -> Vec<u16> {
        let mask = self.level_mask();
        (0..=MAX_LEVEL)
            .filter(|i| mask.is_significant_index(*i))
            .map(|i| self.depth(i))
            .collect()
    }

    pub fn repr_hash(&self) -> UInt256 {
        self.0.hash(MAX_LEVEL)
    }

    pub fn repr_depth(&self) -> u16 {
        self.0.depth(MAX_LEVEL)
    }

    pub fn is_merkle(&self) -> bool {
        self.0.is_merkle()
    }

    pub fn is_pruned(&self) -> bool {
        self.0.is_pruned()
    }

    /// Bits of the whole tree, shared subtrees are counted each time they are referenced
    pub fn tree_bits_count(&self) -> u64 { self.0.tree_bits_count() }

    /// Cells of the whole tree, shared subtrees are counted each time they are referenced
    pub fn tree_cell_count(&self) -> u64 { self.0.tree_cell_count() }

    pub fn to_hex_string(&self, lower: bool) -> String {
        to_hex_string(self.data(), self.bit_length(), lower)
    }

    fn type_prefix(&self) -> char {
        match self.cell_type() {
            CellType::MerkleProof => 'p',
            CellType::MerkleUpdate => 'u',
            CellType::PrunedBranch => 'P',
            _ => 'x'
        }
    }

    /// Dumps the tree as `x{...}` lines, children are shifted by one space per level
    pub fn print(&self) -> String {
        let mut result = String::new();
        let mut stack = vec![(self.clone(), 0usize)];
        while let Some((cell, indent)) = stack.pop() {
            (0..indent).for_each(|_| result.push(' '));
            result.push(cell.type_prefix());
            result.push('{');
            result.push_str(&cell.to_hex_string(false));
            result.push_str("}\n");
            for child in cell.clone_references().into_iter().rev() {
                stack.push((child, indent + 1));
            }
        }
        result
    }
}

impl Deref for Cell {
    type Target = dyn CellImpl;
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl Default for Cell {
    fn default() -> Self {
        CELL_DEFAULT.clone()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Cell) -> bool {
        self.repr_hash() == other.repr_hash()
    }
}

impl PartialEq<UInt256> for Cell {
    fn eq(&self, other_hash: &UInt256) -> bool {
        &self.repr_hash() == other_hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.repr_hash().hash(state)
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.repr_hash().cmp(&other.repr_hash())
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.repr_hash())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.print())
    }
}

impl fmt::LowerHex for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex_string(true))
    }
}

impl fmt::UpperHex for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex_string(false))
    }
}

impl fmt::Binary for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = self.data();
        for i in 0..self.bit_length() {
            write!(f, "{}", (data[i / 8] >> (7 - i % 8)) & 1)?;
        }
        Ok(())
    }
}

/// Calculates data's length in bits with respect to completion tag
pub fn find_tag(bitsting: &[u8]) -> usize {
    let mut length = bitsting.len() * 8;
    for x in bitsting.iter().rev() {
        if *x == 0 {
            length -= 8;
        } else {
            length -= 1 + x.trailing_zeros() as usize;
            break;
        }
    }
    length
}

/// Cuts data to `bits` and closes it with completion tag
pub fn append_tag(data: &mut SmallVec<[u8; 128]>, bits: usize) {
    let shift = bits % 8;
    if shift == 0 || data.is_empty() {
        data.truncate(bits / 8);
        data.push(0x80);
    } else {
        data.truncate(1 + bits / 8);
        if let Some(last_byte) = data.last_mut() {
            *last_byte = (*last_byte & (0xFFu8 << (8 - shift))) | (0x80 >> shift);
        }
    }
}

// Serialized cell header.
// First byte is so called desription byte 1:
// | level mask| store hashes| exotic| refs count|
// |      7 6 5|            4|      3|      2 1 0|
// next byte is desription byte 2 with data size: floor(bits / 8) + ceil(bits / 8)
pub(crate) const LEVELMASK_D1_OFFSET: usize = 5;
pub(crate) const HASHES_D1_FLAG: u8 = 16;
pub(crate) const EXOTIC_D1_FLAG: u8 = 8;
pub(crate) const REFS_D1_MASK: u8 = 7;

#[inline(always)]
pub(crate) fn calc_d1(
    level_mask: LevelMask,
    store_hashes: bool,
    cell_type: CellType,
    refs_count: usize
) -> u8 {
    (level_mask.mask() << LEVELMASK_D1_OFFSET) |
    (store_hashes as u8 * HASHES_D1_FLAG) |
    ((cell_type != CellType::Ordinary) as u8 * EXOTIC_D1_FLAG) |
    refs_count as u8
}

#[inline(always)]
pub(crate) fn calc_d2(data_bit_len: usize) -> u8 {
    ((data_bit_len / 8) << 1) as u8 + (data_bit_len % 8 != 0) as u8
}

#[derive(Clone, Debug)]
pub struct DataCell {
    cell_type: CellType,
    level_mask: LevelMask,
    data: SmallVec<[u8; 128]>,
    bit_len: usize,
    references: SmallVec<[Cell; 4]>,
    hashes: SmallVec<[UInt256; 4]>,
    depths: SmallVec<[u16; 4]>,
    tree_bits_count: u64,
    tree_cell_count: u64,
}

impl Default for DataCell {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCell {
    pub fn new() -> Self {
        let mut cell = DataCell {
            cell_type: CellType::Ordinary,
            level_mask: LevelMask::default(),
            data: SmallVec::from_slice(&[0x80]),
            bit_len: 0,
            references: SmallVec::new(),
            hashes: SmallVec::new(),
            depths: SmallVec::new(),
            tree_bits_count: 0,
            tree_cell_count: 1,
        };
        cell.hashes.push(UInt256::DEFAULT_CELL_HASH);
        cell.depths.push(0);
        cell
    }

    pub fn with_refs_and_data(
        references: Vec<Cell>,
        data: &[u8], // with completion tag
    ) -> Result<DataCell> {
        Self::with_params(references, data, CellType::Ordinary, None)
    }

    /// Checks type invariants and calculates hashes.
    /// If `level_mask` is given it must be equal to the calculated one
    pub fn with_params(
        references: Vec<Cell>,
        data: &[u8], // with completion tag
        cell_type: CellType,
        level_mask: Option<LevelMask>,
    ) -> Result<DataCell> {
        let bit_len = find_tag(data);
        let data = if bit_len == 0 {
            SmallVec::from_slice(&[0x80])
        } else {
            SmallVec::from_slice(&data[..bit_len / 8 + 1])
        };
        let mut tree_bits_count = bit_len as u64;
        let mut tree_cell_count = 1u64;
        for reference in &references {
            tree_bits_count = tree_bits_count.saturating_add(reference.tree_bits_count());
            tree_cell_count = tree_cell_count.saturating_add(reference.tree_cell_count());
        }
        let mut cell = DataCell {
            cell_type,
            level_mask: LevelMask::default(),
            data,
            bit_len,
            references: references.into_iter().collect(),
            hashes: SmallVec::new(),
            depths: SmallVec::new(),
            tree_bits_count,
            tree_cell_count,
        };
        cell.finalize(level_mask)?;
        Ok(cell)
    }

    fn check_shape(&self) -> Result<()> {
        if self.references.len() > MAX_REFERENCES_COUNT || self.bit_len > MAX_DATA_BITS {
            fail!(ExceptionCode::CellOverflow)
        }
        match self.cell_type {
            CellType::Ordinary => Ok(()),
            CellType::Unknown => fail!(ExceptionCode::FormatError),
            cell_type => {
                if CellType::classify(&self.data, self.bit_len, self.references.len()) != cell_type {
                    fail!(ExceptionCode::FormatError)
                }
                if cell_type == CellType::PrunedBranch {
                    let level = LevelMask::with_mask(self.data[1]).level() as usize;
                    let offset = 1 + 1 + level * SHA256_SIZE;
                    for i in 0..level {
                        if self.read_depth(offset + i * DEPTH_SIZE) > MAX_DEPTH {
                            fail!(ExceptionCode::RangeCheckError)
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn finalize(&mut self, expected_mask: Option<LevelMask>) -> Result<()> {
        self.check_shape()?;

        let mut children_mask = LevelMask::default();
        for child in self.references.iter() {
            children_mask |= child.level_mask();
        }
        let level_mask = match self.cell_type {
            CellType::Ordinary => children_mask,
            CellType::PrunedBranch => LevelMask::with_mask(self.data[1]),
            CellType::LibraryReference => LevelMask::default(),
            CellType::MerkleProof | CellType::MerkleUpdate => LevelMask::for_merkle_cell(children_mask),
            CellType::Unknown => fail!(ExceptionCode::FormatError)
        };
        if let Some(expected) = expected_mask {
            if expected != level_mask {
                log::debug!(
                    target: "cell", "level mask mismatch {} != {}, type: {}",
                    expected, level_mask, self.cell_type
                );
                fail!(ExceptionCode::FormatError)
            }
        }
        self.level_mask = level_mask;

        let cell_type = self.cell_type;
        let merkle_offset = self.is_merkle() as usize;
        let is_pruned_cell = self.is_pruned();
        let data_size = self.bit_len / 8 + usize::from(self.bit_len % 8 != 0);
        let d2 = calc_d2(self.bit_len);

        // Hashes are calculated started from smallest indexes.
        // Representation hash is calculated last and "includes" all previous hashes
        // For pruned branch cell only representation hash is calculated
        for i in 0..=MAX_LEVEL {
            if i != 0 && (is_pruned_cell || ((1 << (i - 1)) & level_mask.mask()) == 0) {
                continue;
            }

            let mut hasher = Sha256::new();
            let mut depth = 0;

            let descr_mask = if is_pruned_cell {
                level_mask
            } else {
                LevelMask::with_level(i as u8)
            };
            hasher.update([calc_d1(descr_mask, false, cell_type, self.references.len()), d2]);

            if i == 0 {
                hasher.update(&self.data[..data_size]);
            } else {
                match self.hashes.last() {
                    Some(prev) => hasher.update(prev.as_slice()),
                    None => fail!(ExceptionCode::FatalError)
                }
            }

            for child in self.references.iter() {
                let child_depth = child.depth(i + merkle_offset);
                depth = max(depth, child_depth + 1);
                if depth > MAX_DEPTH {
                    fail!(ExceptionCode::RangeCheckError)
                }
                hasher.update(child_depth.to_be_bytes());
            }

            for child in self.references.iter() {
                hasher.update(child.hash(i + merkle_offset).as_slice());
            }

            let hash: [u8; 32] = hasher.finalize().into();
            self.hashes.push(UInt256::with_array(hash));
            self.depths.push(depth);
        }
        Ok(())
    }

    fn read_depth(&self, offset: usize) -> u16 {
        ((self.data[offset] as u16) << 8) | (self.data[offset + 1] as u16)
    }

    // pruned cell keeps all hashes and depths except representation ones in its data
    fn is_stored_in_data(&self, index: usize) -> bool {
        self.cell_type == CellType::PrunedBranch && index != self.level_mask.level() as usize
    }
}

impl CellImpl for DataCell {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn bit_length(&self) -> usize {
        self.bit_len
    }

    fn references_count(&self) -> usize {
        self.references.len()
    }

    fn reference(&self, index: usize) -> Result<Cell> {
        self.references.get(index).cloned().ok_or_else(|| error!(ExceptionCode::CellUnderflow))
    }

    fn cell_type(&self) -> CellType {
        self.cell_type
    }

    fn level_mask(&self) -> LevelMask {
        self.level_mask
    }

    fn hash(&self, index: usize) -> UInt256 {
        let index = self.level_mask.calc_hash_index(index);
        if self.is_stored_in_data(index) {
            let offset = 1 + 1 + index * SHA256_SIZE;
            let hash: [u8; 32] = self.data[offset..offset + SHA256_SIZE]
                .try_into()
                .unwrap_or([0; 32]);
            UInt256::with_array(hash)
        } else if self.is_pruned() {
            self.hashes[0]
        } else {
            self.hashes[index]
        }
    }

    fn depth(&self, index: usize) -> u16 {
        let index = self.level_mask.calc_hash_index(index);
        if self.is_stored_in_data(index) {
            let level = self.level_mask.level() as usize;
            self.read_depth(1 + 1 + level * SHA256_SIZE + index * DEPTH_SIZE)
        } else if self.is_pruned() {
            self.depths[0]
        } else {
            self.depths[index]
        }
    }

    fn tree_bits_count(&self) -> u64 { self.tree_bits_count }

    fn tree_cell_count(&self) -> u64 { self.tree_cell_count }
}

mod slice;

pub use self::slice::*;

pub mod builder;

pub use self::builder::*;

mod builder_operations;

pub use self::builder_operations::*;

/// Hex form of bitstring in fift notation: trailing `_` marks incomplete last digit
pub(crate) fn to_hex_string(data: impl AsRef<[u8]>, len: usize, lower: bool) -> String {
    if len == 0 {
        return String::new();
    }
    let data = data.as_ref();
    let data = &data[..min(data.len(), len / 8 + 1)];
    let mut result = if lower {
        hex::encode(data)
    } else {
        hex::encode_upper(data)
    };
    match len % 8 {
        0 => {
            result.pop();
            result.pop();
        }
        1..=3 => {
            result.pop();
            result.push('_')
        }
        4 => {
            result.pop();
        }
        _ => result.push('_')
    }
    result
}

pub fn create_cell(
    references: Vec<Cell>,
    data: &[u8], // with completion tag
) -> Result<Cell> {
    Ok(Cell::with_cell_impl(DataCell::with_refs_and_data(references, data)?))
}

#[cfg(test)]
#[path = "tests/test_cell.rs"]
mod tests;
