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

use crate::{error, fail};
use crate::cell::{BuilderData, Cell, IBitstring, SliceData};
use crate::types::{ExceptionCode, Result};

pub use self::hashmap::HashmapE;
pub use self::hashmap_aug::{Augmentable, HashmapAug};
pub use self::pfxhashmap::PfxHashmapE;

mod hashmap;
mod hashmap_aug;
mod pfxhashmap;

pub type Leaf = Result<Option<SliceData>>;

const EMPTY_LABEL_MARKER: u8 = 0b00_000000;
const SHORT_LABEL_PREFIX: u8 = 0b0_0000000; // hml_short constructor, binary 0
const LONG_LABEL_PREFIX: u8 = 0b10_000000; // hml_long, binary 10
const SAME_LABEL_PREFIX: u8 = 0b11_000000; // hml_same, binary 11

// hml_long$10 n:(#<= m) s:n*bit = HmLabel ~n m;
fn hml_long(key: &SliceData, len: usize) -> Result<BuilderData> {
    let mut label = BuilderData::with_raw(vec![LONG_LABEL_PREFIX], 2)?;
    label.append_bits(key.remaining_bits(), len)?;
    label.append_bytestring(key)?;
    Ok(label)
}

// hml_short$0 {n:#} len:(Unary ~n) s:n*bit = HmLabel ~n m;
fn hml_short(key: &SliceData) -> Result<BuilderData> {
    let mut label = BuilderData::with_raw(vec![SHORT_LABEL_PREFIX], 1)?;
    let length = key.remaining_bits();
    for _ in 0..length / 32 {
        label.append_bits(u32::MAX as usize, 32)?;
    }
    let remainder = length % 32;
    if remainder != 0 {
        label.append_bits(u32::MAX as usize, remainder)?;
    }
    label.append_bit_zero()?;
    label.append_bytestring(key)?;
    Ok(label)
}

// hml_same$11 v:bit n:(#<= m) = HmLabel ~n m;
fn hml_same(key: &SliceData, len: usize) -> Result<BuilderData> {
    let mut label = BuilderData::with_raw(vec![SAME_LABEL_PREFIX], 2)?;
    label.append_bit_bool(key.get_bit(0)?)?;
    label.append_bits(key.remaining_bits(), len)?;
    Ok(label)
}

fn is_same_bits(key: &SliceData) -> Result<bool> {
    let first = key.get_bit(0)?;
    for offset in 1..key.remaining_bits() {
        if key.get_bit(offset)? != first {
            return Ok(false)
        }
    }
    Ok(true)
}

/// Bit length of the label length field for keys of at most `max` bits
pub fn label_length_bits(max: usize) -> usize {
    16 - (max as u16).leading_zeros() as usize
}

/// Serializes key as the shortest of `HmLabel` forms
pub fn hm_label(key: &SliceData, max: usize) -> Result<BuilderData> {
    if key.remaining_bits() > max {
        fail!(ExceptionCode::DictionaryError)
    }
    if key.is_empty() || max == 0 {
        return BuilderData::with_raw(vec![EMPTY_LABEL_MARKER], 2)
    }
    let len = label_length_bits(max);
    let bits = key.remaining_bits();
    let short_length = 2 * bits + 2;
    let long_length = 2 + len + bits;
    let same_length = 3 + len;
    if same_length < cmp::min(short_length, long_length) && is_same_bits(key)? {
        hml_same(key, len)
    } else if short_length <= long_length {
        hml_short(key)
    } else {
        hml_long(key, len)
    }
}

// reading hmLabel from SliceData
impl SliceData {
    /// Reads any form of `HmLabel ~n max`, the result never exceeds `max` bits
    pub fn get_label(&mut self, max: usize) -> Result<SliceData> {
        let label = if self.is_empty() {
            SliceData::default()
        } else if !self.get_next_bit()? {
            // short label
            let len = self.load_unary()?;
            self.get_next_slice(len)?
        } else if !self.get_next_bit()? {
            // long label
            let len = self.get_next_size(max)? as usize;
            self.get_next_slice(len)?
        } else {
            // same bit
            let value = if self.get_next_bit()? { 0xFF } else { 0 };
            let len = self.get_next_size(max)? as usize;
            if len > max {
                fail!(ExceptionCode::DictionaryError)
            }
            SliceData::from_raw(vec![value; len / 8 + 1], len)?
        };
        if label.remaining_bits() > max {
            fail!(ExceptionCode::DictionaryError)
        }
        Ok(label)
    }
}

// pruned branch keeps no dictionary data, so it is read as empty dictionary
fn is_pruned_root(root: &Cell) -> bool {
    if root.is_pruned() {
        log::warn!(target: "dictionary", "pruned branch {:x} is read as empty dictionary", root.repr_hash());
        true
    } else {
        false
    }
}

fn non_pruned_root(root: Cell) -> Option<Cell> {
    match is_pruned_root(&root) {
        true => None,
        false => Some(root)
    }
}

/// Common read access to dictionaries built on `Hashmap n X` tries
pub trait HashmapType {
    fn bit_len(&self) -> usize;
    fn data(&self) -> Option<&Cell>;

    fn check_key(bit_len: usize, key: &SliceData) -> bool;
    /// Called after label with the number of key bits left.
    /// Reads node tag if any and tells whether the node is fork
    fn is_fork(slice: &mut SliceData, bit_len: usize) -> Result<bool>;

    fn is_empty(&self) -> bool {
        self.data().is_none()
    }

    fn check_key_fail(bit_len: usize, key: &SliceData) -> Result<()> {
        match Self::check_key(bit_len, key) {
            true => Ok(()),
            false => fail!(ExceptionCode::DictionaryError)
        }
    }

    /// Returns leaf slice positioned right after the label and leaf tag
    fn hashmap_get(&self, mut key: SliceData) -> Leaf {
        let mut bit_len = self.bit_len();
        Self::check_key_fail(bit_len, &key)?;
        let mut cursor = match self.data() {
            Some(root) => SliceData::from(root),
            None => return Ok(None)
        };
        loop {
            let label = cursor.get_label(bit_len)?;
            if !key.erase_prefix(&label) {
                return Ok(None)
            }
            bit_len -= label.remaining_bits();
            if !Self::is_fork(&mut cursor, bit_len)? {
                return Ok(if key.is_empty() { Some(cursor) } else { None })
            }
            if key.is_empty() || bit_len == 0 {
                return Ok(None)
            }
            let next_index = key.get_next_bit()? as usize;
            cursor = SliceData::from(cursor.reference(next_index)?);
            bit_len -= 1;
        }
    }

    /// iterate all elements with callback function, stops when callback returns false
    fn iterate_slices<F>(&self, mut p: F) -> Result<bool>
    where F: FnMut(SliceData, SliceData) -> Result<bool> {
        match self.data() {
            Some(root) => iterate_internal::<Self, F>(
                &mut SliceData::from(root),
                BuilderData::default(),
                self.bit_len(),
                &mut p
            ),
            None => Ok(true)
        }
    }

    /// returns count of leaves in tree
    fn len(&self) -> Result<usize> {
        let mut count = 0;
        self.iterate_slices(|_, _| {
            count += 1;
            Ok(true)
        })?;
        Ok(count)
    }
}

fn iterate_internal<T: HashmapType + ?Sized, F: FnMut(SliceData, SliceData) -> Result<bool>>(
    cursor: &mut SliceData,
    mut key: BuilderData,
    bit_len: usize,
    found: &mut F
) -> Result<bool> {
    let label = cursor.get_label(bit_len)?;
    let bit_len = bit_len - label.remaining_bits();
    key.append_bytestring(&label)?;
    if !T::is_fork(cursor, bit_len)? {
        let key = SliceData::from(key.into_cell()?);
        return found(key, cursor.clone())
    }
    if bit_len == 0 || cursor.remaining_references() < 2 {
        fail!(ExceptionCode::DictionaryError)
    }
    for i in 0..2 {
        let mut key = key.clone();
        key.append_bit_bool(i != 0)?;
        let child = &mut SliceData::from(cursor.reference(i)?);
        if !iterate_internal::<T, F>(child, key, bit_len - 1, found)? {
            return Ok(false)
        }
    }
    Ok(true)
}

/// Patricia trie under construction: what is written after the label of every node
pub(crate) trait TrieWriter {
    type Value;
    type Summary;
    /// writes leaf payload and returns its summary
    fn write_leaf(&mut self, node: &mut BuilderData, value: Self::Value) -> Result<Self::Summary>;
    /// writes fork payload including references and returns combined summary
    fn write_fork(
        &mut self,
        node: &mut BuilderData,
        left: (Cell, Self::Summary),
        right: (Cell, Self::Summary)
    ) -> Result<Self::Summary>;
}

/// Builds trie from entries with unique keys, none of them is a prefix of another.
/// Keys are remainders not consumed by upper nodes, `bit_len` is the maximum key length here
pub(crate) fn build_trie<W: TrieWriter>(
    writer: &mut W,
    mut entries: Vec<(SliceData, W::Value)>,
    bit_len: usize,
) -> Result<(Cell, W::Summary)> {
    if entries.len() == 1 {
        if let Some((key, value)) = entries.pop() {
            let mut node = hm_label(&key, bit_len)?;
            let summary = writer.write_leaf(&mut node, value)?;
            return Ok((node.into_cell()?, summary))
        }
    }
    let first = entries.first().map(|(key, _)| key.clone())
        .ok_or_else(|| error!(ExceptionCode::DictionaryError))?;
    let mut common = first.remaining_bits();
    for (key, _) in entries.iter().skip(1) {
        common = cmp::min(common, common_prefix_len(&first, key));
    }
    // duplicates or prefix keys exhaust before next bit
    if entries.iter().any(|(key, _)| key.remaining_bits() <= common) {
        log::debug!(target: "dictionary", "key {} is a prefix of another key", first.as_hex_string());
        fail!(ExceptionCode::DictionaryError)
    }
    let label = first.get_slice(0, common)?;
    let mut left = Vec::new();
    let mut right = Vec::new();
    for (mut key, value) in entries {
        key.move_by(common)?;
        if key.get_next_bit()? {
            right.push((key, value));
        } else {
            left.push((key, value));
        }
    }
    let child_bit_len = bit_len - common - 1;
    let left = build_trie(writer, left, child_bit_len)?;
    let right = build_trie(writer, right, child_bit_len)?;
    let mut node = hm_label(&label, bit_len)?;
    let summary = writer.write_fork(&mut node, left, right)?;
    Ok((node.into_cell()?, summary))
}

fn common_prefix_len(a: &SliceData, b: &SliceData) -> usize {
    match SliceData::common_prefix(a, b) {
        (Some(prefix), _, _) => prefix.remaining_bits(),
        (None, _, _) => 0
    }
}

// methods working with root
impl SliceData {
    /// Reads `HashmapE n X` root reference
    pub fn get_dictionary_root(&mut self) -> Result<Option<Cell>> {
        if is_pruned_root(self.cell()) {
            return Ok(None)
        }
        Ok(self.load_maybe_ref()?.and_then(non_pruned_root))
    }

    /// Reads `Hashmap n X` occupying the rest of the slice
    pub fn get_hashmap_root(&mut self) -> Result<Option<Cell>> {
        let root = std::mem::take(self);
        if is_pruned_root(root.cell()) {
            return Ok(None)
        }
        Ok(Some(root.into_cell()?))
    }

    pub fn load_dict(&mut self, bit_len: usize) -> Result<HashmapE> {
        Ok(HashmapE::with_hashmap(bit_len, self.get_hashmap_root()?))
    }

    pub fn load_dict_e(&mut self, bit_len: usize) -> Result<HashmapE> {
        Ok(HashmapE::with_hashmap(bit_len, self.get_dictionary_root()?))
    }

    pub fn load_pfx_dict(&mut self, bit_len: usize) -> Result<PfxHashmapE> {
        Ok(PfxHashmapE::with_hashmap(bit_len, self.get_hashmap_root()?))
    }

    pub fn load_pfx_dict_e(&mut self, bit_len: usize) -> Result<PfxHashmapE> {
        Ok(PfxHashmapE::with_hashmap(bit_len, self.get_dictionary_root()?))
    }

    pub fn load_dict_aug<X: Augmentable>(&mut self, bit_len: usize) -> Result<HashmapAug<X>> {
        match self.get_hashmap_root()? {
            Some(root) => HashmapAug::with_root(bit_len, root),
            None => Ok(HashmapAug::with_bit_len(bit_len))
        }
    }

    pub fn load_dict_aug_e<X: Augmentable>(&mut self, bit_len: usize) -> Result<HashmapAug<X>> {
        if is_pruned_root(self.cell()) {
            return Ok(HashmapAug::with_bit_len(bit_len))
        }
        let root = self.load_maybe_ref()?;
        let extra = X::read_from(self)?;
        Ok(HashmapAug::with_hashmap(bit_len, root.and_then(non_pruned_root), extra))
    }
}

#[cfg(test)]
#[path = "tests/test_dictionary.rs"]
mod tests;
