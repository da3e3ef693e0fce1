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
use crate::types::{ExceptionCode, Result};

use super::{build_trie, HashmapType, Leaf, TrieWriter};
use super::{BuilderData, Cell, IBitstring, SliceData};

/// Prefix code dictionary: keys have at most bit_len bits and none of them is a prefix of another
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PfxHashmapE {
    bit_len: usize,
    data: Option<Cell>,
}

#[rustfmt::skip]
impl fmt::Display for PfxHashmapE {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.data() {
            Some(cell) => write!(f, "PfxHashmap: {}", cell),
            None => write!(f, "Empty PfxHashmap"),
        }
    }
}

// phmn_leaf$0 {n:#} {X:Type} value:X = PfxHashmapNode n X;
// phmn_fork$1 {n:#} {X:Type} left:^(PfxHashmap n X) right:^(PfxHashmap n X) = PfxHashmapNode (n+1) X;
struct PfxWriter;

impl TrieWriter for PfxWriter {
    type Value = BuilderData;
    type Summary = ();
    fn write_leaf(&mut self, node: &mut BuilderData, value: BuilderData) -> Result<()> {
        node.append_bit_zero()?;
        node.append_builder(&value)?;
        Ok(())
    }
    fn write_fork(&mut self, node: &mut BuilderData, left: (Cell, ()), right: (Cell, ())) -> Result<()> {
        node.append_bit_one()?;
        node.checked_append_reference(left.0)?;
        node.checked_append_reference(right.0)?;
        Ok(())
    }
}

impl PfxHashmapE {
    /// constructs with bit_len
    pub const fn with_bit_len(bit_len: usize) -> Self {
        Self::with_hashmap(bit_len, None)
    }
    /// construct with bit_len and root representing PfxHashmap
    pub const fn with_hashmap(bit_len: usize, data: Option<Cell>) -> Self {
        Self { bit_len, data }
    }
    /// builds dictionary from entries at once
    pub fn from_entries<I>(bit_len: usize, entries: I) -> Result<Self>
    where I: IntoIterator<Item = (SliceData, BuilderData)> {
        let entries: Vec<_> = entries.into_iter().collect();
        for (key, _) in entries.iter() {
            Self::check_key_fail(bit_len, key)?;
        }
        if entries.is_empty() {
            return Ok(Self::with_bit_len(bit_len))
        }
        let (root, ()) = build_trie(&mut PfxWriter, entries, bit_len)?;
        Ok(Self::with_hashmap(bit_len, Some(root)))
    }
    /// root cell of the trie, `PfxHashmap n X` must not be empty
    pub fn serialize(&self) -> Result<Cell> {
        match self.data() {
            Some(root) => Ok(root.clone()),
            None => fail!(ExceptionCode::DictionaryError)
        }
    }
    /// serialize not empty root in current cell
    pub fn write_hashmap_root(&self, cell: &mut BuilderData) -> Result<()> {
        let root = self.serialize()?;
        cell.checked_append_references_and_data(&SliceData::from(root))?;
        Ok(())
    }
    /// serialize PfxHashmapE to cell
    pub fn write_to_cell(&self, cell: &mut BuilderData) -> Result<()> {
        cell.store_dict(self.data.clone())?;
        Ok(())
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }
    pub fn data(&self) -> Option<&Cell> {
        self.data.as_ref()
    }
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }
    /// gets value from hahsmap
    pub fn get(&self, key: SliceData) -> Leaf {
        self.hashmap_get(key)
    }
    /// collects all items as key and value slices
    pub fn entries(&self) -> Result<Vec<(SliceData, SliceData)>> {
        let mut entries = Vec::new();
        self.iterate_slices(|key, value| {
            entries.push((key, value));
            Ok(true)
        })?;
        Ok(entries)
    }
    /// true if key is prefix of any item in PfxHashmap
    pub fn is_prefix(&self, mut key: SliceData) -> Result<bool> {
        let mut bit_len = self.bit_len;
        let mut cursor = match self.data() {
            Some(root) if !key.is_empty() => SliceData::from(root),
            _ => return Ok(false)
        };
        loop {
            let label = cursor.get_label(bit_len)?;
            match SliceData::common_prefix(&label, &key) {
                (_, None, None) => return Ok(true), // label == key
                (_, None, Some(remainder)) => key = remainder, // usual case
                (_, _, None) => return Ok(true), // key is prefix
                (_, Some(_), Some(_)) => return Ok(false)
            }
            bit_len -= label.remaining_bits();
            if !Self::is_fork(&mut cursor, bit_len)? || bit_len == 0 {
                return Ok(false)
            }
            let next_index = key.get_next_bit()? as usize;
            if key.is_empty() {
                return Ok(true)
            }
            cursor = SliceData::from(cursor.reference(next_index)?);
            bit_len -= 1;
        }
    }
}

// phm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
// {n = (~m) + l} node:(PfxHashmapNode m X) = PfxHashmap n X;
impl HashmapType for PfxHashmapE {
    fn bit_len(&self) -> usize {
        self.bit_len
    }
    fn data(&self) -> Option<&Cell> {
        self.data.as_ref()
    }
    fn check_key(bit_len: usize, key: &SliceData) -> bool {
        bit_len >= key.remaining_bits()
    }
    fn is_fork(slice: &mut SliceData, _bit_len: usize) -> Result<bool> {
        slice.get_next_bit()
    }
}

#[cfg(test)]
#[path = "tests/test_pfxhashmap.rs"]
mod tests;
