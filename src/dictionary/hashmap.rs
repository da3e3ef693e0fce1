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

use super::{build_trie, HashmapType, Leaf, TrieWriter};
use crate::cell::{BuilderData, Cell, IBitstring, SliceData};
use crate::types::{ExceptionCode, Result};
use crate::fail;

///////////////////////////////////////////////
/// Dictionary with keys of exactly bit_len bits
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashmapE {
    bit_len: usize,
    data: Option<Cell>,
}

#[cfg_attr(rustfmt, rustfmt_skip)]
impl fmt::Display for HashmapE {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.data() {
            Some(cell) => write!(f, "Hashmap: {}", cell),
            None => write!(f, "Empty Hashmap"),
        }
    }
}

// hmn_leaf#_ {X:Type} value:X = HashmapNode 0 X;
// hmn_fork#_ {n:#} {X:Type} left:^(Hashmap n X) right:^(Hashmap n X) = HashmapNode (n+1) X;
struct PlainWriter;

impl TrieWriter for PlainWriter {
    type Value = BuilderData;
    type Summary = ();
    fn write_leaf(&mut self, node: &mut BuilderData, value: BuilderData) -> Result<()> {
        node.append_builder(&value)?;
        Ok(())
    }
    fn write_fork(&mut self, node: &mut BuilderData, left: (Cell, ()), right: (Cell, ())) -> Result<()> {
        node.checked_append_reference(left.0)?;
        node.checked_append_reference(right.0)?;
        Ok(())
    }
}

impl HashmapE {
    /// constructs with bit_len
    pub fn with_bit_len(bit_len: usize) -> Self {
        Self::with_hashmap(bit_len, None)
    }
    /// construct with bit_len and root representing Hashmap
    pub fn with_hashmap(bit_len: usize, data: Option<Cell>) -> Self {
        Self { bit_len, data }
    }
    /// builds dictionary from entries at once, every key must have exactly bit_len bits
    pub fn from_entries<I>(bit_len: usize, entries: I) -> Result<Self>
    where I: IntoIterator<Item = (SliceData, BuilderData)> {
        let entries: Vec<_> = entries.into_iter().collect();
        for (key, _) in entries.iter() {
            Self::check_key_fail(bit_len, key)?;
        }
        if entries.is_empty() {
            return Ok(Self::with_bit_len(bit_len))
        }
        let (root, ()) = build_trie(&mut PlainWriter, entries, bit_len)?;
        Ok(Self::with_hashmap(bit_len, Some(root)))
    }
    /// root cell of the trie, `Hashmap n X` must not be empty
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
    /// serialize hashmapE to cell
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
    /// gets value from hashmap
    pub fn get(&self, key: SliceData) -> Leaf {
        self.hashmap_get(key)
    }
    /// collects all items as key and value slices in key order
    pub fn entries(&self) -> Result<Vec<(SliceData, SliceData)>> {
        let mut entries = Vec::new();
        self.iterate_slices(|key, value| {
            entries.push((key, value));
            Ok(true)
        })?;
        Ok(entries)
    }
}

// hm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
// {n = (~m) + l} node:(HashmapNode m X) = Hashmap n X;
impl HashmapType for HashmapE {
    fn bit_len(&self) -> usize {
        self.bit_len
    }
    fn data(&self) -> Option<&Cell> {
        self.data.as_ref()
    }
    fn check_key(bit_len: usize, key: &SliceData) -> bool {
        bit_len == key.remaining_bits()
    }
    fn is_fork(_slice: &mut SliceData, bit_len: usize) -> Result<bool> {
        Ok(bit_len != 0)
    }
}

#[cfg(test)]
#[path = "tests/test_hashmap.rs"]
mod tests;
