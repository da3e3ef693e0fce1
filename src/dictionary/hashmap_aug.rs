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

use super::{build_trie, HashmapType, TrieWriter};
use super::{BuilderData, Cell, IBitstring, SliceData};

/// Extra data kept in every node of augmented dictionary.
/// Fork keeps combination of extras of its subtrees
pub trait Augmentable: Clone + Default {
    /// combines extra of other subtree into self, must be associative
    fn calc(&mut self, other: &Self) -> Result<()>;
    fn write_to(&self, cell: &mut BuilderData) -> Result<()>;
    fn read_from(slice: &mut SliceData) -> Result<Self>;
}

/// Augmented dictionary with keys of exactly bit_len bits
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashmapAug<X: Augmentable> {
    bit_len: usize,
    data: Option<Cell>,
    extra: X,
}

impl<X: Augmentable> fmt::Display for HashmapAug<X> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.data() {
            Some(cell) => write!(f, "HashmapAug: {}", cell),
            None => write!(f, "Empty HashmapAug"),
        }
    }
}

// ahmn_leaf#_ {X:Type} {Y:Type} extra:Y value:X = HashmapAugNode 0 X Y;
// ahmn_fork#_ {n:#} {X:Type} {Y:Type} left:^(HashmapAug n X Y)
// right:^(HashmapAug n X Y) extra:Y = HashmapAugNode (n + 1) X Y;
struct AugWriter<X>(std::marker::PhantomData<X>);

impl<X: Augmentable> TrieWriter for AugWriter<X> {
    type Value = (X, BuilderData);
    type Summary = X;
    fn write_leaf(&mut self, node: &mut BuilderData, value: (X, BuilderData)) -> Result<X> {
        let (extra, value) = value;
        extra.write_to(node)?;
        node.append_builder(&value)?;
        Ok(extra)
    }
    fn write_fork(&mut self, node: &mut BuilderData, left: (Cell, X), right: (Cell, X)) -> Result<X> {
        let mut extra = left.1;
        extra.calc(&right.1)?;
        extra.write_to(node)?;
        node.checked_append_reference(left.0)?;
        node.checked_append_reference(right.0)?;
        Ok(extra)
    }
}

impl<X: Augmentable> HashmapAug<X> {
    /// constructs empty with bit_len
    pub fn with_bit_len(bit_len: usize) -> Self {
        Self::with_hashmap(bit_len, None, X::default())
    }
    /// construct with bit_len, root and extra of the whole tree
    pub fn with_hashmap(bit_len: usize, data: Option<Cell>, extra: X) -> Self {
        Self { bit_len, data, extra }
    }
    /// construct with root, extra is read from the root node
    pub fn with_root(bit_len: usize, root: Cell) -> Result<Self> {
        let mut cursor = SliceData::from(&root);
        cursor.get_label(bit_len)?;
        let extra = X::read_from(&mut cursor)?;
        Ok(Self::with_hashmap(bit_len, Some(root), extra))
    }
    /// builds dictionary from (key, extra, value) entries at once
    pub fn from_entries<I>(bit_len: usize, entries: I) -> Result<Self>
    where I: IntoIterator<Item = (SliceData, X, BuilderData)> {
        let entries: Vec<_> = entries.into_iter()
            .map(|(key, extra, value)| (key, (extra, value)))
            .collect();
        for (key, _) in entries.iter() {
            Self::check_key_fail(bit_len, key)?;
        }
        if entries.is_empty() {
            return Ok(Self::with_bit_len(bit_len))
        }
        let mut writer = AugWriter::<X>(std::marker::PhantomData);
        let (root, extra) = build_trie(&mut writer, entries, bit_len)?;
        Ok(Self::with_hashmap(bit_len, Some(root), extra))
    }
    /// extra of the whole dictionary, default for empty one
    pub fn root_extra(&self) -> &X {
        &self.extra
    }
    /// root cell of the trie, `HashmapAug n X Y` must not be empty
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
    // ahme_empty$0 {n:#} {X:Type} {Y:Type} extra:Y = HashmapAugE n X Y;
    // ahme_root$1 {n:#} {X:Type} {Y:Type} root:^(HashmapAug n X Y) extra:Y = HashmapAugE n X Y;
    pub fn write_to_cell(&self, cell: &mut BuilderData) -> Result<()> {
        cell.store_dict(self.data.clone())?;
        self.extra.write_to(cell)
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
    /// gets extra and value by key
    pub fn get(&self, key: SliceData) -> Result<Option<(X, SliceData)>> {
        match self.hashmap_get(key)? {
            Some(mut leaf) => {
                let extra = X::read_from(&mut leaf)?;
                Ok(Some((extra, leaf)))
            }
            None => Ok(None)
        }
    }
    /// iterate all elements with callback function receiving key, extra and value
    pub fn iterate_with_extra<F>(&self, mut p: F) -> Result<bool>
    where F: FnMut(SliceData, X, SliceData) -> Result<bool> {
        self.iterate_slices(|key, mut leaf| {
            let extra = X::read_from(&mut leaf)?;
            p(key, extra, leaf)
        })
    }
    /// collects all items in key order
    pub fn entries(&self) -> Result<Vec<(SliceData, X, SliceData)>> {
        let mut entries = Vec::new();
        self.iterate_with_extra(|key, extra, value| {
            entries.push((key, extra, value));
            Ok(true)
        })?;
        Ok(entries)
    }
}

// ahm_edge#_ {n:#} {X:Type} {Y:Type} {l:#} {m:#} label:(HmLabel ~l n)
// {n = (~m) + l} node:(HashmapAugNode m X Y) = HashmapAug n X Y;
impl<X: Augmentable> HashmapType for HashmapAug<X> {
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
#[path = "tests/test_hashmap_aug.rs"]
mod tests;
