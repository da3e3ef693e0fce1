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

use num::BigInt;
use super::*;

fn cell_u32(value: u32, refs: Vec<Cell>) -> Cell {
    let mut builder = BuilderData::new();
    builder.append_u32(value).unwrap();
    for child in refs {
        builder.checked_append_reference(child).unwrap();
    }
    builder.into_cell().unwrap()
}

fn pruned_branch(cell: &Cell) -> Cell {
    let mut builder = BuilderData::new();
    builder.append_u8(PRUNED_BRANCH_TYPE).unwrap();
    builder.append_u8(cell.level_mask().mask() | 1).unwrap();
    builder.append_raw(cell.repr_hash().as_slice(), 256).unwrap();
    builder.append_u16(cell.repr_depth()).unwrap();
    builder.set_type(CellType::PrunedBranch);
    builder.into_cell().unwrap()
}

#[test]
fn test_format_cell() {
    let c2 = cell_u32(0xfff2, vec![]);
    let c3 = cell_u32(0xfff3, vec![]);
    let c1 = cell_u32(0xfff1, vec![c2, c3]);
    let c4 = cell_u32(0xfff4, vec![]);
    let root = cell_u32(0xfff0, vec![c1, c4]);

    assert_eq!(
        format!("{}", root),
        "x{0000FFF0}\n x{0000FFF1}\n  x{0000FFF2}\n  x{0000FFF3}\n x{0000FFF4}\n"
    );
    assert_eq!(format!("{:x}", cell_u32(0xabc, vec![])), "00000abc");
}

#[test]
fn test_hex_with_completion_tag() {
    let mut builder = BuilderData::new();
    builder.store_uint(&BigInt::from(100), 9).unwrap();
    let cell = builder.into_cell().unwrap();
    assert_eq!(cell.bit_length(), 9);
    assert_eq!(cell.data(), &[0x32, 0x40]);
    assert_eq!(cell.to_hex_string(false), "324_");
    assert_eq!(cell.print(), "x{324_}\n");

    let cell = BuilderData::with_raw(vec![0xA0], 4).unwrap().into_cell().unwrap();
    assert_eq!(cell.to_hex_string(false), "A");
}

#[test]
fn test_default_cell() {
    let cell = Cell::default();
    assert_eq!(cell.repr_hash(), UInt256::DEFAULT_CELL_HASH);
    assert_eq!(cell.repr_depth(), 0);
    assert_eq!(cell.bit_length(), 0);
    assert_eq!(cell.references_count(), 0);
    assert_eq!(cell.data(), &[0x80]);
    assert_eq!(BuilderData::new().into_cell().unwrap(), cell);
}

#[test]
fn test_known_hash() {
    let mut builder = BuilderData::new();
    builder.store_uint(&BigInt::from(100), 9).unwrap();
    let cell = builder.into_cell().unwrap();
    assert_eq!(
        cell.repr_hash().to_hex_string(),
        "5bcd63a5a6f89c3209150ed71d2eccc25f95b56f40cdaeab6484a033f817ca1a"
    );
}

#[test]
fn test_hash_is_deterministic() {
    let build = || cell_u32(1, vec![cell_u32(2, vec![]), cell_u32(3, vec![cell_u32(4, vec![])])]);
    let cell1 = build();
    let cell2 = build();
    assert_eq!(cell1.repr_hash(), cell2.repr_hash());
    assert_eq!(cell1, cell2);
    assert_ne!(cell1.repr_hash(), cell_u32(1, vec![cell_u32(3, vec![]), cell_u32(2, vec![])]).repr_hash());
}

#[test]
fn test_hash_depends_on_deep_leaf() {
    let build = |leaf: u32| cell_u32(1, vec![cell_u32(2, vec![]), cell_u32(3, vec![cell_u32(leaf, vec![])])]);
    let cell = build(4);
    let changed = build(5);
    assert_ne!(cell.repr_hash(), changed.repr_hash());
    assert_ne!(cell, changed);
    // only the path to the leaf is affected
    assert_eq!(cell.reference(0).unwrap(), changed.reference(0).unwrap());
    assert_ne!(cell.reference(1).unwrap().repr_hash(), changed.reference(1).unwrap().repr_hash());
    assert_eq!(cell.repr_depth(), changed.repr_depth());
    assert_eq!(cell.data(), changed.data());
}

#[test]
fn test_depth() {
    let leaf = cell_u32(0, vec![]);
    assert_eq!(leaf.repr_depth(), 0);
    let middle = cell_u32(1, vec![leaf.clone()]);
    assert_eq!(middle.repr_depth(), 1);
    let root = cell_u32(2, vec![leaf, middle]);
    assert_eq!(root.repr_depth(), 2);
    assert_eq!(root.tree_cell_count(), 4);
    assert_eq!(root.tree_bits_count(), 4 * 32);
    assert_eq!(root.count_cells(usize::MAX).unwrap(), 3);
    assert!(root.count_cells(2).is_err());
}

#[test]
fn test_max_depth() {
    let mut cell = Cell::default();
    for _ in 0..MAX_DEPTH {
        cell = cell_u32(0, vec![cell]);
    }
    assert_eq!(cell.repr_depth(), MAX_DEPTH);
    let mut builder = BuilderData::new();
    builder.checked_append_reference(cell).unwrap();
    let err = builder.into_cell().expect_err("depth must be checked");
    assert_eq!(err.downcast_ref::<ExceptionCode>(), Some(&ExceptionCode::RangeCheckError));
}

#[test]
fn test_limits() {
    let mut builder = BuilderData::new();
    builder.append_raw(&[0xFF; 128], MAX_DATA_BITS).unwrap();
    let err = builder.append_bit_one().expect_err("1024th bit must be rejected");
    assert_eq!(err.downcast_ref::<ExceptionCode>(), Some(&ExceptionCode::CellOverflow));
    assert_eq!(builder.into_cell().unwrap().bit_length(), MAX_DATA_BITS);

    let mut builder = BuilderData::new();
    for _ in 0..MAX_REFERENCES_COUNT {
        builder.checked_append_reference(Cell::default()).unwrap();
    }
    let err = builder.checked_append_reference(Cell::default()).expect_err("5th ref must be rejected");
    assert_eq!(err.downcast_ref::<ExceptionCode>(), Some(&ExceptionCode::CellOverflow));
}

#[test]
fn test_find_and_append_tag() {
    assert_eq!(find_tag(&[0x80]), 0);
    assert_eq!(find_tag(&[0x32, 0x40]), 9);
    assert_eq!(find_tag(&[0xFF, 0x80]), 8);
    assert_eq!(find_tag(&[0xFF, 0x00]), 7);
    assert_eq!(find_tag(&[]), 0);

    let mut data = SmallVec::from_slice(&[0x32, 0x7F]);
    append_tag(&mut data, 9);
    assert_eq!(data.as_slice(), &[0x32, 0x40]);
    let mut data = SmallVec::from_slice(&[0xAB]);
    append_tag(&mut data, 8);
    assert_eq!(data.as_slice(), &[0xAB, 0x80]);
}

#[test]
fn test_classify_exotic() {
    let leaf = cell_u32(0xAB, vec![]);
    let pruned = pruned_branch(&leaf);
    assert_eq!(pruned.cell_type(), CellType::PrunedBranch);
    assert!(pruned.is_pruned());
    assert!(pruned.is_exotic());
    assert_eq!(pruned.level(), 1);
    assert_eq!(pruned.bit_length(), 288);
    assert_eq!(pruned.hash(0), leaf.repr_hash());
    assert_eq!(pruned.depth(0), leaf.repr_depth());
    assert_ne!(pruned.repr_hash(), leaf.repr_hash());
    assert!(pruned.print().starts_with("P{01"));

    // wrong shape is rejected
    let mut builder = BuilderData::with_raw(vec![PRUNED_BRANCH_TYPE, 1, 0], 24).unwrap();
    builder.set_exotic(true);
    let err = builder.into_cell().expect_err("unknown exotic must be rejected");
    assert_eq!(err.downcast_ref::<ExceptionCode>(), Some(&ExceptionCode::FormatError));

    let mut builder = BuilderData::with_raw(vec![LIBRARY_REFERENCE_TYPE; 33], 264).unwrap();
    builder.set_exotic(true);
    let library = builder.into_cell().unwrap();
    assert_eq!(library.cell_type(), CellType::LibraryReference);
    assert_eq!(library.level(), 0);

    let mut builder = BuilderData::with_raw(vec![LIBRARY_REFERENCE_TYPE; 33], 264).unwrap();
    builder.set_type(CellType::MerkleProof);
    assert!(builder.into_cell().is_err());
}

#[test]
fn test_pruned_child_keeps_lower_hash() {
    let leaf = cell_u32(0xAB, vec![]);
    let parent = cell_u32(1, vec![leaf.clone()]);
    let pruned_parent = cell_u32(1, vec![pruned_branch(&leaf)]);

    assert_eq!(parent.level(), 0);
    assert_eq!(pruned_parent.level(), 1);
    assert_eq!(pruned_parent.level_mask(), LevelMask::with_level(1));
    assert_eq!(pruned_parent.hashes().len(), 2);
    assert_eq!(pruned_parent.hash(0), parent.repr_hash());
    assert_eq!(pruned_parent.depth(0), parent.repr_depth());
    assert_ne!(pruned_parent.repr_hash(), parent.repr_hash());

    // merkle proof hides one level
    let mut builder = BuilderData::new();
    builder.append_u8(MERKLE_PROOF_TYPE).unwrap();
    builder.append_raw(parent.repr_hash().as_slice(), 256).unwrap();
    builder.append_u16(parent.repr_depth()).unwrap();
    builder.checked_append_reference(pruned_parent).unwrap();
    builder.set_type(CellType::MerkleProof);
    let proof = builder.into_cell().unwrap();
    assert_eq!(proof.cell_type(), CellType::MerkleProof);
    assert!(proof.is_merkle());
    assert_eq!(proof.level(), 0);
    assert!(proof.print().starts_with("p{03"));
}

#[test]
fn test_level_mask() {
    assert_eq!(LevelMask::with_level(0).mask(), 0);
    assert_eq!(LevelMask::with_level(2).mask(), 3);
    assert_eq!(LevelMask::with_mask(5).level(), 2);
    assert_eq!(LevelMask::with_mask(5).calc_hash_index(1), 1);
    assert_eq!(LevelMask::with_mask(5).calc_hash_index(2), 1);
    assert_eq!(LevelMask::with_mask(5).calc_hash_index(3), 2);
    assert!(LevelMask::with_mask(2).is_significant_index(2));
    assert!(!LevelMask::with_mask(2).is_significant_index(1));
    assert_eq!(LevelMask::for_merkle_cell(LevelMask::with_mask(3)).mask(), 1);
    assert_eq!(format!("{}", LevelMask::with_mask(5)), "101");
}

#[test]
fn test_descriptor_bytes() {
    assert_eq!(calc_d1(LevelMask::with_mask(1), false, CellType::PrunedBranch, 0), 0x28);
    assert_eq!(calc_d1(LevelMask::default(), false, CellType::Ordinary, 3), 3);
    assert_eq!(calc_d2(0), 0);
    assert_eq!(calc_d2(9), 3);
    assert_eq!(calc_d2(16), 4);
    assert_eq!(calc_d2(1023), 255);
}

#[test]
fn test_cell_with_params_checks_level_mask() {
    let data = [0x12, 0x80];
    let cell = DataCell::with_params(vec![], &data, CellType::Ordinary, Some(LevelMask::default())).unwrap();
    assert_eq!(cell.bit_length(), 8);
    let err = DataCell::with_params(vec![], &data, CellType::Ordinary, Some(LevelMask::with_mask(1)))
        .expect_err("level mask mismatch must be rejected");
    assert_eq!(err.downcast_ref::<ExceptionCode>(), Some(&ExceptionCode::FormatError));
}
