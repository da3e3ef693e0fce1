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

use super::*;
use crate::cell::{BuilderData, IBitstring, PRUNED_BRANCH_TYPE, MERKLE_PROOF_TYPE};

const UINT_100_BOC: &str = "B5EE9C7241010101000400000332406BCCC797";
const SHARED_CHILD_FULL_BOC: &str = "B5EE9C72E10102010008000A1102020101010002ABCC181AA4";
const SHARED_CHILD_BARE_BOC: &str = "B5EE9C720101020100080002020101010002AB";

fn uint_100() -> Cell {
    let mut builder = BuilderData::new();
    builder.append_bits(100, 9).unwrap();
    builder.into_cell().unwrap()
}

fn shared_child_tree() -> Cell {
    let child = BuilderData::with_raw(vec![0xAB], 8).unwrap().into_cell().unwrap();
    let mut builder = BuilderData::with_raw(vec![0x01], 8).unwrap();
    builder.checked_append_reference(child.clone()).unwrap();
    builder.checked_append_reference(child).unwrap();
    builder.into_cell().unwrap()
}

fn write_ex(root: &Cell, index: bool, crc: bool, cache_bits: bool) -> Result<Vec<u8>> {
    write_with_hashes(root, index, crc, cache_bits, false)
}

fn write_with_hashes(root: &Cell, index: bool, crc: bool, cache_bits: bool, hashes: bool) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    BocWriter::with_root(root)?.write_ex(&mut buf, index, crc, cache_bits, hashes)?;
    Ok(buf)
}

// binary tree of distinct cells with given depth
fn build_tree(depth: usize, seed: u32) -> Cell {
    let mut builder = BuilderData::new();
    builder.append_u32(seed).unwrap();
    if depth > 0 {
        builder.checked_append_reference(build_tree(depth - 1, seed * 2)).unwrap();
        builder.checked_append_reference(build_tree(depth - 1, seed * 2 + 1)).unwrap();
    }
    builder.into_cell().unwrap()
}

// Merkle proof over a tree with one pruned leaf and the tree it proves
fn merkle_proof_tree() -> (Cell, Cell) {
    let leaf = uint_100();
    let mut builder = BuilderData::new();
    builder.append_u8(PRUNED_BRANCH_TYPE).unwrap();
    builder.append_u8(1).unwrap();
    builder.append_raw(leaf.repr_hash().as_slice(), 256).unwrap();
    builder.append_u16(leaf.repr_depth()).unwrap();
    builder.set_exotic(true);
    let pruned = builder.into_cell().unwrap();

    let inner = BuilderData::with_raw_and_refs(vec![0x55], 8, vec![pruned]).unwrap().into_cell().unwrap();
    let original = BuilderData::with_raw_and_refs(vec![0x55], 8, vec![leaf]).unwrap().into_cell().unwrap();
    let mut builder = BuilderData::new();
    builder.append_u8(MERKLE_PROOF_TYPE).unwrap();
    builder.append_raw(original.repr_hash().as_slice(), 256).unwrap();
    builder.append_u16(original.repr_depth()).unwrap();
    builder.checked_append_reference(inner).unwrap();
    builder.set_exotic(true);
    (builder.into_cell().unwrap(), original)
}

fn check_boc_error(data: &[u8], expected: BocError) {
    let err = read_boc(data).err().expect("reading must fail");
    assert_eq!(err.downcast_ref::<BocError>(), Some(&expected), "{}", err);
}

#[test]
fn test_write_known_boc() {
    let data = write_boc(&uint_100()).unwrap();
    assert_eq!(hex::encode_upper(&data), UINT_100_BOC);

    let data = write_boc(&Cell::default()).unwrap();
    assert_eq!(hex::encode_upper(&data), "B5EE9C724101010100020000004CACB9CD");
}

#[test]
fn test_write_shared_child() {
    let root = shared_child_tree();
    let writer = BocWriter::with_root(&root).unwrap();
    assert_eq!(writer.roots_count(), 1);
    assert_eq!(writer.cells_count(), 2);
    assert_eq!(writer.cells[0].index, 0);
    assert_eq!(writer.cells[1].index, 1);
    assert_eq!(writer.cells[1].repeats, 1);

    assert_eq!(hex::encode_upper(write_ex(&root, true, true, true).unwrap()), SHARED_CHILD_FULL_BOC);
    assert_eq!(hex::encode_upper(write_ex(&root, false, false, false).unwrap()), SHARED_CHILD_BARE_BOC);

    let err = write_ex(&root, false, true, true).expect_err("cache bits require index");
    assert!(matches!(err.downcast_ref::<BocError>(), Some(BocError::WrongFlags(_, _))));
}

#[test]
fn test_read_known_boc() {
    let result = read_boc(hex::decode(SHARED_CHILD_FULL_BOC).unwrap()).unwrap();
    let header = result.header.clone();
    assert_eq!(header.magic, BOC_GENERIC_TAG);
    assert_eq!(header.cells_count, 2);
    assert_eq!(header.roots_count, 1);
    assert_eq!(header.ref_size, 1);
    assert_eq!(header.offset_size, 1);
    assert_eq!(header.tot_cells_size, 8);
    assert!(header.index_included && header.has_crc && header.has_cache_bits);
    assert_eq!(header.roots_indexes, vec![0]);
    let root = result.withdraw_single_root().unwrap();
    assert_eq!(root, shared_child_tree());
    assert_eq!(root.reference(0).unwrap().data(), &[0xAB, 0x80]);

    let root = read_single_root_boc(hex::decode(SHARED_CHILD_BARE_BOC).unwrap()).unwrap();
    assert_eq!(root, shared_child_tree());

    let root = read_single_root_boc(hex::decode(UINT_100_BOC).unwrap()).unwrap();
    assert_eq!(root.bit_length(), 9);
    assert_eq!(root.data(), &[0x32, 0x40]);
}

#[test]
fn test_flag_combinations() {
    let leaf = uint_100();
    let middle = BuilderData::with_raw_and_refs(vec![0xF0], 4, vec![leaf.clone(), Cell::default()])
        .unwrap().into_cell().unwrap();
    let root = BuilderData::with_raw_and_refs(vec![0x12, 0x34], 16, vec![middle, leaf, Cell::default()])
        .unwrap().into_cell().unwrap();
    for (index, crc, cache_bits) in [
        (false, false, false), (true, false, false), (false, true, false), (true, true, true)
    ] {
        let data = write_ex(&root, index, crc, cache_bits).unwrap();
        let result = read_boc(&data).unwrap();
        assert_eq!(result.header.index_included, index);
        assert_eq!(result.header.has_crc, crc);
        assert_eq!(result.header.cells_count, 4);
        assert_eq!(result.withdraw_single_root().unwrap(), root);
    }
}

#[test]
fn test_multiple_roots_keep_order() {
    let first = BuilderData::with_raw(vec![1], 8).unwrap().into_cell().unwrap();
    let second = BuilderData::with_raw_and_refs(vec![2], 8, vec![first.clone()])
        .unwrap().into_cell().unwrap();

    // first is also a child of second, so it is moved behind it
    let writer = BocWriter::with_roots(vec![first.clone(), second.clone()]).unwrap();
    assert_eq!(writer.roots_count(), 2);
    assert_eq!(writer.cells_count(), 2);
    let mut data = Vec::new();
    writer.write(&mut data).unwrap();

    let result = read_boc(&data).unwrap();
    assert_eq!(result.header.roots_count, 2);
    assert_eq!(result.header.roots_indexes, vec![1, 0]);
    assert_eq!(result.roots, vec![first, second]);
    assert!(result.withdraw_single_root().is_err());
}

#[test]
fn test_duplicate_roots_rejected() {
    let first = BuilderData::with_raw(vec![1], 8).unwrap().into_cell().unwrap();
    let second = BuilderData::with_raw(vec![2], 8).unwrap().into_cell().unwrap();
    let err = BocWriter::with_roots(vec![first.clone(), second, first.clone()]).err()
        .expect("repeated root must be rejected");
    assert_eq!(err.downcast_ref::<BocError>(), Some(&BocError::DuplicateRoot(2)));

    // same content built twice is the same root
    let twin = BuilderData::with_raw(vec![1], 8).unwrap().into_cell().unwrap();
    let err = BocWriter::with_roots(vec![first, twin]).err().expect("equal roots must be rejected");
    assert_eq!(err.downcast_ref::<BocError>(), Some(&BocError::DuplicateRoot(1)));
}

#[test]
fn test_exotic_cells_round_trip() {
    let (proof, original) = merkle_proof_tree();
    let restored = read_single_root_boc(write_boc(&proof).unwrap()).unwrap();
    assert_eq!(restored.repr_hash(), proof.repr_hash());
    assert_eq!(restored.cell_type(), CellType::MerkleProof);
    let restored_inner = restored.reference(0).unwrap();
    assert_eq!(restored_inner.level_mask(), LevelMask::with_level(1));
    assert_eq!(restored_inner.hash(0), original.repr_hash());
    assert_eq!(restored_inner.reference(0).unwrap().cell_type(), CellType::PrunedBranch);
}

#[test]
fn test_write_with_hashes() {
    let root = shared_child_tree();
    let data = write_with_hashes(&root, false, false, false, true).unwrap();
    // magic, flags, offset size, 3 counts, cells size and root index take 11 bytes
    let payload = &data[11..];
    assert_eq!(data[9] as usize, payload.len());
    assert_eq!(payload.len(), 8 + 2 * (SHA256_SIZE + DEPTH_SIZE));
    assert_eq!(payload[0], 0x12);
    assert_eq!(payload[1], 0x02);
    assert_eq!(&payload[2..34], root.repr_hash().as_slice());
    assert_eq!(&payload[34..36], &[0, 1]);
    assert_eq!(payload[36], 0x01);
    assert_eq!(read_single_root_boc(&data).unwrap(), root);

    let (proof, original) = merkle_proof_tree();
    for (index, crc, cache_bits) in [(false, false, false), (true, true, false), (true, true, true)] {
        let data = write_with_hashes(&proof, index, crc, cache_bits, true).unwrap();
        assert!(data.len() > write_ex(&proof, index, crc, cache_bits).unwrap().len());
        let restored = read_single_root_boc(&data).unwrap();
        assert_eq!(restored.repr_hash(), proof.repr_hash());
        let inner = restored.reference(0).unwrap();
        assert_eq!(inner.hash(0), original.repr_hash());
        assert!(inner.reference(0).unwrap().is_pruned());
    }
}

#[test]
fn test_large_tree_round_trip() {
    // 511 cells need two bytes per reference and per offset
    let root = build_tree(8, 1);
    assert_eq!(root.count_cells(1000).unwrap(), 511);
    for (index, crc, cache_bits, hashes) in [
        (false, false, false, false), (true, false, false, false),
        (false, true, false, true), (true, true, true, false), (true, true, true, true)
    ] {
        let data = write_with_hashes(&root, index, crc, cache_bits, hashes).unwrap();
        assert_eq!(data[4] & REF_SIZE_MASK, 2);
        assert_eq!(data[5], 2);
        let result = read_boc(&data).unwrap();
        assert_eq!(result.header.ref_size, 2);
        assert_eq!(result.header.offset_size, 2);
        assert_eq!(result.header.cells_count, 511);
        assert_eq!(result.header.has_cache_bits, cache_bits);
        assert_eq!(result.withdraw_single_root().unwrap(), root);
    }
}

#[test]
fn test_cache_bits_widen_offsets() {
    let child = BuilderData::with_raw(vec![0xC3; 100], 800).unwrap().into_cell().unwrap();
    let root = BuilderData::with_raw_and_refs(vec![0x3C; 40], 320, vec![child.clone(), child])
        .unwrap().into_cell().unwrap();

    // payload of 146 bytes fits one byte, doubled offsets do not
    let data = write_ex(&root, true, true, false).unwrap();
    assert_eq!(data[5], 1);
    assert_eq!(data[9], 146);

    let data = write_ex(&root, true, true, true).unwrap();
    assert_eq!(data[5], 2);
    let result = read_boc(&data).unwrap();
    assert_eq!(result.header.offset_size, 2);
    assert_eq!(result.header.tot_cells_size, 146);
    assert_eq!(result.withdraw_single_root().unwrap(), root);
}

#[test]
fn test_read_unordered_with_index() {
    // leaf goes first, root refers back to it
    let data = hex::decode("B5EE9C72810102010005010205".to_owned() + "0000" + "010000").unwrap();
    let root = read_single_root_boc(&data).unwrap();
    let mut builder = BuilderData::new();
    builder.checked_append_reference(Cell::default()).unwrap();
    assert_eq!(root, builder.into_cell().unwrap());

    // same order without index is rejected
    let data = hex::decode("B5EE9C72010102010005010000010000").unwrap();
    check_boc_error(&data, BocError::NotTopologicalOrder { index: 1, reference: 0 });
}

#[test]
fn test_read_cycle() {
    let data = hex::decode("B5EE9C7281010201000600".to_owned() + "0306" + "010001" + "010000").unwrap();
    check_boc_error(&data, BocError::CyclicReference(0));
}

#[test]
fn test_wrong_header() {
    let valid = hex::decode(UINT_100_BOC).unwrap();

    let mut data = valid.clone();
    data[0] = 0xB6;
    check_boc_error(&data, BocError::WrongMagic(0xB6EE9C72));

    let mut data = valid.clone();
    data[4] = 0x49;
    check_boc_error(&data, BocError::WrongFlags(0x49, "non-zero reserved flags"));

    let mut data = valid.clone();
    data[4] = 0x61;
    check_boc_error(&data, BocError::WrongFlags(0x61, "cache bits without index"));

    let mut data = valid.clone();
    data[4] = 0x40;
    check_boc_error(&data, BocError::WrongRefSize(0));

    let mut data = valid.clone();
    data[5] = 0;
    check_boc_error(&data, BocError::WrongOffsetSize(0));

    let mut data = valid.clone();
    data[7] = 2;
    check_boc_error(&data, BocError::TooManyRoots { roots: 2, cells: 1 });

    let mut data = valid.clone();
    data[8] = 1;
    check_boc_error(&data, BocError::AbsentCells(1));

    let mut data = valid.clone();
    data[10] = 1;
    check_boc_error(&data, BocError::InvalidRootIndex { index: 1, cells: 1 });

    check_boc_error(&valid[..10], BocError::UnexpectedEof("root index"));
    check_boc_error(&valid[..2], BocError::UnexpectedEof("magic"));
}

#[test]
fn test_malicious_cells_count() {
    let data = hex::decode("B5EE9C7201010501000400").unwrap();
    check_boc_error(&data, BocError::MaliciousCellCount { cells: 5, size: 4 });
}

#[test]
fn test_huge_counts_fail_on_eof() {
    // 4-byte counts and 8-byte size pass the header checks, the data is not there
    let data = hex::decode("B5EE9C720408FFFFFFFFFFFFFFFF00000000FFFFFFFFFFFFFFFF").unwrap();
    check_boc_error(&data, BocError::UnexpectedEof("root index"));

    let data = hex::decode("B5EE9C72840800FFFFFF000000010000000000000000FFFFFFFF000000000000").unwrap();
    check_boc_error(&data, BocError::UnexpectedEof("index"));
}

#[test]
fn test_wrong_cells() {
    let valid = hex::decode(UINT_100_BOC).unwrap();

    let mut data = valid.clone();
    data[13] = 0x33;
    let err = read_boc(&data).err().expect("crc must be checked");
    assert!(matches!(err.downcast_ref::<BocError>(), Some(BocError::WrongCrc { .. })));

    let mut data = valid.clone();
    data[14] = 0x00;
    check_boc_error(&data, BocError::CorruptedCell(0, "completion tag is absent"));

    let data = hex::decode("B5EE9C72010101010002000500").unwrap();
    check_boc_error(&data, BocError::TooManyRefs { index: 0, refs: 5 });

    let data = hex::decode("B5EE9C7201010101000300010001").unwrap();
    check_boc_error(&data, BocError::InvalidRefIndex { index: 0, reference: 1, cells: 1 });

    let data = hex::decode("B5EE9C7201010101000300010000").unwrap();
    check_boc_error(&data, BocError::NotTopologicalOrder { index: 0, reference: 0 });

    let mut data = hex::decode(SHARED_CHILD_BARE_BOC).unwrap();
    data[9] = 0x0A;
    check_boc_error(&data, BocError::WrongDataSize { real: 8, declared: 10 });

    let mut data = hex::decode(SHARED_CHILD_FULL_BOC).unwrap();
    data[11] = 0x0C;
    check_boc_error(&data, BocError::CorruptedCell(0, "index offset mismatch"));
}

#[test]
fn test_crc32c() {
    assert_eq!(CASTAGNOLI.checksum(b"123456789"), 0xe3069283);
}
