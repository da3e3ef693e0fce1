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

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    io::{Cursor, Read, Write},
};

use crc::{Crc, CRC_32_ISCSI, Digest};
const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

use crate::{
    cell::{calc_d1, calc_d2, Cell, CellType, DataCell, LevelMask, DEPTH_SIZE, SHA256_SIZE},
    cell::{EXOTIC_D1_FLAG, HASHES_D1_FLAG, LEVELMASK_D1_OFFSET, REFS_D1_MASK},
    error, fail, BocError, ByteOrderRead, Result, UInt256, MAX_REFERENCES_COUNT,
};
use smallvec::SmallVec;

const BOC_GENERIC_TAG: u32 = 0xb5ee9c72;

// has index | has CRC | has cache bits | flags   | ref_size
// 7         | 6       | 5              | 4 3     | 2 1 0
const INDEX_FLAG: u8 = 0b1000_0000;
const CRC_FLAG: u8 = 0b0100_0000;
const CACHE_BITS_FLAG: u8 = 0b0010_0000;
const RESERVED_FLAGS: u8 = 0b0001_1000;
const REF_SIZE_MASK: u8 = 0b0000_0111;

fn eof(what: &'static str) -> impl Fn(std::io::Error) -> failure::Error {
    move |_| error!(BocError::UnexpectedEof(what))
}

fn write_uint<T: Write>(dest: &mut T, value: usize, bytes: usize) -> Result<()> {
    dest.write_all(&(value as u64).to_be_bytes()[(8 - bytes)..8])?;
    Ok(())
}

fn number_of_bytes_to_fit(l: usize) -> usize {
    let mut n = 0;
    let mut l1 = l;
    while l1 != 0 {
        l1 >>= 8;
        n += 1;
    }
    n
}

// unique cell of the serialized graph
struct IdxItem {
    cell: Cell,
    index: usize,
    repeats: usize,
}

/// Flattens cells forest into bag of cells. Cells are deduplicated by representation hash
/// and ordered so every reference points to a greater index. Roots must be distinct
pub struct BocWriter {
    roots: Vec<UInt256>,
    cells: Vec<IdxItem>,
    indexes: HashMap<UInt256, usize>,
}

/// Serializes single root with CRC and without index
pub fn write_boc(root_cell: &Cell) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    BocWriter::with_root(root_cell)?.write(&mut buf)?;
    Ok(buf)
}

impl BocWriter {
    pub fn with_root(root_cell: &Cell) -> Result<Self> {
        Self::with_roots([root_cell.clone()])
    }

    pub fn with_roots(root_cells: impl IntoIterator<Item = Cell>) -> Result<Self> {
        #[cfg(not(target_family = "wasm"))]
        let now = std::time::Instant::now();

        let mut roots = Vec::new();
        let mut cells: Vec<IdxItem> = Vec::new();
        let mut indexes: HashMap<UInt256, usize> = HashMap::new();
        let mut next_index = 0;

        // breadth-first traversal, repeats are counted but not emitted twice
        let mut layer: Vec<Cell> = root_cells.into_iter().collect();
        let mut unique_roots = HashSet::new();
        for (position, cell) in layer.iter().enumerate() {
            let hash = cell.repr_hash();
            if !unique_roots.insert(hash) {
                fail!(BocError::DuplicateRoot(position))
            }
            roots.push(hash);
        }
        while !layer.is_empty() {
            let mut next = Vec::with_capacity(layer.len() * MAX_REFERENCES_COUNT);
            for cell in layer {
                match indexes.entry(cell.repr_hash()) {
                    Entry::Occupied(entry) => cells[*entry.get()].repeats += 1,
                    Entry::Vacant(entry) => {
                        entry.insert(cells.len());
                        next.extend(cell.clone_references());
                        cells.push(IdxItem { cell, index: next_index, repeats: 0 });
                        next_index += 1;
                    }
                }
            }
            layer = next;
        }

        // a cell reached by a short path first must be moved behind all its parents
        let mut passes = 0;
        loop {
            let mut changed = false;
            for i in 0..cells.len() {
                let parent_index = cells[i].index;
                for child in cells[i].cell.clone_references() {
                    let position = *indexes.get(&child.repr_hash())
                        .ok_or_else(|| error!("child {:x} was not flattened", child.repr_hash()))?;
                    if cells[position].index < parent_index {
                        cells[position].index = next_index;
                        next_index += 1;
                        changed = true;
                    }
                }
            }
            if !changed {
                break
            }
            passes += 1;
            if passes > cells.len() {
                fail!(BocError::ReorderNotConverged(passes))
            }
        }

        cells.sort_by_key(|item| item.index);
        indexes.clear();
        for (i, item) in cells.iter_mut().enumerate() {
            item.index = i;
            indexes.insert(item.cell.repr_hash(), i);
        }

        #[cfg(not(target_family = "wasm"))]
        log::trace!(
            "TIME flatten cells: {}ms, cells: {}, roots: {}, reorder passes: {}",
            now.elapsed().as_millis(), cells.len(), roots.len(), passes
        );

        Ok(Self { roots, cells, indexes })
    }

    pub fn roots_count(&self) -> usize {
        self.roots.len()
    }

    pub fn cells_count(&self) -> usize {
        self.cells.len()
    }

    /// Writes with CRC and without index
    pub fn write<T: Write>(self, dest: &mut T) -> Result<()> {
        self.write_ex(dest, false, true, false, false)
    }

    /// `include_hashes` stores hashes and depths of every significant level
    /// in front of cell data (pruned branches store representation ones only)
    pub fn write_ex<T: Write>(
        self,
        dest: &mut T,
        include_index: bool,
        include_crc: bool,
        include_cache_bits: bool,
        include_hashes: bool,
    ) -> Result<()> {
        if include_crc {
            let mut dest_wrapped = IoCrcFilter::new_writer(dest);
            self.write_ex_impl(&mut dest_wrapped, include_index, include_crc, include_cache_bits, include_hashes)?;
            dest_wrapped.finalize()
        } else {
            self.write_ex_impl(dest, include_index, include_crc, include_cache_bits, include_hashes)
        }
    }

    fn write_ex_impl<T: Write>(
        self,
        dest: &mut T,
        include_index: bool,
        include_crc: bool,
        include_cache_bits: bool,
        include_hashes: bool,
    ) -> Result<()> {
        #[cfg(not(target_family = "wasm"))]
        let now = std::time::Instant::now();

        let cells_count = self.cells.len();
        let ref_size = number_of_bytes_to_fit(cells_count).max(1);
        if ref_size > 4 {
            fail!(BocError::WrongRefSize(ref_size))
        }

        let mut flags = ref_size as u8;
        if include_index {
            flags |= INDEX_FLAG;
        }
        if include_crc {
            flags |= CRC_FLAG;
        }
        if include_cache_bits {
            flags |= CACHE_BITS_FLAG;
            if !include_index {
                fail!(BocError::WrongFlags(flags, "cache bits require index"))
            }
        }

        // payload goes first to know the offsets
        let mut payload = Vec::new();
        let mut offsets = Vec::with_capacity(cells_count);
        for item in self.cells.iter() {
            let cell = &item.cell;
            let bits = cell.bit_length();
            let data_len = bits / 8 + usize::from(bits % 8 != 0);
            payload.push(calc_d1(cell.level_mask(), include_hashes, cell.cell_type(), cell.references_count()));
            payload.push(calc_d2(bits));
            if include_hashes {
                if cell.is_pruned() {
                    payload.extend_from_slice(cell.repr_hash().as_slice());
                    payload.extend_from_slice(&cell.repr_depth().to_be_bytes());
                } else {
                    for hash in cell.hashes() {
                        payload.extend_from_slice(hash.as_slice());
                    }
                    for depth in cell.depths() {
                        payload.extend_from_slice(&depth.to_be_bytes());
                    }
                }
            }
            payload.extend_from_slice(&cell.data()[..data_len]);
            for child in cell.clone_references() {
                let child_index = *self.indexes.get(&child.repr_hash())
                    .ok_or_else(|| error!("child {:x} was not flattened", child.repr_hash()))?;
                debug_assert!(child_index > item.index);
                write_uint(&mut payload, child_index, ref_size)?;
            }
            offsets.push(payload.len());
        }
        // cache bit takes the lowest bit of every index entry
        let max_offset = if include_cache_bits { payload.len() * 2 + 1 } else { payload.len() };
        let offset_size = number_of_bytes_to_fit(max_offset).max(1);

        dest.write_all(&BOC_GENERIC_TAG.to_be_bytes())?;
        dest.write_all(&[flags, offset_size as u8])?;
        write_uint(dest, cells_count, ref_size)?;
        write_uint(dest, self.roots.len(), ref_size)?;
        write_uint(dest, 0, ref_size)?; // absent
        write_uint(dest, payload.len(), offset_size)?;

        for root in self.roots.iter() {
            let index = *self.indexes.get(root)
                .ok_or_else(|| error!("root {:x} was not flattened", root))?;
            write_uint(dest, index, ref_size)?;
        }

        if include_index {
            for (item, offset) in self.cells.iter().zip(offsets) {
                let mut value = offset;
                if include_cache_bits {
                    value = value * 2 + usize::from(item.repeats > 0);
                }
                write_uint(dest, value, offset_size)?;
            }
        }

        dest.write_all(&payload)?;

        #[cfg(not(target_family = "wasm"))]
        log::trace!(
            "TIME write boc: {}ms, cells: {}, payload: {} bytes, ref size: {}, offset size: {}",
            now.elapsed().as_millis(), cells_count, payload.len(), ref_size, offset_size
        );
        Ok(())
    }
}

struct RawCell {
    data: Vec<u8>, // with completion tag
    cell_type: CellType,
    level_mask: LevelMask,
    refs: SmallVec<[usize; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BocHeader {
    pub magic: u32,
    pub roots_count: usize,
    pub ref_size: usize,
    pub index_included: bool,
    pub cells_count: usize,
    pub offset_size: usize,
    pub has_crc: bool,
    pub has_cache_bits: bool,
    pub roots_indexes: Vec<usize>,
    pub tot_cells_size: usize,
}

pub struct BocReaderResult {
    pub roots: Vec<Cell>,
    pub header: BocHeader,
}

impl BocReaderResult {
    pub fn withdraw_single_root(mut self) -> Result<Cell> {
        match self.roots.len() {
            0 => fail!("Error parsing cells tree: empty root"),
            1 => Ok(self.roots.remove(0)),
            r => fail!("Error parsing cells tree: too many roots {}", r)
        }
    }
}

#[derive(Default)]
pub struct BocReader;

pub fn read_boc(data: impl AsRef<[u8]>) -> Result<BocReaderResult> {
    let mut cursor = Cursor::new(data);
    BocReader::new().read(&mut cursor)
}

pub fn read_single_root_boc(data: impl AsRef<[u8]>) -> Result<Cell> {
    read_boc(data)?.withdraw_single_root()
}

impl BocReader {
    pub fn new() -> Self { Self }

    pub fn read<T: Read>(self, src: &mut T) -> Result<BocReaderResult> {
        #[cfg(not(target_family = "wasm"))]
        let now = std::time::Instant::now();

        let mut src = IoCrcFilter::new_reader(src);
        let header = Self::read_header(&mut src)?;

        let index = if header.index_included {
            Self::read_index(&mut src, &header)?
        } else {
            Vec::new()
        };

        // Read cells
        #[cfg(not(target_family = "wasm"))]
        let now1 = std::time::Instant::now();
        let mut raw_cells = Vec::new();
        let mut topological = true;
        let mut offset = 0;
        for cell_index in 0..header.cells_count {
            let (raw_cell, size) = Self::read_raw_cell(&mut src, &header, cell_index)?;
            offset += size;
            if let Some(end) = index.get(cell_index) {
                if *end != offset {
                    fail!(BocError::CorruptedCell(cell_index, "index offset mismatch"))
                }
            }
            topological &= raw_cell.refs.iter().all(|r| *r > cell_index);
            raw_cells.push(raw_cell);
        }
        if offset != header.tot_cells_size {
            fail!(BocError::WrongDataSize { real: offset, declared: header.tot_cells_size })
        }
        #[cfg(not(target_family = "wasm"))]
        let read_time = now1.elapsed().as_millis();

        if header.has_crc {
            src.check_crc()?;
        }

        // Resolving references & constructing cells from leaves to roots
        #[cfg(not(target_family = "wasm"))]
        let now1 = std::time::Instant::now();
        let done = if topological {
            Self::build_reversed(raw_cells)?
        } else {
            Self::build_unordered(raw_cells)?
        };
        #[cfg(not(target_family = "wasm"))]
        let constructing_time = now1.elapsed().as_millis();

        let mut roots = Vec::new();
        for i in header.roots_indexes.iter() {
            match done.get(*i).cloned().flatten() {
                Some(root) => roots.push(root),
                None => fail!(BocError::InvalidRootIndex { index: *i, cells: header.cells_count })
            }
        }

        #[cfg(not(target_family = "wasm"))]
        log::trace!(
            "TIME read boc: {}ms (read: {}, creating cells: {}), cells: {}, roots: {}",
            now.elapsed().as_millis(), read_time, constructing_time, header.cells_count, header.roots_count
        );

        Ok(BocReaderResult { roots, header })
    }

    fn read_header<T: Read>(src: &mut T) -> Result<BocHeader> {
        let magic = src.read_be_u32().map_err(eof("magic"))?;
        if magic != BOC_GENERIC_TAG {
            fail!(BocError::WrongMagic(magic))
        }
        let flags = src.read_byte().map_err(eof("flags"))?;
        let index_included = flags & INDEX_FLAG != 0;
        let has_crc = flags & CRC_FLAG != 0;
        let has_cache_bits = flags & CACHE_BITS_FLAG != 0;
        if flags & RESERVED_FLAGS != 0 {
            fail!(BocError::WrongFlags(flags, "non-zero reserved flags"))
        }
        if has_cache_bits && !index_included {
            fail!(BocError::WrongFlags(flags, "cache bits without index"))
        }
        let ref_size = (flags & REF_SIZE_MASK) as usize;
        if ref_size == 0 || ref_size > 4 {
            fail!(BocError::WrongRefSize(ref_size))
        }

        let offset_size = src.read_byte().map_err(eof("offset size"))? as usize;
        if offset_size == 0 || offset_size > 8 {
            fail!(BocError::WrongOffsetSize(offset_size))
        }

        let cells_count = src.read_be_uint(ref_size).map_err(eof("cells count"))?;
        let roots_count = src.read_be_uint(ref_size).map_err(eof("roots count"))?;
        let absent_count = src.read_be_uint(ref_size).map_err(eof("absent count"))?;
        let tot_cells_size = src.read_be_uint(offset_size).map_err(eof("cells size"))?;

        if roots_count > cells_count {
            fail!(BocError::TooManyRoots { roots: roots_count, cells: cells_count })
        }
        if absent_count != 0 {
            fail!(BocError::AbsentCells(absent_count))
        }
        // every cell takes at least two descriptor bytes
        if cells_count > tot_cells_size / 2 {
            fail!(BocError::MaliciousCellCount { cells: cells_count, size: tot_cells_size })
        }

        // counts are not trusted before the data is actually read
        let mut roots_indexes = Vec::new();
        for _ in 0..roots_count {
            let index = src.read_be_uint(ref_size).map_err(eof("root index"))?;
            if index >= cells_count {
                fail!(BocError::InvalidRootIndex { index, cells: cells_count })
            }
            roots_indexes.push(index);
        }

        Ok(BocHeader {
            magic,
            roots_count,
            ref_size,
            index_included,
            cells_count,
            offset_size,
            has_crc,
            has_cache_bits,
            roots_indexes,
            tot_cells_size,
        })
    }

    fn read_index<T: Read>(src: &mut T, header: &BocHeader) -> Result<Vec<usize>> {
        let mut index = Vec::new();
        for _ in 0..header.cells_count {
            let mut offset = src.read_be_uint(header.offset_size).map_err(eof("index"))?;
            if header.has_cache_bits {
                offset /= 2;
            }
            index.push(offset);
        }
        Ok(index)
    }

    // returns cell and its size in payload
    fn read_raw_cell<T: Read>(
        src: &mut T,
        header: &BocHeader,
        cell_index: usize,
    ) -> Result<(RawCell, usize)> {
        let d1 = src.read_byte().map_err(eof("cell descriptor"))?;
        let d2 = src.read_byte().map_err(eof("cell descriptor"))?;
        let refs_count = (d1 & REFS_D1_MASK) as usize;
        if refs_count > MAX_REFERENCES_COUNT {
            fail!(BocError::TooManyRefs { index: cell_index, refs: refs_count })
        }
        let exotic = d1 & EXOTIC_D1_FLAG != 0;
        let with_hashes = d1 & HASHES_D1_FLAG != 0;
        let level_mask = LevelMask::with_mask(d1 >> LEVELMASK_D1_OFFSET);
        let mut size = 2;

        if with_hashes {
            let level = level_mask.level() as usize;
            let hashes_count = if exotic && refs_count == 0 && level != 0 { 1 } else { level + 1 };
            let mut skip = vec![0; hashes_count * (SHA256_SIZE + DEPTH_SIZE)];
            src.read_exact(&mut skip).map_err(eof("cell hashes"))?;
            size += skip.len();
        }

        let data_len = (d2 >> 1) as usize + (d2 & 1) as usize;
        let mut data = vec![0; data_len];
        src.read_exact(&mut data).map_err(eof("cell data"))?;
        size += data_len;
        if d2 & 1 != 0 {
            if data.last() == Some(&0) {
                fail!(BocError::CorruptedCell(cell_index, "completion tag is absent"))
            }
        } else {
            data.push(0x80);
        }

        let mut refs = SmallVec::new();
        for _ in 0..refs_count {
            let reference = src.read_be_uint(header.ref_size).map_err(eof("cell references"))?;
            if reference >= header.cells_count {
                fail!(BocError::InvalidRefIndex { index: cell_index, reference, cells: header.cells_count })
            }
            if reference <= cell_index && !header.index_included {
                fail!(BocError::NotTopologicalOrder { index: cell_index, reference })
            }
            refs.push(reference);
        }
        size += refs_count * header.ref_size;

        let cell_type = if exotic {
            CellType::classify(&data, crate::cell::find_tag(&data), refs_count)
        } else {
            CellType::Ordinary
        };
        Ok((RawCell { data, cell_type, level_mask, refs }, size))
    }

    fn build_cell(raw_cell: RawCell, done: &[Option<Cell>]) -> Result<Cell> {
        let mut refs = Vec::with_capacity(raw_cell.refs.len());
        for r in raw_cell.refs {
            match done.get(r).cloned().flatten() {
                Some(child) => refs.push(child),
                None => fail!("Cell #{} is not constructed yet", r)
            }
        }
        let cell = DataCell::with_params(refs, &raw_cell.data, raw_cell.cell_type, Some(raw_cell.level_mask))?;
        Ok(Cell::with_cell_impl(cell))
    }

    // every reference points forward, so children are ready when parent is built
    fn build_reversed(raw_cells: Vec<RawCell>) -> Result<Vec<Option<Cell>>> {
        let mut done = vec![None; raw_cells.len()];
        for (cell_index, raw_cell) in raw_cells.into_iter().enumerate().rev() {
            done[cell_index] = Some(Self::build_cell(raw_cell, &done)?);
        }
        Ok(done)
    }

    // arbitrary order is allowed with index, cells are built by explicit depth-first worklist
    fn build_unordered(raw_cells: Vec<RawCell>) -> Result<Vec<Option<Cell>>> {
        const NEW: u8 = 0;
        const IN_PROGRESS: u8 = 1;
        const DONE: u8 = 2;
        let count = raw_cells.len();
        let mut state = vec![NEW; count];
        let mut done = vec![None; count];
        let mut raw_cells: Vec<Option<RawCell>> = raw_cells.into_iter().map(Some).collect();
        for start in 0..count {
            let mut stack = vec![(start, false)];
            while let Some((cell_index, expanded)) = stack.pop() {
                if expanded {
                    let raw_cell = raw_cells[cell_index].take()
                        .ok_or_else(|| error!("Cell #{} was already built", cell_index))?;
                    done[cell_index] = Some(Self::build_cell(raw_cell, &done)?);
                    state[cell_index] = DONE;
                    continue
                }
                match state[cell_index] {
                    DONE => continue,
                    IN_PROGRESS => fail!(BocError::CyclicReference(cell_index)),
                    _ => ()
                }
                state[cell_index] = IN_PROGRESS;
                stack.push((cell_index, true));
                if let Some(raw_cell) = &raw_cells[cell_index] {
                    for r in raw_cell.refs.iter() {
                        match state[*r] {
                            IN_PROGRESS => fail!(BocError::CyclicReference(*r)),
                            NEW => stack.push((*r, false)),
                            _ => ()
                        }
                    }
                }
            }
        }
        Ok(done)
    }
}

/// Wraps I/O operations and computes CRC32-C of the data being processed
struct IoCrcFilter<'a, T> {
    io_object: &'a mut T,
    hasher: Digest<'a, u32>
}

impl<'a, T: Write> IoCrcFilter<'a, T> {
    fn new_writer(io_object: &'a mut T) -> Self {
        IoCrcFilter {
            io_object,
            hasher: CASTAGNOLI.digest()
        }
    }

    fn finalize(self) -> Result<()> {
        let crc = self.hasher.finalize();
        self.io_object.write_all(&crc.to_le_bytes())?;
        Ok(())
    }
}

impl<'a, T: Read> IoCrcFilter<'a, T> {
    fn new_reader(io_object: &'a mut T) -> Self {
        IoCrcFilter {
            io_object,
            hasher: CASTAGNOLI.digest()
        }
    }

    fn check_crc(self) -> Result<()> {
        let stored = self.io_object.read_le_u32().map_err(eof("crc"))?;
        let calculated = self.hasher.finalize();
        if stored != calculated {
            fail!(BocError::WrongCrc { calculated, stored })
        }
        Ok(())
    }
}

impl<'a, T> Write for IoCrcFilter<'a, T> where T: Write {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.io_object.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.io_object.flush()
    }
}

impl<'a, T> Read for IoCrcFilter<'a, T> where T: Read {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.io_object.read(buf)?;
        self.hasher.update(&buf[..read]);
        Ok(read)
    }
}

#[cfg(test)]
#[path = "tests/test_boc.rs"]
mod tests;
