// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Error returned when constructing a [SparseArray] with an invalid block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("block size must be a non-zero power of two, got {0}")]
pub struct SparseArrayError(pub usize);

/// SparseArray is a growable array backed by fixed-size blocks,
/// allocated only once a slot within them is written.
///
/// Reading from a block which was never written returns the default value
/// provided on construction. Resizing only touches the table of block pointers,
/// which makes it cheap even for huge, mostly empty index spaces (like the
/// set of all tiles at a given zoom level).
#[derive(Debug, Clone)]
pub struct SparseArray<T> {
    blocks: Vec<Option<Box<[T]>>>,
    block_size: usize,
    block_shift: u32,
    len: usize,
    default: T,
}

impl<T: Clone> SparseArray<T> {
    /// Creates a new SparseArray with `len` slots, all initialized to `default`.
    pub fn new(len: usize, block_size: usize, default: T) -> Result<Self, SparseArrayError> {
        if !block_size.is_power_of_two() {
            return Err(SparseArrayError(block_size));
        }

        let mut array = Self {
            blocks: Vec::new(),
            block_size,
            block_shift: block_size.trailing_zeros(),
            len: 0,
            default,
        };
        array.resize(len);
        Ok(array)
    }

    /// Returns the number of addressable slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Changes the number of addressable slots. Growing never allocates blocks,
    /// shrinking drops blocks which are entirely out of range.
    pub fn resize(&mut self, len: usize) {
        let block_count = len.div_ceil(self.block_size);
        self.blocks.resize(block_count, None);
        self.len = len;
    }

    /// Retrieves the value at `idx`.
    ///
    /// Panics if `idx` is out of bounds.
    pub fn get(&self, idx: usize) -> &T {
        assert!(idx < self.len, "index {idx} out of bounds ({})", self.len);
        match &self.blocks[idx >> self.block_shift] {
            Some(block) => &block[idx & (self.block_size - 1)],
            None => &self.default,
        }
    }

    /// Retrieves a mutable reference to the value at `idx`, allocating
    /// its block if necessary.
    ///
    /// Panics if `idx` is out of bounds.
    pub fn get_mut(&mut self, idx: usize) -> &mut T {
        assert!(idx < self.len, "index {idx} out of bounds ({})", self.len);
        let block_size = self.block_size;
        let default = &self.default;
        let block = self.blocks[idx >> self.block_shift]
            .get_or_insert_with(|| vec![default.clone(); block_size].into_boxed_slice());
        &mut block[idx & (block_size - 1)]
    }

    /// Overwrites the value at `idx`.
    pub fn set(&mut self, idx: usize, value: T) {
        *self.get_mut(idx) = value;
    }

    /// Iterates over all slots of allocated blocks, together with their indices.
    /// Slots in blocks which were never written are skipped.
    pub fn iter_allocated(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let len = self.len;
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(block_idx, block)| block.as_ref().map(|b| (block_idx, b)))
            .flat_map(move |(block_idx, block)| {
                block
                    .iter()
                    .enumerate()
                    .map(move |(i, v)| ((block_idx << self.block_shift) + i, v))
            })
            .take_while(move |&(idx, _)| idx < len)
    }
}
