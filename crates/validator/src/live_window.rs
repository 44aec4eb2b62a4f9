/// Window of live nodes.
///
/// Nodes are tracked by their local index from a `NodeSideTable`, which is
/// handed out in first-occurrence order. Bits are stored relative to a basis
/// index. At the end of an extended block, once nothing is live, the window
/// slides its basis past every index seen so far, so the bitset only ever
/// spans the nodes first seen in the current extended block.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("local index {index} lies below the live window basis {basis}")]
    BelowBasis { index: u32, basis: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct LiveNodeWindow {
    basis: u32,
    /// One past the highest index ever added.
    high_water: u32,
    bits: Vec<u64>,
    live: usize,
}

impl LiveNodeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn basis(&self) -> u32 {
        self.basis
    }

    pub fn add(&mut self, index: u32) -> Result<(), WindowError> {
        let offset = self.offset(index).ok_or(WindowError::BelowBasis {
            index,
            basis: self.basis,
        })?;
        let (w, b) = (offset / 64, offset % 64);
        if w >= self.bits.len() {
            self.bits.resize(w + 1, 0);
        }
        let mask = 1_u64 << b;
        if self.bits[w] & mask == 0 {
            self.bits[w] |= mask;
            self.live += 1;
        }
        self.high_water = self.high_water.max(index + 1);
        Ok(())
    }

    pub fn remove(&mut self, index: u32) {
        let Some(offset) = self.offset(index) else { return };
        let (w, b) = (offset / 64, offset % 64);
        if let Some(word) = self.bits.get_mut(w) {
            let mask = 1_u64 << b;
            if *word & mask != 0 {
                *word &= !mask;
                self.live -= 1;
            }
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        match self.offset(index) {
            Some(offset) => self
                .bits
                .get(offset / 64)
                .is_some_and(|word| (word >> (offset % 64)) & 1 == 1),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn len(&self) -> usize {
        self.live
    }

    /// Re-anchor the basis one past the highest index ever added. Returns
    /// false, leaving the window untouched, while anything is still live.
    pub fn start_new_window(&mut self) -> bool {
        if self.live != 0 {
            return false;
        }
        self.basis = self.basis.max(self.high_water);
        self.bits.clear();
        true
    }

    /// Live indexes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let basis = self.basis;
        self.bits.iter().enumerate().flat_map(move |(w, &word)| {
            (0..64u32)
                .filter(move |b| (word >> b) & 1 == 1)
                .map(move |b| basis + w as u32 * 64 + b)
        })
    }

    fn offset(&self, index: u32) -> Option<usize> {
        index.checked_sub(self.basis).map(|o| o as usize)
    }
}
