//! Spatial partitioning grid
//!
//! Circles are bucketed into fixed `GRID_SIZE` cells so collision queries only
//! look at neighbours. The grid is rebuilt wholesale from the owner's list each
//! frame; handles are indices into that list.
//!
//! Buckets are kept in first-touched order so that pair iteration is
//! reproducible for a given insertion order.

use rustc_hash::{FxHashMap, FxHashSet};

use super::circle::{CellKey, Circle};

#[derive(Debug, Clone, Default)]
pub struct PositionGrid {
    index: FxHashMap<CellKey, usize>,
    buckets: Vec<Vec<usize>>,
}

impl PositionGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.buckets.clear();
    }

    /// Repopulate from scratch with `(handle, circle)` entries
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (usize, &'a Circle)>,
    {
        self.clear();
        for (handle, circle) in entries {
            for cell in circle.cells() {
                let bucket = *self.index.entry(*cell).or_insert_with(|| {
                    self.buckets.push(Vec::new());
                    self.buckets.len() - 1
                });
                self.buckets[bucket].push(handle);
            }
        }
    }

    /// Handles stored in one cell
    pub fn cell(&self, key: CellKey) -> &[usize] {
        self.index
            .get(&key)
            .map(|&bucket| self.buckets[bucket].as_slice())
            .unwrap_or(&[])
    }

    /// Every handle sharing a cell with `circle`, deduplicated, in first-seen order
    pub fn query_nearby(&self, circle: &Circle, exclude: Option<usize>) -> Vec<usize> {
        let mut nearby = Vec::new();
        let mut seen = FxHashSet::default();
        for cell in circle.cells() {
            for &handle in self.cell(*cell) {
                if Some(handle) != exclude && seen.insert(handle) {
                    nearby.push(handle);
                }
            }
        }
        nearby
    }

    /// Each unordered pair of handles sharing at least one cell, exactly once
    pub fn iterate_pairs(&self) -> Pairs<'_> {
        Pairs {
            buckets: &self.buckets,
            bucket: 0,
            a: 0,
            b: 1,
            seen: FxHashSet::default(),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Lazy pair iterator over a [`PositionGrid`]
pub struct Pairs<'a> {
    buckets: &'a [Vec<usize>],
    bucket: usize,
    a: usize,
    b: usize,
    seen: FxHashSet<(usize, usize)>,
}

impl Iterator for Pairs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(handles) = self.buckets.get(self.bucket) {
            if self.b >= handles.len() {
                self.a += 1;
                self.b = self.a + 1;
                if self.b >= handles.len() {
                    self.bucket += 1;
                    self.a = 0;
                    self.b = 1;
                }
                continue;
            }

            let (first, second) = (handles[self.a], handles[self.b]);
            self.b += 1;
            if first == second {
                continue;
            }
            if self.seen.insert((first.min(second), first.max(second))) {
                return Some((first, second));
            }
        }
        None
    }
}
