//! Uniform grid of square buckets covering the world.
//!
//! Buckets only hold IDs; exact distance filtering happens in
//! [`World`](crate::world::World), which owns the positions.

use glam::Vec2;

/// One grid square.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub cells: Vec<u32>,
    pub food: Vec<u32>,
}

/// Grid of `cols * rows` buckets of side `bucket_size`.
#[derive(Debug)]
pub struct SpatialIndex {
    bucket_size: f32,
    cols: usize,
    rows: usize,
    buckets: Vec<Bucket>,
}

impl SpatialIndex {
    /// Create a grid covering a `width` x `height` world.
    pub fn new(width: f32, height: f32, bucket_size: f32) -> Self {
        let cols = ((width / bucket_size).ceil() as usize).max(1);
        let rows = ((height / bucket_size).ceil() as usize).max(1);
        Self {
            bucket_size,
            cols,
            rows,
            buckets: vec![Bucket::default(); cols * rows],
        }
    }

    /// Grid coordinates for a position (clamped to the grid).
    #[inline]
    fn coords(&self, position: Vec2) -> (usize, usize) {
        let gx = (position.x / self.bucket_size).floor().max(0.0) as usize;
        let gy = (position.y / self.bucket_size).floor().max(0.0) as usize;
        (gx.min(self.cols - 1), gy.min(self.rows - 1))
    }

    /// Bucket index for a position.
    #[inline]
    pub fn bucket_of(&self, position: Vec2) -> usize {
        let (gx, gy) = self.coords(position);
        gy * self.cols + gx
    }

    /// Empty every bucket, keeping allocations.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.cells.clear();
            bucket.food.clear();
        }
    }

    /// File a cell and return its bucket.
    #[inline]
    pub fn insert_cell(&mut self, id: u32, position: Vec2) -> usize {
        let idx = self.bucket_of(position);
        self.buckets[idx].cells.push(id);
        idx
    }

    /// File a food pellet and return its bucket.
    #[inline]
    pub fn insert_food(&mut self, id: u32, position: Vec2) -> usize {
        let idx = self.bucket_of(position);
        self.buckets[idx].food.push(id);
        idx
    }

    #[inline]
    pub fn remove_cell(&mut self, id: u32, bucket: usize) {
        if let Some(b) = self.buckets.get_mut(bucket) {
            if let Some(pos) = b.cells.iter().position(|&c| c == id) {
                b.cells.swap_remove(pos);
            }
        }
    }

    #[inline]
    pub fn remove_food(&mut self, id: u32, bucket: usize) {
        if let Some(b) = self.buckets.get_mut(bucket) {
            if let Some(pos) = b.food.iter().position(|&f| f == id) {
                b.food.swap_remove(pos);
            }
        }
    }

    /// Move a cell to the bucket matching `position`; returns the new bucket.
    #[inline]
    pub fn relocate_cell(&mut self, id: u32, bucket: usize, position: Vec2) -> usize {
        let idx = self.bucket_of(position);
        if idx != bucket {
            self.remove_cell(id, bucket);
            self.buckets[idx].cells.push(id);
        }
        idx
    }

    /// Visit the `(2*ceil(r/S)+1)^2` buckets centered on `center`'s bucket.
    fn for_each_bucket(&self, center: Vec2, radius: f32, mut f: impl FnMut(&Bucket)) {
        let reach = (radius.max(0.0) / self.bucket_size).ceil() as usize;
        let (cx, cy) = self.coords(center);
        let min_x = cx.saturating_sub(reach);
        let max_x = (cx + reach).min(self.cols - 1);
        let min_y = cy.saturating_sub(reach);
        let max_y = (cy + reach).min(self.rows - 1);

        for gy in min_y..=max_y {
            let row = gy * self.cols;
            for gx in min_x..=max_x {
                f(&self.buckets[row + gx]);
            }
        }
    }

    /// Candidate cell IDs near `center` (not distance filtered).
    pub fn cell_candidates(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::with_capacity(32);
        self.for_each_bucket(center, radius, |b| out.extend_from_slice(&b.cells));
        out
    }

    /// Candidate food IDs near `center` (not distance filtered).
    pub fn food_candidates(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::with_capacity(32);
        self.for_each_bucket(center, radius, |b| out.extend_from_slice(&b.food));
        out
    }

    /// Whether any bucket still lists this cell ID.
    pub fn contains_cell(&self, id: u32) -> bool {
        self.buckets.iter().any(|b| b.cells.contains(&id))
    }

    /// Total number of cell entries across all buckets.
    pub fn cell_entries(&self) -> usize {
        self.buckets.iter().map(|b| b.cells.len()).sum()
    }

    /// Total number of food entries across all buckets.
    pub fn food_entries(&self) -> usize {
        self.buckets.iter().map(|b| b.food.len()).sum()
    }
}
