//! Uniform spatial grid
//!
//! Partitions the square world `[0, world_size)²` into `divisions²` cell
//! buckets. Each bucket holds the ids of the entities whose centre maps to
//! that cell. Positions outside the world are clamped into the border
//! cells, so the index never rejects a coordinate.
//!
//! The grid is the live broad phase during simulation: one [`SpatialGrid::update`]
//! sweep per tick moves entities that crossed a cell boundary and drops the
//! ones scheduled for destruction.

use crate::foundation::math::Vec2;
use crate::world::{Entity, EntityId, World};

/// Integer cell coordinates `(cx, cy)`
pub type CellCoord = (usize, usize);

/// Uniform N×N bucket grid
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    world_size: f32,
    divisions: usize,
    cells: Vec<Vec<EntityId>>,
}

impl SpatialGrid {
    /// Create an empty grid; `divisions` is raised to at least 1
    pub fn new(world_size: f32, divisions: usize) -> Self {
        let divisions = divisions.max(1);
        Self {
            world_size,
            divisions,
            cells: vec![Vec::new(); divisions * divisions],
        }
    }

    /// Cells along each axis
    pub fn divisions(&self) -> usize {
        self.divisions
    }

    /// Side length of one cell in world units
    pub fn cell_size(&self) -> f32 {
        self.world_size / self.divisions as f32
    }

    /// Map a position to its (clamped) cell
    ///
    /// Float-to-int casts saturate and map NaN to zero, so any input lands
    /// inside `[0, divisions-1]²`.
    pub fn cell_of_position(&self, position: &Vec2) -> CellCoord {
        (self.axis_cell(position.x), self.axis_cell(position.y))
    }

    /// Map an entity to its cell
    pub fn cell_of(&self, entity: &Entity) -> CellCoord {
        self.cell_of_position(&entity.position)
    }

    fn axis_cell(&self, coordinate: f32) -> usize {
        let cell = (coordinate / self.world_size * self.divisions as f32).floor() as i64;
        cell.clamp(0, self.divisions as i64 - 1) as usize
    }

    fn index(&self, (cx, cy): CellCoord) -> usize {
        cy * self.divisions + cx
    }

    /// Append an entity to the bucket of its current cell
    ///
    /// No duplicate check: inserting an entity that is already indexed
    /// leaves two entries until the next [`SpatialGrid::remove`].
    pub fn insert(&mut self, entity: &Entity) {
        let cell = self.cell_of(entity);
        self.insert_at(entity.id(), cell);
    }

    /// Append an id to an explicit bucket (out-of-range coordinates are clamped)
    pub fn insert_at(&mut self, id: EntityId, (cx, cy): CellCoord) {
        let last = self.divisions - 1;
        let index = self.index((cx.min(last), cy.min(last)));
        self.cells[index].push(id);
    }

    /// Remove every entry for `id`; scans all buckets
    pub fn remove(&mut self, id: EntityId) {
        for bucket in &mut self.cells {
            bucket.retain(|&entry| entry != id);
        }
    }

    /// Re-bucket every indexed entity for the current tick
    ///
    /// Entries whose entity is gone or scheduled for destruction are
    /// dropped; entries whose cell changed move to the end of their new
    /// bucket. Must run before the tick's first query.
    pub fn update(&mut self, world: &World) {
        let mut moved: Vec<(usize, EntityId)> = Vec::new();
        let mut dropped = 0usize;

        for index in 0..self.cells.len() {
            let bucket = std::mem::take(&mut self.cells[index]);
            let mut kept = Vec::with_capacity(bucket.len());
            for id in bucket {
                match world.get(id) {
                    Some(entity) if !entity.is_destroy_scheduled() => {
                        let target = self.index(self.cell_of(entity));
                        if target == index {
                            kept.push(id);
                        } else {
                            moved.push((target, id));
                        }
                    }
                    _ => dropped += 1,
                }
            }
            self.cells[index] = kept;
        }

        if !moved.is_empty() || dropped > 0 {
            log::trace!("grid update: {} moved, {} dropped", moved.len(), dropped);
        }
        for (target, id) in moved {
            self.cells[target].push(id);
        }
    }

    /// Move one entity's entry after it moved away from `previous`
    ///
    /// Only the bucket of `previous` is searched; returns `false` when the
    /// cell is unchanged or no entry was found there.
    pub fn refresh(&mut self, entity: &Entity, previous: &Vec2) -> bool {
        let from = self.index(self.cell_of_position(previous));
        let to = self.index(self.cell_of(entity));
        if from == to {
            return false;
        }
        let id = entity.id();
        let Some(slot) = self.cells[from].iter().position(|&entry| entry == id) else {
            return false;
        };
        self.cells[from].remove(slot);
        self.cells[to].push(id);
        true
    }

    /// Entities in the cell of `entity` and its up-to-8 neighbours
    ///
    /// Includes `entity` itself; callers skip the self pair. Buckets are
    /// visited row by row and keep insertion order.
    pub fn query(&self, entity: &Entity) -> Vec<EntityId> {
        self.query_cell(self.cell_of(entity))
    }

    /// Entities in the 3×3 neighbourhood around `cell`
    pub fn query_cell(&self, (cx, cy): CellCoord) -> Vec<EntityId> {
        let last = self.divisions - 1;
        self.query_range(
            (cx.saturating_sub(1), cy.saturating_sub(1)),
            ((cx + 1).min(last), (cy + 1).min(last)),
        )
    }

    /// Neighbourhood of `center` widened to every cell within `reach`
    ///
    /// Never smaller than the 3×3 neighbourhood, and equal to it while
    /// `reach` does not exceed [`SpatialGrid::cell_size`].
    pub fn query_reach(&self, center: &Vec2, reach: f32) -> Vec<EntityId> {
        let last = self.divisions - 1;
        let (cx, cy) = self.cell_of_position(center);
        let reach = Vec2::new(reach, reach);
        let (lx, ly) = self.cell_of_position(&(center - reach));
        let (hx, hy) = self.cell_of_position(&(center + reach));
        self.query_range(
            (lx.min(cx.saturating_sub(1)), ly.min(cy.saturating_sub(1))),
            (hx.max((cx + 1).min(last)), hy.max((cy + 1).min(last))),
        )
    }

    fn query_range(&self, (x0, y0): CellCoord, (x1, y1): CellCoord) -> Vec<EntityId> {
        let mut result = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                result.extend_from_slice(&self.cells[self.index((x, y))]);
            }
        }
        result
    }

    /// The bucket at `(cx, cy)`, or an empty slice when out of range
    pub fn bucket(&self, cx: usize, cy: usize) -> &[EntityId] {
        if cx < self.divisions && cy < self.divisions {
            &self.cells[self.index((cx, cy))]
        } else {
            &[]
        }
    }

    /// Total entries across all buckets
    pub fn entity_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Empty every bucket
    pub fn clear(&mut self) {
        for bucket in &mut self.cells {
            bucket.clear();
        }
    }
}
