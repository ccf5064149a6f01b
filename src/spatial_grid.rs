/*
 * Spatial Grid Module
 *
 * Uniform grid over the world for neighbour lookups. A query returns a
 * superset of the agents within the radius; the perception filter then
 * applies the exact test, so results match the linear scan.
 *
 * Agents move one at a time during a tick, so the grid is kept current with
 * relocate() after every move instead of being rebuilt. Positions outside
 * the world are clamped into the edge cells, which keeps the superset
 * property (clamping is monotone).
 */

use glam::Vec2;

use crate::population::{BoidId, Population};

pub struct SpatialGrid {
    pub cell_size: f32,
    pub columns: usize,
    pub rows: usize,
    cells: Vec<Vec<BoidId>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, width: f32, height: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        let columns = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);

        Self {
            cell_size,
            columns,
            rows,
            cells: vec![Vec::new(); columns * rows],
        }
    }

    // Grid over the current population
    pub fn build(cell_size: f32, width: f32, height: f32, boids: &Population) -> Self {
        let mut grid = Self::new(cell_size, width, height);
        for (id, boid) in boids.iter() {
            grid.insert(id, boid.position);
        }
        grid
    }

    #[inline]
    fn column_of(&self, x: f32) -> usize {
        (x / self.cell_size).floor().clamp(0.0, self.columns as f32 - 1.0) as usize
    }

    #[inline]
    fn row_of(&self, y: f32) -> usize {
        (y / self.cell_size).floor().clamp(0.0, self.rows as f32 - 1.0) as usize
    }

    #[inline]
    fn cell_index(&self, position: Vec2) -> usize {
        self.row_of(position.y) * self.columns + self.column_of(position.x)
    }

    pub fn insert(&mut self, id: BoidId, position: Vec2) {
        let index = self.cell_index(position);
        self.cells[index].push(id);
    }

    pub fn remove(&mut self, id: BoidId, position: Vec2) -> bool {
        let index = self.cell_index(position);
        let cell = &mut self.cells[index];
        match cell.iter().position(|member| *member == id) {
            Some(slot) => {
                cell.swap_remove(slot);
                true
            }
            None => false,
        }
    }

    // Move an agent between cells after its position changed
    pub fn relocate(&mut self, id: BoidId, from: Vec2, to: Vec2) {
        if self.cell_index(from) != self.cell_index(to) && self.remove(id, from) {
            self.insert(id, to);
        }
    }

    // Ids in every cell touching the square around `position`, cell by cell
    pub fn query(&self, position: Vec2, radius: f32) -> Vec<BoidId> {
        let (left, right) = (self.column_of(position.x - radius), self.column_of(position.x + radius));
        let (bottom, top) = (self.row_of(position.y - radius), self.row_of(position.y + radius));

        let mut result = Vec::new();
        for row in bottom..=top {
            let row_start = row * self.columns;
            for column in left..=right {
                result.extend_from_slice(&self.cells[row_start + column]);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
