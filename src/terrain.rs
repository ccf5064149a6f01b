/*
 * Terrain Module
 *
 * The read-only surface agents query for height and slope. Heights are on a
 * 0..=255 scale (greyscale heightmaps); higher ground slows agents down via
 * scale_by_height. Loading heightmaps from images is left to the caller,
 * which hands over raw heights.
 */

use glam::Vec2;

use crate::error::{Result, SimError};

pub const MAX_TERRAIN_HEIGHT: f32 = 255.0;

pub trait Terrain {
    fn height_at(&self, x: f32, y: f32) -> Result<f32>;

    fn gradient_at(&self, x: f32, y: f32) -> Result<Vec2>;

    // Clamp a world position into the queryable range
    fn clamp(&self, position: Vec2) -> Vec2;

    // max(lower_bound, value * (255 - height) / 255)
    fn scale_by_height(&self, lower_bound: f32, value: f32, position: Vec2) -> Result<f32> {
        let height = self.height_at(position.x, position.y)?;
        let factor = (MAX_TERRAIN_HEIGHT - height) / MAX_TERRAIN_HEIGHT;
        Ok(lower_bound.max(factor * value))
    }
}

// Level ground everywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain;

impl Terrain for FlatTerrain {
    fn height_at(&self, _x: f32, _y: f32) -> Result<f32> {
        Ok(0.0)
    }

    fn gradient_at(&self, _x: f32, _y: f32) -> Result<Vec2> {
        Ok(Vec2::ZERO)
    }

    fn clamp(&self, position: Vec2) -> Vec2 {
        position
    }
}

#[derive(Debug, Clone)]
pub struct Heightmap {
    width: usize,
    height: usize,
    heights: Vec<f32>,
    gradients: Vec<Vec2>,
    max_height: f32,
}

impl Heightmap {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut heights = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                heights.push(f(x, y));
            }
        }
        Self::build(width, height, heights)
    }

    // Row-major heights, `width * height` of them
    pub fn from_heights(width: usize, height: usize, heights: Vec<f32>) -> Result<Self> {
        let expected = width * height;
        if heights.len() != expected || expected == 0 {
            return Err(SimError::TerrainShape {
                width,
                height,
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self::build(width, height, heights))
    }

    fn build(width: usize, height: usize, heights: Vec<f32>) -> Self {
        let max_height = heights.iter().copied().fold(0.0, f32::max);
        let mut map = Self {
            width,
            height,
            heights,
            gradients: Vec::new(),
            max_height,
        };
        map.gradients = map.gradient_field();
        tracing::debug!(width, height, max_height, "heightmap built");
        map
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    #[inline]
    fn sample(&self, x: usize, y: usize) -> f32 {
        self.heights[y * self.width + x]
    }

    // Downhill direction at every cell: the negated height difference,
    // central inside the grid and one-sided along its border
    fn gradient_field(&self) -> Vec<Vec2> {
        let mut field = Vec::with_capacity(self.heights.len());
        for y in 0..self.height {
            for x in 0..self.width {
                let (left, right) = (x.saturating_sub(1), (x + 1).min(self.width - 1));
                let (below, above) = (y.saturating_sub(1), (y + 1).min(self.height - 1));

                let dx = difference(self.sample(right, y), self.sample(left, y), right - left);
                let dy = difference(self.sample(x, above), self.sample(x, below), above - below);
                field.push(-Vec2::new(dx, dy));
            }
        }
        field
    }

    fn cell(&self, x: f32, y: f32) -> Result<usize> {
        let inside = x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32;
        if !inside {
            return Err(SimError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width + x as usize)
    }
}

fn difference(high: f32, low: f32, span: usize) -> f32 {
    if span == 0 {
        0.0
    } else {
        (high - low) / span as f32
    }
}

impl Terrain for Heightmap {
    fn height_at(&self, x: f32, y: f32) -> Result<f32> {
        Ok(self.heights[self.cell(x, y)?])
    }

    fn gradient_at(&self, x: f32, y: f32) -> Result<Vec2> {
        Ok(self.gradients[self.cell(x, y)?])
    }

    fn clamp(&self, position: Vec2) -> Vec2 {
        // Corner of the last cell, so the floored index stays inside
        let max_x = (self.width as f32 - 1.0).max(0.0);
        let max_y = (self.height as f32 - 1.0).max(0.0);
        Vec2::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
    }
}
