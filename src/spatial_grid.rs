/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for neighbor candidate lookups.
 * It divides the domain [0, L) x [0, L) into square cells no smaller than
 * the requested size, so a radius query only has to scan the cells within
 * reach instead of every bird.
 *
 * The grid does not wrap around the domain edges: a bird near x = 0 does not
 * see candidates near x = L. This matches the brute-force pairwise check
 * used by the step kernel, which compares raw post-wrap coordinates.
 *
 * Candidates come back sorted by index. Summing neighbor headings in that
 * order gives exactly the same floating-point result as the brute-force loop.
 */

use glam::DVec2;

// Upper bound on cells per axis; bigger cells stay correct, only slower
const MAX_GRID_DIM: usize = 1024;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    pub cell_size: f64,
    pub grid_size: usize,
    reach: isize,
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    /// Grid for radius queries of `radius` over a domain of side `world_size`.
    /// `cell_size` is the requested bucket side; it is widened if the domain
    /// would otherwise need more than `MAX_GRID_DIM` cells per axis.
    pub fn new(cell_size: f64, radius: f64, world_size: f64) -> Self {
        let cell_size = cell_size.max(world_size / MAX_GRID_DIM as f64);
        let grid_size = ((world_size / cell_size).ceil() as usize).clamp(1, MAX_GRID_DIM);
        // Scanning past the grid edge adds no cells
        let reach = (radius / cell_size).ceil().clamp(1.0, grid_size as f64) as isize;

        Self {
            cell_size,
            grid_size,
            reach,
            cells: vec![Vec::new(); grid_size * grid_size],
        }
    }

    /// Grid holding every position of the slice.
    pub fn build(positions: &[DVec2], cell_size: f64, radius: f64, world_size: f64) -> Self {
        let mut grid = Self::new(cell_size, radius, world_size);
        for (i, &p) in positions.iter().enumerate() {
            grid.insert(i, p);
        }
        grid
    }

    // Cell coordinate along one axis, clamped into the grid
    #[inline]
    fn axis_cell(&self, coord: f64) -> isize {
        let max = self.grid_size as isize - 1;
        ((coord / self.cell_size).floor() as isize).clamp(0, max)
    }

    #[inline]
    pub fn pos_to_cell_index(&self, pos: DVec2) -> usize {
        let gx = self.axis_cell(pos.x) as usize;
        let gy = self.axis_cell(pos.y) as usize;
        gy * self.grid_size + gx
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    #[inline]
    pub fn insert(&mut self, index: usize, position: DVec2) {
        let cell = self.pos_to_cell_index(position);
        self.cells[cell].push(index);
    }

    /// Indices of every bird in a cell within reach of `position`, ascending.
    pub fn nearby_indices(&self, position: DVec2) -> Vec<usize> {
        let gx = self.axis_cell(position.x);
        let gy = self.axis_cell(position.y);
        let max = self.grid_size as isize - 1;

        let x_range = (gx - self.reach).max(0)..=(gx + self.reach).min(max);
        let y_range = (gy - self.reach).max(0)..=(gy + self.reach).min(max);

        let mut result = Vec::new();
        for check_y in y_range {
            let row = check_y as usize * self.grid_size;
            for check_x in x_range.clone() {
                result.extend_from_slice(&self.cells[row + check_x as usize]);
            }
        }
        result.sort_unstable();
        result
    }
}
