use crate::body::Body;

pub const MIN_CELL_SIZE: f32 = 60.0;
pub const MAX_CELL_SIZE: f32 = 140.0;
const CELLS_ACROSS_SHORT_SIDE: f32 = 6.0;

/// Uniform grid over the surface. Buckets live in one flat arena that is
/// cleared, not reallocated, between frames.
#[derive(Default)]
pub struct SpatialGrid {
    cell_size: f32,
    grid_width: usize,
    grid_height: usize,
    grid_cells: Vec<Vec<usize>>,
}

pub fn cell_size_for(width: f32, height: f32) -> f32 {
    (width.min(height) / CELLS_ACROSS_SHORT_SIDE).clamp(MIN_CELL_SIZE, MAX_CELL_SIZE)
}

impl SpatialGrid {
    pub fn dimensions(&self) -> (usize, usize) {
        (self.grid_width, self.grid_height)
    }

    fn get_cell_coords(&self, x: f32, y: f32) -> (usize, usize) {
        let cx = (x / self.cell_size).floor().max(0.0) as usize;
        let cy = (y / self.cell_size).floor().max(0.0) as usize;
        (cx.min(self.grid_width - 1), cy.min(self.grid_height - 1))
    }

    fn get_cell_index(&self, cx: isize, cy: isize) -> Option<usize> {
        if cx >= 0 && cx < self.grid_width as isize && cy >= 0 && cy < self.grid_height as isize {
            Some(cy as usize * self.grid_width + cx as usize)
        } else {
            None
        }
    }

    /// Re-buckets every body for a `width × height` surface.
    pub fn rebuild(&mut self, bodies: &[Body], width: f32, height: f32) {
        self.cell_size = cell_size_for(width, height);
        self.grid_width = ((width / self.cell_size).ceil() as usize).max(1);
        self.grid_height = ((height / self.cell_size).ceil() as usize).max(1);

        let num_cells = self.grid_width * self.grid_height;
        if self.grid_cells.len() != num_cells {
            self.grid_cells.resize_with(num_cells, Vec::new);
        }
        for cell in self.grid_cells.iter_mut() {
            cell.clear();
        }

        for (i, body) in bodies.iter().enumerate() {
            let (cx, cy) = self.get_cell_coords(body.position.x, body.position.y);
            self.grid_cells[cy * self.grid_width + cx].push(i);
        }
    }

    /// Calls `f(i, j)` with `i < j` for every candidate pair in neighboring
    /// cells. A cell pairs with itself and with neighbors of larger index
    /// only, so each unordered pair of cells (and of bodies) comes up once.
    pub fn for_each_candidate_pair(&self, mut f: impl FnMut(usize, usize)) {
        for cy in 0..self.grid_height {
            for cx in 0..self.grid_width {
                let here = cy * self.grid_width + cx;
                let cell = &self.grid_cells[here];
                if cell.is_empty() {
                    continue;
                }
                for ny in -1..=1 {
                    for nx in -1..=1 {
                        let Some(there) = self.get_cell_index(cx as isize + nx, cy as isize + ny)
                        else {
                            continue;
                        };
                        if there < here {
                            continue;
                        }
                        if there == here {
                            for (k, &i) in cell.iter().enumerate() {
                                for &j in &cell[k + 1..] {
                                    f(i.min(j), i.max(j));
                                }
                            }
                        } else {
                            for &i in cell {
                                for &j in &self.grid_cells[there] {
                                    f(i.min(j), i.max(j));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LogoImage;
    use crate::vectors::Vector2D;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn body_at(x: f32, y: f32) -> Body {
        Body::new(
            Vector2D::new(x, y),
            Vector2D::default(),
            16.,
            256.,
            Arc::new(LogoImage::solid(1, 1, [0, 0, 0, 255])),
        )
    }

    #[test]
    fn test_cell_size_is_bounded() {
        assert_eq!(cell_size_for(120., 900.), 60.);
        assert_eq!(cell_size_for(600., 480.), 80.);
        assert_eq!(cell_size_for(3000., 2000.), 140.);
    }

    #[test]
    fn test_every_neighbor_pair_visited_once() {
        // a dense lattice straddling many cell borders
        let mut bodies = vec![];
        for y in 0..12 {
            for x in 0..12 {
                bodies.push(body_at(x as f32 * 30. + 5., y as f32 * 30. + 5.));
            }
        }
        let mut grid = SpatialGrid::default();
        grid.rebuild(&bodies, 480., 480.);

        let mut seen = HashSet::new();
        grid.for_each_candidate_pair(|i, j| {
            assert!(i < j);
            assert!(seen.insert((i, j)), "pair ({i}, {j}) produced twice");
        });

        // every pair close enough to touch must be a candidate
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let d = (bodies[i].position - bodies[j].position).length();
                if d < bodies[i].radius() + bodies[j].radius() {
                    assert!(seen.contains(&(i, j)), "missed ({i}, {j})");
                }
            }
        }
    }

    #[test]
    fn test_rebuild_reuses_buckets_and_clamps_outliers() {
        let bodies = vec![body_at(-30., -30.), body_at(10_000., 10.)];
        let mut grid = SpatialGrid::default();
        grid.rebuild(&bodies, 300., 300.);
        assert_eq!(grid.dimensions(), (5, 5));
        assert_eq!(grid.grid_cells[0], vec![0]);
        assert_eq!(grid.grid_cells[4], vec![1]);

        grid.rebuild(&bodies[..1], 300., 300.);
        assert_eq!(grid.grid_cells.len(), 25);
        assert!(grid.grid_cells[4].is_empty());
    }
}
