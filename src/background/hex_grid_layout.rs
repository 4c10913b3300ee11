use bevy::prelude::*;
use hexx::Hex;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::GridSettings;
use crate::math;

/// One cell of the offset-row grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSlot {
    /// Column in the offset grid.
    pub column: u32,
    /// Row in the offset grid; odd rows are shifted right by half a step.
    pub row: u32,
    /// Axial coordinate of the same cell.
    pub hex: Hex,
    /// World-space centre in the grid plane.
    pub position: Vec2,
    /// Static terrain value in `[0, 1]`, sampled once.
    pub base_elevation: f32,
}

/// Fixed set of cell positions plus the bounding box used for map lookups.
///
/// Positions are computed once by [`HexGridLayout::build`] and never move;
/// per-frame motion is applied to the parent entity instead.
#[derive(Debug, Clone)]
pub struct HexGridLayout {
    slots: Vec<CellSlot>,
    min: Vec2,
    max: Vec2,
    x_start: f32,
    y_start: f32,
    x_step: f32,
    y_step: f32,
    sampled: bool,
}

impl HexGridLayout {
    /// Lays out `columns × rows` pointy-top cells in rows, odd rows offset by
    /// half a cell step. The top row sits at `top_edge`.
    pub fn build(g: &GridSettings) -> Self {
        let hex_width = 3f32.sqrt() * g.hex_radius;
        let hex_height = 2.0 * g.hex_radius;
        let x_step = hex_width + g.gap;
        let y_step = hex_height * 0.75 + g.gap;

        let total_width = g.columns as f32 * x_step;
        let total_height = g.rows as f32 * y_step;
        let x_start = -total_width / 2.0;
        let y_start = g.top_edge - total_height;

        let mut slots = Vec::with_capacity(cell_count(g.columns, g.rows));
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);

        for row in 0..g.rows {
            for column in 0..g.columns {
                let mut x = x_start + column as f32 * x_step;
                let y = y_start + row as f32 * y_step;
                if row % 2 != 0 {
                    x += x_step / 2.0;
                }
                let position = Vec2::new(x, y);
                min = min.min(position);
                max = max.max(position);
                slots.push(CellSlot {
                    column,
                    row,
                    hex: offset_to_axial(column, row),
                    position,
                    base_elevation: 0.0,
                });
            }
        }

        if slots.is_empty() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }

        Self {
            slots,
            min,
            max,
            x_start,
            y_start,
            x_step,
            y_step,
            sampled: false,
        }
    }

    /// All cells, row-major.
    pub fn slots(&self) -> &[CellSlot] {
        &self.slots
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` for a grid with zero rows or columns.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Bounding box of the cell centres as `(min, max)`.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    /// Width and height of the bounding box.
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Centre of the bounding box.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Maps a grid-plane position into `[0, 1] × [0, 1]` against the bounds.
    ///
    /// Degenerate axes (a single row or column) map to `0.5`.
    pub fn normalized_uv(&self, pos: Vec2) -> Vec2 {
        let size = self.size();
        let axis = |p: f32, lo: f32, extent: f32| {
            if extent <= f32::EPSILON {
                0.5
            } else {
                ((p - lo) / extent).clamp(0.0, 1.0)
            }
        };
        Vec2::new(
            axis(pos.x, self.min.x, size.x),
            axis(pos.y, self.min.y, size.y),
        )
    }

    /// Fills every cell's base elevation from `sampler`.
    ///
    /// Runs at most once; later calls leave the values untouched and return
    /// `false`.
    pub fn sample_elevations(&mut self, sampler: &dyn HeightSampler) -> bool {
        if self.sampled {
            return false;
        }
        let uvs: Vec<Vec2> = self
            .slots
            .iter()
            .map(|s| self.normalized_uv(s.position))
            .collect();
        for (slot, uv) in self.slots.iter_mut().zip(uvs) {
            slot.base_elevation = sampler.sample(uv).clamp(0.0, 1.0);
        }
        self.sampled = true;
        true
    }

    /// Whether base elevations have been sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Cell whose centre is closest to a grid-plane position, if any cell
    /// lies within one step of it.
    pub fn nearest_cell(&self, pos: Vec2) -> Option<&CellSlot> {
        if self.slots.is_empty() {
            return None;
        }
        let columns = self.slots.iter().filter(|s| s.row == 0).count() as i64;
        let rows = self.slots.len() as i64 / columns.max(1);
        let row_guess = ((pos.y - self.y_start) / self.y_step).round() as i64;

        let mut best: Option<(&CellSlot, f32)> = None;
        for row in (row_guess - 1)..=(row_guess + 1) {
            if row < 0 || row >= rows {
                continue;
            }
            let offset = if row % 2 != 0 { self.x_step / 2.0 } else { 0.0 };
            let col_guess = ((pos.x - self.x_start - offset) / self.x_step).round() as i64;
            for column in (col_guess - 1)..=(col_guess + 1) {
                if column < 0 || column >= columns {
                    continue;
                }
                let slot = &self.slots[(row * columns + column) as usize];
                let d = slot.position.distance(pos);
                if best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((slot, d));
                }
            }
        }

        best.filter(|(_, d)| *d <= self.x_step.max(self.y_step))
            .map(|(slot, _)| slot)
    }
}

/// Odd-row offset coordinate to axial.
/// `columns × rows` without overflowing `u32`.
fn cell_count(columns: u32, rows: u32) -> usize {
    (columns as usize).saturating_mul(rows as usize)
}

fn offset_to_axial(column: u32, row: u32) -> Hex {
    let (c, r) = (column as i32, row as i32);
    Hex::new(c - (r - (r & 1)) / 2, r)
}

/// Source of static base elevation in `[0, 1]`, keyed by normalized grid
/// coordinates.
pub trait HeightSampler {
    /// Elevation at `uv`; must return the same value for the same input.
    fn sample(&self, uv: Vec2) -> f32;
}

/// Nearest-texel lookup of the red channel of a height map.
///
/// `uv.y = 0` is the bottom row of the image.
pub struct ImageHeights<'a> {
    image: &'a Image,
}

impl<'a> ImageHeights<'a> {
    /// Wraps a loaded image; the pixel data must be kept in the main world.
    pub fn new(image: &'a Image) -> Self {
        Self { image }
    }
}

impl HeightSampler for ImageHeights<'_> {
    fn sample(&self, uv: Vec2) -> f32 {
        let (w, h) = (self.image.width(), self.image.height());
        if w == 0 || h == 0 {
            return 0.0;
        }
        let x = ((uv.x.clamp(0.0, 1.0) * w as f32) as u32).min(w - 1);
        let y = (((1.0 - uv.y.clamp(0.0, 1.0)) * h as f32) as u32).min(h - 1);
        self.image
            .get_color_at(x, y)
            .map(|c| c.to_srgba().red.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }
}

/// Fractal Perlin elevation, for running without a height map.
pub struct NoiseHeights {
    fbm: Fbm<Perlin>,
    scale: f64,
}

impl NoiseHeights {
    /// `scale` divides the normalized coordinates before sampling.
    pub fn new(seed: u32, octaves: usize, scale: f64) -> Self {
        Self {
            fbm: Fbm::new(seed).set_octaves(octaves),
            scale,
        }
    }
}

impl HeightSampler for NoiseHeights {
    fn sample(&self, uv: Vec2) -> f32 {
        let n = self
            .fbm
            .get([uv.x as f64 / self.scale, uv.y as f64 / self.scale]);
        math::map_noise_to_range(n, 0.0, 1.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundConfig;
    use bevy::asset::RenderAssetUsages;
    use bevy::platform::collections::HashSet;
    use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

    fn settings(columns: u32, rows: u32) -> GridSettings {
        GridSettings {
            columns,
            rows,
            ..BackgroundConfig::default().grid
        }
    }

    struct Ramp;

    impl HeightSampler for Ramp {
        fn sample(&self, uv: Vec2) -> f32 {
            uv.x
        }
    }

    struct Constant(f32);

    impl HeightSampler for Constant {
        fn sample(&self, _uv: Vec2) -> f32 {
            self.0
        }
    }

    #[test]
    fn build_is_deterministic() {
        let g = BackgroundConfig::default().grid;
        let a = HexGridLayout::build(&g);
        let b = HexGridLayout::build(&g);
        assert_eq!(a.slots(), b.slots());
        assert_eq!(a.bounds(), b.bounds());
    }

    #[test]
    fn build_produces_every_cell_once() {
        let g = settings(40, 90);
        let layout = HexGridLayout::build(&g);
        assert_eq!(layout.len(), 40 * 90);

        let positions: HashSet<(u32, u32)> = layout
            .slots()
            .iter()
            .map(|s| (s.position.x.to_bits(), s.position.y.to_bits()))
            .collect();
        assert_eq!(positions.len(), layout.len(), "two cells share a position");

        let hexes: HashSet<Hex> = layout.slots().iter().map(|s| s.hex).collect();
        assert_eq!(hexes.len(), layout.len(), "two cells share an axial coordinate");
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn cell_count_does_not_wrap_for_large_grids() {
        assert_eq!(cell_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(cell_count(u32::MAX, 2), 2 * u32::MAX as usize);
        assert_eq!(cell_count(40, 0), 0);
    }

    #[test]
    fn odd_rows_shift_by_half_a_step() {
        let g = settings(4, 2);
        let layout = HexGridLayout::build(&g);
        let step = 3f32.sqrt() * g.hex_radius + g.gap;
        let even = &layout.slots()[0];
        let odd = &layout.slots()[4];
        assert_eq!(odd.row, 1);
        assert!((odd.position.x - even.position.x - step / 2.0).abs() < 1e-4);
        assert!((odd.position.y - even.position.y - (1.5 * g.hex_radius + g.gap)).abs() < 1e-4);
    }

    #[test]
    fn top_row_sits_below_top_edge() {
        let g = settings(6, 10);
        let layout = HexGridLayout::build(&g);
        let (_, max) = layout.bounds();
        let y_step = 1.5 * g.hex_radius + g.gap;
        assert!((max.y - (g.top_edge - y_step)).abs() < 1e-4);
    }

    #[test]
    fn axial_neighbours_match_offset_neighbours() {
        // Odd-row offset: the cell right-below an even row keeps its column.
        assert_eq!(offset_to_axial(0, 0), Hex::new(0, 0));
        assert_eq!(offset_to_axial(0, 1), Hex::new(0, 1));
        assert_eq!(offset_to_axial(0, 2), Hex::new(-1, 2));
        assert_eq!(offset_to_axial(3, 3), Hex::new(2, 3));
        assert_eq!(offset_to_axial(0, 0).distance_to(offset_to_axial(0, 1)), 1);
    }

    #[test]
    fn uv_spans_the_unit_square() {
        let layout = HexGridLayout::build(&settings(10, 10));
        let (min, max) = layout.bounds();
        assert_eq!(layout.normalized_uv(min), Vec2::ZERO);
        assert_eq!(layout.normalized_uv(max), Vec2::ONE);
        assert_eq!(layout.normalized_uv(max + Vec2::splat(50.0)), Vec2::ONE);
    }

    #[test]
    fn single_cell_uv_is_centred() {
        let layout = HexGridLayout::build(&settings(1, 1));
        assert_eq!(layout.normalized_uv(Vec2::new(3.0, -2.0)), Vec2::splat(0.5));
    }

    #[test]
    fn elevation_is_sampled_once() {
        let mut layout = HexGridLayout::build(&settings(5, 3));
        assert!(layout.sample_elevations(&Ramp));
        let first: Vec<f32> = layout.slots().iter().map(|s| s.base_elevation).collect();
        assert!(!layout.sample_elevations(&Constant(0.9)));
        let second: Vec<f32> = layout.slots().iter().map(|s| s.base_elevation).collect();
        assert_eq!(first, second);
        assert!(layout.is_sampled());
    }

    #[test]
    fn sampled_elevation_is_clamped() {
        let mut layout = HexGridLayout::build(&settings(3, 3));
        layout.sample_elevations(&Constant(4.0));
        assert!(layout.slots().iter().all(|s| s.base_elevation == 1.0));
    }

    #[test]
    fn image_heights_read_red_channel_bottom_up() {
        let mut image = Image::new_fill(
            Extent3d {
                width: 2,
                height: 2,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            &[0, 0, 0, 255],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::MAIN_WORLD,
        );
        // Bottom-left texel is bright.
        image
            .set_color_at(0, 1, Color::srgb(1.0, 0.0, 0.0))
            .expect("texel in range");

        let heights = ImageHeights::new(&image);
        assert!((heights.sample(Vec2::new(0.1, 0.1)) - 1.0).abs() < 1e-3);
        assert!(heights.sample(Vec2::new(0.1, 0.9)).abs() < 1e-3);
        assert!(heights.sample(Vec2::new(0.9, 0.1)).abs() < 1e-3);
    }

    #[test]
    fn noise_heights_are_stable_and_bounded() {
        let heights = NoiseHeights::new(42, 4, 0.35);
        for i in 0..25 {
            let uv = Vec2::new(i as f32 / 24.0, 1.0 - i as f32 / 24.0);
            let a = heights.sample(uv);
            assert_eq!(a, heights.sample(uv));
            assert!((0.0..=1.0).contains(&a));
        }
    }

    #[test]
    fn nearest_cell_finds_the_cell_under_a_point() {
        let layout = HexGridLayout::build(&settings(8, 8));
        for slot in layout.slots() {
            let hit = layout
                .nearest_cell(slot.position + Vec2::new(0.3, -0.2))
                .expect("point inside grid");
            assert_eq!(hit.hex, slot.hex);
        }
        assert!(layout.nearest_cell(Vec2::new(999.0, 999.0)).is_none());
    }
}
