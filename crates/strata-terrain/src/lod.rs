//! Level-of-detail triangle strip generation
//!
//! Every loaded cell shares the same vertex layout (an `L×L` grid), so the
//! index buffers depend only on the cell length and the LOD level. They are
//! generated once and looked up by level.

use crate::config::LodSettings;

/// Number of discrete detail levels
pub const LOD_LEVELS: usize = 8;

/// Coarsest detail level
pub const MAX_LOD: u8 = (LOD_LEVELS - 1) as u8;

/// Grid edge length sampled at `level`: every `2^level`-th vertex, never
/// fewer than 2 so each level still covers the whole tile.
pub fn lod_grid_length(cell_length: u32, level: u8) -> u32 {
    let length = ((cell_length - 1) >> level) + 1;
    length.max(2)
}

/// Vertex step between sampled grid points at `level`.
pub fn lod_stride(cell_length: u32, level: u8) -> u32 {
    (cell_length - 1) / (lod_grid_length(cell_length, level) - 1)
}

/// Strip index count for `level`: `(rows - 1) * 2 * cols`.
pub fn lod_index_count(cell_length: u32, level: u8) -> usize {
    let length = lod_grid_length(cell_length, level) as usize;
    (length - 1) * 2 * length
}

/// Build the triangle strip for one LOD level.
///
/// Rows are walked boustrophedon style: even rows left to right, odd rows
/// right to left, emitting a (row, row + 1) pair per column. Each row starts
/// on the vertex the previous row ended on, so the repeated index stitches the
/// rows into one strip through degenerate triangles.
pub fn generate_lod_indices(cell_length: u32, level: u8) -> Vec<u16> {
    assert!(level <= MAX_LOD, "LOD level {} out of range", level);
    assert!(
        (cell_length as usize * cell_length as usize) <= u16::MAX as usize + 1,
        "cell length {} does not fit 16-bit indices",
        cell_length
    );

    let length = lod_grid_length(cell_length, level);
    let stride = lod_stride(cell_length, level);
    let vertex = |row: u32, col: u32| (row * stride * cell_length + col * stride) as u16;

    let mut indices = Vec::with_capacity(lod_index_count(cell_length, level));
    for row in 0..length - 1 {
        if row % 2 == 0 {
            for col in 0..length {
                indices.push(vertex(row, col));
                indices.push(vertex(row + 1, col));
            }
        } else {
            for col in (0..length).rev() {
                indices.push(vertex(row, col));
                indices.push(vertex(row + 1, col));
            }
        }
    }
    indices
}

/// Index strips for all eight levels, level 0 first.
pub fn generate_all_lods(cell_length: u32) -> [Vec<u16>; LOD_LEVELS] {
    std::array::from_fn(|level| generate_lod_indices(cell_length, level as u8))
}

/// Map camera-to-cell distance to a detail level.
///
/// `clamp(ceil(distance^exponent / divisor) - 1, 0, 7)`; monotonic in
/// distance for positive parameters.
pub fn lod_for_distance(distance: f32, settings: &LodSettings) -> u8 {
    let scaled = (distance.max(0.0).powf(settings.exponent) / settings.divisor).ceil() - 1.0;
    if scaled.is_nan() {
        return MAX_LOD;
    }
    scaled.clamp(0.0, MAX_LOD as f32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toy_level_zero_strip_zig_zags() {
        #[rustfmt::skip]
        let expected: Vec<u16> = vec![
            0, 5, 1, 6, 2, 7, 3, 8, 4, 9,
            9, 14, 8, 13, 7, 12, 6, 11, 5, 10,
            10, 15, 11, 16, 12, 17, 13, 18, 14, 19,
            19, 24, 18, 23, 17, 22, 16, 21, 15, 20,
        ];
        assert_eq!(generate_lod_indices(5, 0), expected);
    }

    #[test]
    fn toy_level_one_samples_every_other_vertex() {
        // 3x3 grid over a 5x5 tile
        let expected: Vec<u16> = vec![0, 10, 2, 12, 4, 14, 14, 24, 12, 22, 10, 20];
        assert_eq!(generate_lod_indices(5, 1), expected);
    }

    #[test]
    fn every_level_is_in_range_and_exactly_sized() {
        let cell_length = 129;
        for level in 0..=MAX_LOD {
            let indices = generate_lod_indices(cell_length, level);
            assert_eq!(indices.len(), lod_index_count(cell_length, level));
            assert!(indices
                .iter()
                .all(|&i| (i as u32) < cell_length * cell_length));
        }
    }

    #[test]
    fn grid_lengths_halve_down_to_the_minimum() {
        let lengths: Vec<u32> = (0..=MAX_LOD).map(|l| lod_grid_length(129, l)).collect();
        assert_eq!(lengths, vec![129, 65, 33, 17, 9, 5, 3, 2]);
        assert_eq!(lod_stride(129, 7), 128);
    }

    #[test]
    fn coarsest_level_clamps_to_two_by_two() {
        assert_eq!(lod_grid_length(129, 7), 2);
        assert_eq!(lod_grid_length(5, 7), 2);
        // Clamped levels still reach the far corner of the tile
        let indices = generate_lod_indices(5, 7);
        assert_eq!(indices, vec![0, 20, 4, 24]);
    }

    #[test]
    fn strips_touch_every_corner() {
        for level in 0..=MAX_LOD {
            let indices = generate_lod_indices(129, level);
            for corner in [0u16, 128, 128 * 129, 129 * 129 - 1] {
                assert!(indices.contains(&corner), "level {} misses {}", level, corner);
            }
        }
    }

    #[test]
    fn row_transitions_repeat_the_last_index() {
        let indices = generate_lod_indices(9, 0);
        let row_len = 2 * 9;
        for row in 1..8 {
            let start = row * row_len;
            assert_eq!(indices[start - 1], indices[start]);
        }
    }

    #[test]
    fn all_levels_are_generated_in_order() {
        let all = generate_all_lods(17);
        for (level, indices) in all.iter().enumerate() {
            assert_eq!(indices.len(), lod_index_count(17, level as u8));
        }
    }

    #[test]
    fn distance_curve_is_clamped_and_monotonic() {
        let settings = LodSettings::default();
        assert_eq!(lod_for_distance(0.0, &settings), 0);
        assert_eq!(lod_for_distance(1.0, &settings), 0);
        assert_eq!(lod_for_distance(1.0e9, &settings), MAX_LOD);

        let mut previous = 0;
        for step in 0..2000 {
            let lod = lod_for_distance(step as f32 * 10.0, &settings);
            assert!(lod >= previous);
            previous = lod;
        }
    }
}
