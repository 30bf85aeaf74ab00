//! Distance-based level of detail selection for terrain chunks
//!
//! A detail table lists, in increasing order, how far from the viewer each
//! level of detail stays in use. The last threshold doubles as the maximum
//! view distance: chunks further away than that are hidden.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::mesh::MAX_LOD;

/// One row of the detail table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodInfo {
    /// Mesh level of detail, `0..=MAX_LOD`.
    pub lod: u32,
    /// Distance from the viewer to the chunk edge up to which this row applies.
    pub visible_dst_threshold: f32,
}

impl LodInfo {
    pub const fn new(lod: u32, visible_dst_threshold: f32) -> Self {
        Self {
            lod,
            visible_dst_threshold,
        }
    }

    pub fn sqr_visible_dst_threshold(&self) -> f32 {
        self.visible_dst_threshold * self.visible_dst_threshold
    }
}

/// Default table: full detail close by, halving resolution further out.
pub fn default_detail_levels() -> Vec<LodInfo> {
    vec![
        LodInfo::new(0, 200.0),
        LodInfo::new(1, 400.0),
        LodInfo::new(2, 600.0),
        LodInfo::new(4, 900.0),
    ]
}

/// Check a detail table and the row used for collision meshes.
pub fn validate_detail_levels(levels: &[LodInfo], collider_lod_index: usize) -> Result<()> {
    if levels.is_empty() {
        return Err(Error::Config("detail levels must not be empty".into()));
    }
    for (i, level) in levels.iter().enumerate() {
        if level.lod > MAX_LOD {
            return Err(Error::Config(format!(
                "detail level {} uses LOD {} (max {})",
                i, level.lod, MAX_LOD
            )));
        }
        if !level.visible_dst_threshold.is_finite() || level.visible_dst_threshold < 0.0 {
            return Err(Error::Config(format!(
                "detail level {} has invalid threshold {}",
                i, level.visible_dst_threshold
            )));
        }
    }
    if levels
        .windows(2)
        .any(|w| w[1].visible_dst_threshold <= w[0].visible_dst_threshold)
    {
        return Err(Error::Config(
            "detail level thresholds must be strictly increasing".into(),
        ));
    }
    if collider_lod_index >= levels.len() {
        return Err(Error::Config(format!(
            "collider LOD index {} out of range (0..{})",
            collider_lod_index,
            levels.len()
        )));
    }
    Ok(())
}

/// Furthest distance at which any chunk is shown.
pub fn max_view_distance(levels: &[LodInfo]) -> f32 {
    levels.last().map_or(0.0, |l| l.visible_dst_threshold)
}

/// Index into `levels` for a viewer `distance` from the chunk edge.
///
/// Picks the first row whose threshold the distance does not exceed. Past the
/// second-to-last threshold the last row is used; whether the chunk is visible
/// at all is a separate check against [`max_view_distance`].
///
/// # Examples
/// ```
/// use lodscape::streaming::lod::{select_lod_index, LodInfo};
///
/// let levels = [LodInfo::new(0, 100.0), LodInfo::new(2, 300.0)];
/// assert_eq!(select_lod_index(&levels, 50.0), 0);
/// assert_eq!(select_lod_index(&levels, 100.0), 0);
/// assert_eq!(select_lod_index(&levels, 150.0), 1);
/// ```
pub fn select_lod_index(levels: &[LodInfo], distance: f32) -> usize {
    let last = levels.len().saturating_sub(1);
    levels[..last]
        .iter()
        .position(|level| distance <= level.visible_dst_threshold)
        .unwrap_or(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<LodInfo> {
        vec![
            LodInfo::new(0, 100.0),
            LodInfo::new(1, 200.0),
            LodInfo::new(4, 400.0),
        ]
    }

    #[test]
    fn test_select_lod_index() {
        let levels = levels();
        assert_eq!(select_lod_index(&levels, 0.0), 0);
        assert_eq!(select_lod_index(&levels, 99.9), 0);
        assert_eq!(select_lod_index(&levels, 100.0), 0);
        assert_eq!(select_lod_index(&levels, 100.1), 1);
        assert_eq!(select_lod_index(&levels, 200.0), 1);
        assert_eq!(select_lod_index(&levels, 350.0), 2);
        // Beyond the view distance the last row is still returned.
        assert_eq!(select_lod_index(&levels, 10_000.0), 2);
    }

    #[test]
    fn test_select_is_monotonic() {
        let levels = levels();
        let mut prev = 0;
        for i in 0..500 {
            let index = select_lod_index(&levels, i as f32);
            assert!(index >= prev);
            prev = index;
        }
    }

    #[test]
    fn test_single_row_table() {
        let levels = [LodInfo::new(2, 50.0)];
        assert_eq!(select_lod_index(&levels, 0.0), 0);
        assert_eq!(select_lod_index(&levels, 1000.0), 0);
        assert_eq!(max_view_distance(&levels), 50.0);
    }

    #[test]
    fn test_max_view_distance() {
        assert_eq!(max_view_distance(&levels()), 400.0);
        assert_eq!(max_view_distance(&[]), 0.0);
    }

    #[test]
    fn test_sqr_threshold() {
        assert_eq!(LodInfo::new(0, 25.0).sqr_visible_dst_threshold(), 625.0);
    }

    #[test]
    fn test_validate() {
        assert!(validate_detail_levels(&levels(), 0).is_ok());
        assert!(validate_detail_levels(&default_detail_levels(), 0).is_ok());
        assert!(validate_detail_levels(&[], 0).is_err());
        assert!(validate_detail_levels(&levels(), 3).is_err());

        let unsorted = [LodInfo::new(0, 200.0), LodInfo::new(1, 100.0)];
        assert!(matches!(validate_detail_levels(&unsorted, 0), Err(Error::Config(_))));

        let too_coarse = [LodInfo::new(MAX_LOD + 1, 100.0)];
        assert!(validate_detail_levels(&too_coarse, 0).is_err());

        let negative = [LodInfo::new(0, -1.0)];
        assert!(validate_detail_levels(&negative, 0).is_err());
    }
}
