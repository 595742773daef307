//! Pre-exported mesh assets.
//!
//! Mesh import proper happens upstream; this module consumes the exported
//! JSON (positions, optional per-vertex colors, triangle indices) and
//! normalizes it into the shared model frame both synchronized views use.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::FormatError;

/// Largest horizontal extent a normalized model occupies. Both synchronized
/// views fit their model with the same value so a 1:1 coordinate mapping
/// holds between them.
pub const MODEL_TARGET_EXTENT: f32 = 9.0;

#[derive(Debug, Clone, Deserialize)]
pub struct MeshAsset {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub colors: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshAsset {
    pub fn from_json_path(path: &Path) -> Result<Self, FormatError> {
        let data = fs::read_to_string(path).map_err(|source| FormatError::MeshRead {
            path: path.to_path_buf(),
            source,
        })?;
        let asset: MeshAsset =
            serde_json::from_str(&data).map_err(|source| FormatError::MeshParse {
                path: path.to_path_buf(),
                source,
            })?;
        asset.validate()?;
        Ok(asset)
    }

    fn validate(&self) -> Result<(), FormatError> {
        if self.positions.is_empty() {
            return Err(FormatError::EmptyMesh);
        }
        let vertex_count = self.positions.len();
        for &index in &self.indices {
            if index as usize >= vertex_count {
                return Err(FormatError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds as (min, max) corners.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for position in &self.positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }
        (min, max)
    }

    /// Centers the bounding-box centroid on the origin and uniformly scales
    /// so the larger of the X and Z spans equals `target_extent`. Returns the
    /// scale that was applied.
    pub fn normalize(&mut self, target_extent: f32) -> f32 {
        let (min, max) = self.bounds();
        let centroid = [
            (min[0] + max[0]) * 0.5,
            (min[1] + max[1]) * 0.5,
            (min[2] + max[2]) * 0.5,
        ];
        let horizontal = (max[0] - min[0]).max(max[2] - min[2]);
        let scale = if horizontal > f32::EPSILON {
            target_extent / horizontal
        } else {
            1.0
        };
        for position in &mut self.positions {
            for axis in 0..3 {
                position[axis] = (position[axis] - centroid[axis]) * scale;
            }
        }
        scale
    }
}

#[cfg(test)]
mod mesh_tests {
    use std::io::Write;

    use super::*;

    fn slab() -> MeshAsset {
        MeshAsset {
            positions: vec![
                [1.0, 0.0, 2.0],
                [4.0, 1.0, 2.0],
                [4.0, 1.0, 3.0],
                [1.0, 0.0, 3.0],
            ],
            colors: Vec::new(),
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn normalize_centers_and_fits_horizontal_extent() {
        let mut asset = slab();
        let scale = asset.normalize(MODEL_TARGET_EXTENT);
        // X span 3 beats Z span 1, so the fit divides 9 by 3.
        assert!((scale - 3.0).abs() < 1e-6);
        let (min, max) = asset.bounds();
        assert!((min[0] + max[0]).abs() < 1e-5);
        assert!((min[1] + max[1]).abs() < 1e-5);
        assert!((min[2] + max[2]).abs() < 1e-5);
        assert!(((max[0] - min[0]) - MODEL_TARGET_EXTENT).abs() < 1e-5);
    }

    #[test]
    fn degenerate_footprint_keeps_unit_scale() {
        let mut asset = MeshAsset {
            positions: vec![[2.0, 0.0, 5.0], [2.0, 4.0, 5.0]],
            colors: Vec::new(),
            indices: Vec::new(),
        };
        let scale = asset.normalize(MODEL_TARGET_EXTENT);
        assert!((scale - 1.0).abs() < 1e-6);
        // Still centered even when no scaling applies.
        assert!((asset.positions[0][1] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "{{\"positions\":[[0,0,0],[1,0,0]],\"indices\":[0,1,2]}}"
        )
        .expect("write asset");
        let err = MeshAsset::from_json_path(file.path()).expect_err("must reject");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn malformed_json_reports_the_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write asset");
        let err = MeshAsset::from_json_path(file.path()).expect_err("must reject");
        assert!(err.to_string().contains("parsing mesh asset"));
    }

    #[test]
    fn missing_colors_default_to_empty() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "{{\"positions\":[[0,0,0],[1,0,0],[0,1,0]],\"indices\":[0,1,2]}}"
        )
        .expect("write asset");
        let asset = MeshAsset::from_json_path(file.path()).expect("asset loads");
        assert!(asset.colors.is_empty());
        assert_eq!(asset.indices.len(), 3);
    }
}
