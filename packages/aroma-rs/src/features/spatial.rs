//! Edge and CSF fractions of a component's spatial map.

use crate::error::{AromaError, Result};
use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

/// Standard-space reference masks the spatial maps are registered to
#[derive(Debug, Clone)]
pub struct StandardMasks {
    brain: Array3<bool>,
    edge: Array3<bool>,
    csf: Array3<bool>,
}

impl StandardMasks {
    pub fn new(brain: Array3<bool>, edge: Array3<bool>, csf: Array3<bool>) -> Result<Self> {
        if edge.dim() != brain.dim() || csf.dim() != brain.dim() {
            return Err(AromaError::ShapeMismatch(format!(
                "mask shapes differ: brain {:?}, edge {:?}, csf {:?}",
                brain.dim(),
                edge.dim(),
                csf.dim()
            )));
        }
        if !brain.iter().any(|&inside| inside) {
            return Err(AromaError::InvalidParameter(
                "brain mask contains no voxels".to_string(),
            ));
        }
        Ok(Self { brain, edge, csf })
    }

    /// Binarize scalar mask images: any voxel above zero is inside
    pub fn from_images(
        brain: &Array3<f64>,
        edge: &Array3<f64>,
        csf: &Array3<f64>,
    ) -> Result<Self> {
        let binarize = |image: &Array3<f64>| image.mapv(|v| v > 0.0);
        Self::new(binarize(brain), binarize(edge), binarize(csf))
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.brain.dim()
    }

    pub fn brain(&self) -> &Array3<bool> {
        &self.brain
    }

    pub fn edge(&self) -> &Array3<bool> {
        &self.edge
    }

    pub fn csf(&self) -> &Array3<bool> {
        &self.csf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialFractions {
    pub edge_fract: f64,
    pub csf_fract: f64,
}

/// Fraction of a map's absolute weight that falls in the edge shell and in CSF.
///
/// Sums run over voxels inside the brain mask only, so both fractions stay in
/// [0, 1]. A map with no weight inside the brain reports both fractions as 0.
pub fn spatial_fractions(map: &Array3<f64>, masks: &StandardMasks) -> Result<SpatialFractions> {
    if map.dim() != masks.shape() {
        return Err(AromaError::ShapeMismatch(format!(
            "spatial map shape {:?} does not match mask shape {:?}",
            map.dim(),
            masks.shape()
        )));
    }

    let mut total = 0.0;
    let mut edge = 0.0;
    let mut csf = 0.0;

    Zip::from(map)
        .and(&masks.brain)
        .and(&masks.edge)
        .and(&masks.csf)
        .for_each(|&value, &in_brain, &in_edge, &in_csf| {
            if !in_brain || !value.is_finite() {
                return;
            }
            let weight = value.abs();
            total += weight;
            if in_edge {
                edge += weight;
            }
            if in_csf {
                csf += weight;
            }
        });

    if total == 0.0 {
        log::warn!("Spatial map has no weight inside the brain mask; fractions set to 0");
        return Ok(SpatialFractions {
            edge_fract: 0.0,
            csf_fract: 0.0,
        });
    }

    Ok(SpatialFractions {
        edge_fract: (edge / total).clamp(0.0, 1.0),
        csf_fract: (csf / total).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4×4×4 grid: whole grid is brain, outer shell is edge, voxels (1,1,1)
    /// and (2,1,1) are CSF.
    fn masks() -> StandardMasks {
        let brain = Array3::from_elem((4, 4, 4), true);
        let edge = Array3::from_shape_fn((4, 4, 4), |(x, y, z)| {
            [x, y, z].iter().any(|&c| c == 0 || c == 3)
        });
        let csf = Array3::from_shape_fn((4, 4, 4), |(x, y, z)| {
            z == 1 && y == 1 && (x == 1 || x == 2)
        });
        StandardMasks::new(brain, edge, csf).unwrap()
    }

    #[test]
    fn test_fractions_use_absolute_weight() {
        let masks = masks();
        let mut map = Array3::<f64>::zeros((4, 4, 4));
        map[[0, 0, 0]] = -3.0; // edge
        map[[1, 1, 1]] = 1.0; // csf

        let fractions = spatial_fractions(&map, &masks).unwrap();
        assert!((fractions.edge_fract - 0.75).abs() < 1e-12);
        assert!((fractions.csf_fract - 0.25).abs() < 1e-12);

        // flipping the sign of the whole map changes nothing
        let flipped = spatial_fractions(&map.mapv(|v| -v), &masks).unwrap();
        assert_eq!(fractions, flipped);
    }

    #[test]
    fn test_empty_map_reports_zero() {
        let map = Array3::<f64>::zeros((4, 4, 4));
        let fractions = spatial_fractions(&map, &masks()).unwrap();
        assert_eq!(fractions.edge_fract, 0.0);
        assert_eq!(fractions.csf_fract, 0.0);
    }

    #[test]
    fn test_weight_outside_brain_is_ignored() {
        let brain = Array3::from_shape_fn((4, 4, 4), |(x, _, _)| x < 2);
        let edge = Array3::from_elem((4, 4, 4), true);
        let csf = Array3::from_elem((4, 4, 4), false);
        let masks = StandardMasks::new(brain, edge, csf).unwrap();

        let mut map = Array3::<f64>::zeros((4, 4, 4));
        map[[3, 0, 0]] = 100.0;
        let fractions = spatial_fractions(&map, &masks).unwrap();
        assert_eq!(fractions.edge_fract, 0.0);

        map[[0, 0, 0]] = 1.0;
        let fractions = spatial_fractions(&map, &masks).unwrap();
        assert_eq!(fractions.edge_fract, 1.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let map = Array3::<f64>::zeros((3, 4, 4));
        assert!(matches!(
            spatial_fractions(&map, &masks()),
            Err(AromaError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_from_images_binarizes() {
        let brain = Array3::from_elem((2, 2, 2), 0.7);
        let mut edge = Array3::<f64>::zeros((2, 2, 2));
        edge[[0, 0, 0]] = 1.0;
        let csf = Array3::<f64>::from_elem((2, 2, 2), -1.0);
        let masks = StandardMasks::from_images(&brain, &edge, &csf).unwrap();
        assert!(masks.brain().iter().all(|&b| b));
        assert_eq!(masks.edge().iter().filter(|&&b| b).count(), 1);
        assert!(masks.csf().iter().all(|&b| !b));
    }
}
