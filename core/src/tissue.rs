//! Read-only tissue geometry consumed by the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GridShape, Voxel};

/// Tissue classification of a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TissueType {
    /// Alveolar air space.
    Air,
    /// Blood vessel; macrophages are recruited here.
    Blood,
    /// Any other tissue.
    Other,
    /// Epithelial lining.
    Epithelium,
    /// Surfactant layer.
    Surfactant,
    /// Pore connecting adjacent alveoli.
    Pore,
}

impl TissueType {
    /// Every tissue type in code order.
    pub const ALL: [TissueType; 6] = [
        TissueType::Air,
        TissueType::Blood,
        TissueType::Other,
        TissueType::Epithelium,
        TissueType::Surfactant,
        TissueType::Pore,
    ];

    /// Decodes a geometry file code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let index = usize::try_from(code).ok()?;
        Self::ALL.get(index).copied()
    }

    /// Code used by geometry files for this tissue type.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Air => 0,
            Self::Blood => 1,
            Self::Other => 2,
            Self::Epithelium => 3,
            Self::Surfactant => 4,
            Self::Pore => 5,
        }
    }
}

/// Reasons tissue geometry may be rejected at load time.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The number of codes does not match the grid extents.
    #[error("tissue grid holds {actual} voxels but the shape requires {expected}")]
    ShapeMismatch {
        /// Voxel count implied by the shape.
        expected: usize,
        /// Number of codes supplied.
        actual: usize,
    },
    /// The shape holds more voxels than can be addressed.
    #[error("tissue grid shape {shape:?} holds more voxels than can be addressed")]
    TooLarge {
        /// Offending extents.
        shape: GridShape,
    },
    /// A code lies outside the known tissue types.
    #[error("tissue code {code} at voxel index {index} is outside 0..=5")]
    InvalidTissueCode {
        /// Linear index of the offending voxel.
        index: usize,
        /// Code found at that voxel.
        code: i32,
    },
}

/// Validated 3D grid of tissue types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TissueGrid {
    shape: GridShape,
    cells: Vec<TissueType>,
}

impl TissueGrid {
    /// Builds a grid from raw codes laid out x-fastest.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when the code count disagrees with `shape`
    /// or any code is out of range.
    pub fn from_codes(shape: GridShape, codes: &[i32]) -> Result<Self, GeometryError> {
        let expected = shape
            .voxel_count()
            .ok_or(GeometryError::TooLarge { shape })?;
        if codes.len() != expected {
            return Err(GeometryError::ShapeMismatch {
                expected,
                actual: codes.len(),
            });
        }

        let cells = codes
            .iter()
            .enumerate()
            .map(|(index, &code)| {
                TissueType::from_code(code).ok_or(GeometryError::InvalidTissueCode { index, code })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { shape, cells })
    }

    /// Grid filled with a single tissue type.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::TooLarge`] when the shape cannot be addressed.
    pub fn uniform(shape: GridShape, tissue: TissueType) -> Result<Self, GeometryError> {
        let count = shape
            .voxel_count()
            .ok_or(GeometryError::TooLarge { shape })?;
        Ok(Self {
            shape,
            cells: vec![tissue; count],
        })
    }

    /// Checks that the stored cells cover the shape exactly.
    ///
    /// Grids built through the constructors always pass; decoded grids may not.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] when the cell count disagrees with the shape.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let expected = self
            .shape
            .voxel_count()
            .ok_or(GeometryError::TooLarge { shape: self.shape })?;
        if self.cells.len() != expected {
            return Err(GeometryError::ShapeMismatch {
                expected,
                actual: self.cells.len(),
            });
        }
        Ok(())
    }

    /// Extents of the grid.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Tissue at the voxel, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, voxel: Voxel) -> Option<TissueType> {
        self.shape
            .index(voxel)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Voxels of the requested tissue type in linear storage order.
    pub fn voxels_of(&self, tissue: TissueType) -> impl Iterator<Item = Voxel> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| **cell == tissue)
            .filter_map(|(index, _)| self.shape.voxel_at(index))
    }

    /// Replaces the tissue at a single voxel, returning the previous value.
    ///
    /// Intended for building fixtures; the simulation never mutates geometry.
    pub fn set(&mut self, voxel: Voxel, tissue: TissueType) -> Option<TissueType> {
        let index = self.shape.index(voxel)?;
        let slot = self.cells.get_mut(index)?;
        Some(std::mem::replace(slot, tissue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shape_mismatch() {
        let shape = GridShape::new(2, 2, 1);
        let error = TissueGrid::from_codes(shape, &[1, 1, 1]).unwrap_err();
        assert_eq!(
            error,
            GeometryError::ShapeMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn rejects_out_of_range_codes() {
        let shape = GridShape::new(2, 1, 1);
        assert_eq!(
            TissueGrid::from_codes(shape, &[0, 6]).unwrap_err(),
            GeometryError::InvalidTissueCode { index: 1, code: 6 }
        );
        assert_eq!(
            TissueGrid::from_codes(shape, &[-1, 0]).unwrap_err(),
            GeometryError::InvalidTissueCode { index: 0, code: -1 }
        );
    }

    #[test]
    fn lists_voxels_of_a_tissue_type() {
        let shape = GridShape::new(3, 1, 1);
        let grid = TissueGrid::from_codes(shape, &[1, 0, 1]).expect("valid geometry");
        let blood: Vec<Voxel> = grid.voxels_of(TissueType::Blood).collect();
        assert_eq!(blood, vec![Voxel::new(0, 0, 0), Voxel::new(2, 0, 0)]);
        assert_eq!(grid.get(Voxel::new(1, 0, 0)), Some(TissueType::Air));
        assert_eq!(grid.get(Voxel::new(3, 0, 0)), None);
    }

    #[test]
    fn oversized_shapes_are_rejected() {
        let shape = GridShape::new(4_000_000, 4_000_000, 4_000_000);
        assert_eq!(
            TissueGrid::uniform(shape, TissueType::Air).unwrap_err(),
            GeometryError::TooLarge { shape }
        );
        assert_eq!(
            TissueGrid::from_codes(shape, &[0]).unwrap_err(),
            GeometryError::TooLarge { shape }
        );
    }

    #[test]
    fn decoded_grid_must_cover_its_shape() {
        let grid = TissueGrid::uniform(GridShape::new(3, 1, 1), TissueType::Air)
            .expect("small grid");
        assert_eq!(grid.validate(), Ok(()));

        let mut bytes = bincode::serialize(&grid).expect("serialize");
        bytes[..4].copy_from_slice(&4_u32.to_le_bytes());
        let corrupted: TissueGrid = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(
            corrupted.validate(),
            Err(GeometryError::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn codes_round_trip() {
        for tissue in TissueType::ALL {
            assert_eq!(TissueType::from_code(i32::from(tissue.code())), Some(tissue));
        }
    }
}
