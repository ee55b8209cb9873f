//! Concentration fields for every diffusible species.

use lungsim_core::{turnover_factor, GridShape, MoleculeKind, MoleculeView, Voxel};
use serde::{Deserialize, Serialize};

use crate::WorldError;

const SPECIES: usize = MoleculeKind::ALL.len();

/// One non-negative scalar field per molecule species, laid out x-fastest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoleculeFields {
    shape: GridShape,
    fields: [Vec<f64>; SPECIES],
    #[serde(skip)]
    scratch: Vec<f64>,
}

impl MoleculeFields {
    /// Allocates every field, filled with its species' initial concentration.
    ///
    /// `initial` is indexed by [`MoleculeKind::index`]; negative or NaN values
    /// start at zero.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::GridTooLarge`] when the voxel count of `shape`
    /// cannot be addressed.
    pub fn new(shape: GridShape, initial: [f64; SPECIES]) -> Result<Self, WorldError> {
        let count = shape
            .voxel_count()
            .ok_or(WorldError::GridTooLarge { shape })?;
        let fields = initial.map(|value| {
            let value = if value > 0.0 { value } else { 0.0 };
            vec![value; count]
        });
        Ok(Self {
            shape,
            fields,
            scratch: Vec::with_capacity(count),
        })
    }

    /// Checks that every field holds exactly one value per voxel.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::FieldLength`] for the first field whose length
    /// disagrees with the shape.
    pub fn validate(&self) -> Result<(), WorldError> {
        let expected = self
            .shape
            .voxel_count()
            .ok_or(WorldError::GridTooLarge { shape: self.shape })?;
        for kind in MoleculeKind::ALL {
            let actual = self.fields[kind.index()].len();
            if actual != expected {
                return Err(WorldError::FieldLength {
                    molecule: kind,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Extents shared by every field.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Read-only view of a single field.
    #[must_use]
    pub fn view(&self, kind: MoleculeKind) -> MoleculeView<'_> {
        MoleculeView::new(self.shape, &self.fields[kind.index()])
    }

    /// Adds `amount` at `voxel`. Non-positive amounts are ignored.
    pub fn secrete(&mut self, kind: MoleculeKind, voxel: Voxel, amount: f64) {
        if !(amount > 0.0) {
            return;
        }
        if let Some(cell) = self.cell_mut(kind, voxel) {
            *cell += amount;
        }
    }

    /// Multiplies the concentration at `voxel` by `factor`, clamped to `[0, 1]`.
    pub fn scale(&mut self, kind: MoleculeKind, voxel: Voxel, factor: f64) {
        if factor.is_nan() {
            return;
        }
        let factor = factor.clamp(0.0, 1.0);
        if let Some(cell) = self.cell_mut(kind, voxel) {
            *cell *= factor;
        }
    }

    /// Removes up to `amount` at `voxel` and returns the quantity removed.
    pub fn take(&mut self, kind: MoleculeKind, voxel: Voxel, amount: f64) -> f64 {
        if !(amount > 0.0) {
            return 0.0;
        }
        let Some(cell) = self.cell_mut(kind, voxel) else {
            return 0.0;
        };
        let taken = amount.min(*cell);
        *cell -= taken;
        taken
    }

    /// Degrades every cell of the field by its binding-aware turnover factor.
    pub fn turnover(&mut self, kind: MoleculeKind, decay_exponent: f64, system_concentration: f64) {
        for cell in &mut self.fields[kind.index()] {
            *cell *= turnover_factor(*cell, system_concentration, decay_exponent);
        }
    }

    /// Applies one explicit Euler diffusion step with no-flux boundaries.
    ///
    /// `rates` holds `D * dt / dx^2` per axis. The update conserves the field
    /// total and stays non-negative while the rates sum to at most one half.
    pub fn diffuse(&mut self, kind: MoleculeKind, rates: [f64; 3]) {
        let x_len = self.shape.x_len() as usize;
        let y_len = self.shape.y_len() as usize;
        let z_len = self.shape.z_len() as usize;
        let field = &self.fields[kind.index()];
        if field.len() != x_len * y_len * z_len {
            return;
        }

        let [rate_x, rate_y, rate_z] = rates;
        let plane = x_len * y_len;
        self.scratch.clear();
        self.scratch.resize(field.len(), 0.0);

        for z in 0..z_len {
            for y in 0..y_len {
                for x in 0..x_len {
                    let index = z * plane + y * x_len + x;
                    let centre = field[index];
                    let along_x = second_difference(field, index, 1, x, x_len);
                    let along_y = second_difference(field, index, x_len, y, y_len);
                    let along_z = second_difference(field, index, plane, z, z_len);
                    self.scratch[index] =
                        centre + rate_x * along_x + rate_y * along_y + rate_z * along_z;
                }
            }
        }

        std::mem::swap(&mut self.fields[kind.index()], &mut self.scratch);
    }

    fn cell_mut(&mut self, kind: MoleculeKind, voxel: Voxel) -> Option<&mut f64> {
        let index = self.shape.index(voxel)?;
        self.fields[kind.index()].get_mut(index)
    }
}

impl PartialEq for MoleculeFields {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.fields == other.fields
    }
}

/// Second difference along one axis; a missing neighbour mirrors the centre.
fn second_difference(
    field: &[f64],
    index: usize,
    stride: usize,
    position: usize,
    len: usize,
) -> f64 {
    let centre = field[index];
    let lower = if position > 0 {
        field[index - stride]
    } else {
        centre
    };
    let upper = if position + 1 < len {
        field[index + stride]
    } else {
        centre
    };
    lower + upper - 2.0 * centre
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CHEMOKINE: MoleculeKind = MoleculeKind::MacrophageChemokine;

    fn fields(shape: GridShape) -> MoleculeFields {
        MoleculeFields::new(shape, [0.0; SPECIES]).expect("small grid")
    }

    #[test]
    fn secretion_is_additive_and_local() {
        let mut fields = fields(GridShape::new(2, 2, 2));
        fields.secrete(CHEMOKINE, Voxel::new(1, 1, 1), 2.5);
        fields.secrete(CHEMOKINE, Voxel::new(1, 1, 1), 2.5);
        fields.secrete(CHEMOKINE, Voxel::new(0, 0, 0), -1.0);

        let view = fields.view(CHEMOKINE);
        assert_eq!(view.concentration(Voxel::new(1, 1, 1)), 5.0);
        assert_eq!(view.total(), 5.0);
        assert_eq!(fields.view(MoleculeKind::Iron).total(), 0.0);
    }

    #[test]
    fn take_never_removes_more_than_present() {
        let mut fields = fields(GridShape::new(1, 1, 1));
        let voxel = Voxel::new(0, 0, 0);
        fields.secrete(MoleculeKind::Iron, voxel, 3.0);

        assert_eq!(fields.take(MoleculeKind::Iron, voxel, 1.0), 1.0);
        assert_eq!(fields.take(MoleculeKind::Iron, voxel, 10.0), 2.0);
        assert_eq!(fields.view(MoleculeKind::Iron).total(), 0.0);
    }

    #[test]
    fn scale_clamps_factor() {
        let mut fields = fields(GridShape::new(1, 1, 1));
        let voxel = Voxel::new(0, 0, 0);
        fields.secrete(CHEMOKINE, voxel, 4.0);
        fields.scale(CHEMOKINE, voxel, 1.5);
        assert_eq!(fields.view(CHEMOKINE).total(), 4.0);
        fields.scale(CHEMOKINE, voxel, 0.25);
        assert_eq!(fields.view(CHEMOKINE).total(), 1.0);
    }

    #[test]
    fn zero_rates_leave_field_unchanged() {
        let mut fields = fields(GridShape::new(3, 1, 1));
        fields.secrete(CHEMOKINE, Voxel::new(1, 0, 0), 9.0);
        let before = fields.view(CHEMOKINE).values().to_vec();

        fields.diffuse(CHEMOKINE, [0.0; 3]);
        fields.turnover(CHEMOKINE, 0.0, 0.0);

        assert_eq!(fields.view(CHEMOKINE).values(), before.as_slice());
    }

    #[test]
    fn diffusion_spreads_spike_to_face_neighbours() {
        let mut fields = fields(GridShape::new(3, 3, 3));
        let centre = Voxel::new(1, 1, 1);
        fields.secrete(CHEMOKINE, centre, 6.0);

        fields.diffuse(CHEMOKINE, [0.1, 0.1, 0.1]);

        let view = fields.view(CHEMOKINE);
        assert!((view.concentration(centre) - 2.4).abs() < 1e-12);
        assert!((view.concentration(Voxel::new(0, 1, 1)) - 0.6).abs() < 1e-12);
        assert!((view.concentration(Voxel::new(1, 1, 2)) - 0.6).abs() < 1e-12);
        assert_eq!(view.concentration(Voxel::new(0, 0, 0)), 0.0);
        assert!((view.total() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn uniform_field_is_a_fixed_point_of_diffusion() {
        let mut fields = MoleculeFields::new(GridShape::new(4, 3, 2), [1.5; SPECIES]).expect("small grid");
        fields.diffuse(MoleculeKind::Hemolysin, [0.2, 0.15, 0.1]);
        assert!(fields
            .view(MoleculeKind::Hemolysin)
            .values()
            .iter()
            .all(|value| (value - 1.5).abs() < 1e-12));
    }

    #[test]
    fn equality_ignores_diffusion_buffer() {
        let mut diffused = fields(GridShape::new(3, 1, 1));
        diffused.secrete(CHEMOKINE, Voxel::new(0, 0, 0), 3.0);
        diffused.diffuse(CHEMOKINE, [0.0; 3]);

        let mut fresh = fields(GridShape::new(3, 1, 1));
        fresh.secrete(CHEMOKINE, Voxel::new(0, 0, 0), 3.0);
        assert!(fresh.scratch.is_empty());
        assert!(!diffused.scratch.is_empty());
        assert_eq!(diffused, fresh);

        let bytes = bincode::serialize(&diffused).expect("fields encode");
        let decoded: MoleculeFields = bincode::deserialize(&bytes).expect("fields decode");
        assert_eq!(decoded, diffused);
    }

    #[test]
    fn oversized_grid_cannot_hold_fields() {
        let shape = GridShape::new(4_000_000, 4_000_000, 4_000_000);
        assert!(matches!(
            MoleculeFields::new(shape, [0.0; SPECIES]),
            Err(WorldError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn truncated_field_is_reported() {
        let mut fields = fields(GridShape::new(2, 1, 1));
        assert!(fields.validate().is_ok());
        let _ = fields.fields[MoleculeKind::Iron.index()].pop();
        assert!(matches!(
            fields.validate(),
            Err(WorldError::FieldLength {
                molecule: MoleculeKind::Iron,
                expected: 2,
                actual: 1,
            })
        ));
    }

    proptest! {
        #[test]
        fn fields_stay_non_negative(
            values in proptest::collection::vec(0.0_f64..100.0, 27),
            rates in (0.0_f64..0.5).prop_flat_map(|x| (Just(x), 0.0..(0.5 - x)))
                .prop_flat_map(|(x, y)| (Just(x), Just(y), 0.0..(0.5 - x - y + f64::EPSILON))),
            exponent in 0.0_f64..10.0,
            system in 0.0_f64..50.0,
        ) {
            let shape = GridShape::new(3, 3, 3);
            let mut fields = MoleculeFields::new(shape, [0.0; SPECIES]).expect("small grid");
            for (voxel, value) in shape.voxels().zip(values) {
                fields.secrete(CHEMOKINE, voxel, value);
            }
            let before = fields.view(CHEMOKINE).total();

            fields.turnover(CHEMOKINE, exponent, system);
            prop_assert!(fields.view(CHEMOKINE).values().iter().all(|value| *value >= 0.0));
            let after_turnover = fields.view(CHEMOKINE).total();
            prop_assert!(after_turnover <= before + 1e-9);

            let (x, y, z) = rates;
            fields.diffuse(CHEMOKINE, [x, y, z]);
            prop_assert!(fields.view(CHEMOKINE).values().iter().all(|value| *value >= -1e-12));
            prop_assert!((fields.view(CHEMOKINE).total() - after_turnover).abs() < 1e-6);
        }
    }
}
