//! Saturating rate laws shared by the molecule and agent systems.

/// Probability-like response to a molecule quantity.
///
/// `x` is converted to a concentration by dividing by `volume`, compared with
/// the half-saturation constant `kd`, and scaled by `h`, the fraction of the
/// reference time unit covered by one tick. Negative `x` yields a
/// non-positive value.
#[must_use]
pub fn activation_function(x: f64, kd: f64, h: f64, volume: f64) -> f64 {
    let concentration = x / volume;
    h * (1.0 - (-(concentration / kd)).exp())
}

/// Multiplicative turnover factor for a single field cell.
///
/// The excess of `concentration` over `system_concentration` decays by
/// `exp(-decay_exponent)`; concentrations at or below the system level are
/// left untouched. The result always lies in `(0, 1]` for a positive finite
/// concentration, non-negative system level and finite exponent.
#[must_use]
pub fn turnover_factor(concentration: f64, system_concentration: f64, decay_exponent: f64) -> f64 {
    if !(concentration > 0.0) {
        return 1.0;
    }
    let retained = (concentration - system_concentration) * (-decay_exponent).exp()
        + system_concentration;
    let factor = retained / concentration;
    if factor.is_nan() {
        return 1.0;
    }
    factor.clamp(f64::MIN_POSITIVE, 1.0)
}
