//! Linear-optics evaluation of global quantities.

use crate::model::RingModel;

/// Evaluates `|C-|` from the current skew-strength state.
///
/// Each element with a nonzero first-order skew strength contributes
/// `w * ksl1 / 2π * exp(i * dphi)` to the complex coupling, with
/// `w = sqrt(betx * bety)` and `dphi` the horizontal-minus-vertical phase
/// difference at the element. The residual machine coupling is added before
/// taking the modulus.
pub(crate) fn coupling_closest_tune_approach(model: &RingModel) -> f64 {
    let (mut c_re, mut c_im) = model.base_coupling();
    for element in model.elements() {
        let ksl1 = element.skew_strength(1);
        if ksl1 == 0.0 {
            continue;
        }
        let amplitude = element.optics.coupling_weight() * ksl1 / std::f64::consts::TAU;
        let dphi = element.optics.phase_difference();
        c_re += amplitude * dphi.cos();
        c_im += amplitude * dphi.sin();
    }
    (c_re * c_re + c_im * c_im).sqrt()
}
