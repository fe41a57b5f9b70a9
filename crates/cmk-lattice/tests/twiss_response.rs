use cmk_core::{ElementRegistry, Expr, LatticeModel, VariableStore};
use cmk_lattice::RingModel;
use cmk_optics::OpticsTable;

const TAU: f64 = std::f64::consts::TAU;

const OPTICS: &str = "\
@ Q1 %le 62.31
@ Q2 %le 60.32
* NAME S BETX BETY MUX MUY
 \"MQS.23R1.B1\" 150.0 64.0 81.0 0.50 0.50
 \"MQS.27R1.B1\" 210.0 49.0 100.0 1.25 1.00
";

fn model() -> RingModel {
    let table = OpticsTable::from_str_content(OPTICS).unwrap();
    RingModel::from_optics(&table).unwrap()
}

#[test]
fn single_magnet_contribution_matches_driving_term() {
    let mut model = model();
    model.set_value("k", 0.0).unwrap();
    model
        .bind_skew_strength("MQS.23R1.B1", 1, Expr::var("k"))
        .unwrap();
    assert_eq!(model.twiss().unwrap().c_minus, 0.0);

    model.set_value("k", 1e-3).unwrap();
    // dphi = 0 for this element, so the contribution is purely real:
    // w * ksl1 / tau with w = sqrt(64 * 81) = 72.
    let expected = 72.0 * 1e-3 / TAU;
    let c_minus = model.twiss().unwrap().c_minus;
    assert!((c_minus - expected).abs() < 1e-12, "{c_minus} vs {expected}");
}

#[test]
fn quarter_wave_magnet_contributes_imaginary_part() {
    let mut model = model();
    model.set_value("k", 2e-3).unwrap();
    model
        .bind_skew_strength("MQS.27R1.B1", 1, Expr::var("k"))
        .unwrap();
    // dphi = tau * (1.25 - 1.00) = pi/2: purely imaginary contribution of
    // magnitude w * ksl1 / tau with w = sqrt(49 * 100) = 70.
    let expected = 70.0 * 2e-3 / TAU;
    let c_minus = model.twiss().unwrap().c_minus;
    assert!((c_minus - expected).abs() < 1e-12, "{c_minus} vs {expected}");
}

#[test]
fn orthogonal_contributions_add_in_quadrature() {
    let mut model = model();
    model.set_value("k1", 1e-3).unwrap();
    model.set_value("k2", 2e-3).unwrap();
    model
        .bind_skew_strength("MQS.23R1.B1", 1, Expr::var("k1"))
        .unwrap();
    model
        .bind_skew_strength("MQS.27R1.B1", 1, Expr::var("k2"))
        .unwrap();
    let re = 72.0 * 1e-3 / TAU;
    let im = 70.0 * 2e-3 / TAU;
    let expected = (re * re + im * im).sqrt();
    let c_minus = model.twiss().unwrap().c_minus;
    assert!((c_minus - expected).abs() < 1e-12, "{c_minus} vs {expected}");
}

#[test]
fn base_coupling_shifts_the_modulus() {
    let mut model = model();
    model.set_base_coupling(3e-3, -4e-3);
    let c_minus = model.twiss().unwrap().c_minus;
    assert!((c_minus - 5e-3).abs() < 1e-15, "{c_minus}");
}
