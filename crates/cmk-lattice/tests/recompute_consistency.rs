use std::collections::BTreeMap;
use std::fmt::Write as _;

use cmk_core::{ElementRegistry, Expr, VariableStore};
use cmk_lattice::RingModel;
use cmk_optics::OpticsTable;
use proptest::prelude::*;

fn model(elements: usize) -> RingModel {
    let mut text = String::from("* NAME S BETX BETY MUX MUY\n");
    for idx in 0..elements {
        writeln!(
            text,
            " \"MQS.{idx}R1.B1\" {:?} 56.0 61.0 0.5 0.4",
            150.0 + 53.45 * idx as f64
        )
        .unwrap();
    }
    let table = OpticsTable::from_str_content(&text).unwrap();
    RingModel::from_optics(&table).unwrap()
}

proptest! {
    #[test]
    fn bound_attributes_always_equal_direct_evaluation(
        coeffs in prop::collection::vec(-0.05f64..0.05, 4),
        writes in prop::collection::vec((0usize..4, -2.0f64..2.0), 1..30),
    ) {
        let mut model = model(4);
        let knob_names = ["k0", "k1", "k2", "k3"];
        for name in knob_names {
            model.set_value(name, 0.0).unwrap();
        }
        for (idx, coeff) in coeffs.iter().enumerate() {
            model.set_value(&format!("c{idx}"), *coeff).unwrap();
            let expr = Expr::var(format!("c{idx}"))
                .mul(Expr::var(knob_names[idx]))
                .mul(Expr::constant(0.32));
            model
                .bind_skew_strength(&format!("MQS.{idx}R1.B1"), 1, expr)
                .unwrap();
        }

        let mut shadow: BTreeMap<String, f64> = BTreeMap::new();
        for name in knob_names {
            shadow.insert(name.to_string(), 0.0);
        }
        for (idx, coeff) in coeffs.iter().enumerate() {
            shadow.insert(format!("c{idx}"), *coeff);
        }

        for (slot, value) in writes {
            model.set_value(knob_names[slot], value).unwrap();
            shadow.insert(knob_names[slot].to_string(), value);
            for idx in 0..4 {
                let expr = Expr::var(format!("c{idx}"))
                    .mul(Expr::var(knob_names[idx]))
                    .mul(Expr::constant(0.32));
                let expected = expr.eval(&shadow).unwrap();
                let actual = model.skew_strength(&format!("MQS.{idx}R1.B1"), 1).unwrap();
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
