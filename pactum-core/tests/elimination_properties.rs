//! Algebraic properties of term lists

use pactum_core::{MinilpOracle, Term, TermList, Var};
use proptest::prelude::*;

fn bounds_list(x: (i32, i32), y: (i32, i32), coupling: i32) -> TermList {
    TermList::new([
        Term::le([("x", 1.0)], x.1 as f64).unwrap(),
        Term::le([("x", -1.0)], -(x.0 as f64)).unwrap(),
        Term::le([("y", 1.0)], y.1 as f64).unwrap(),
        Term::le([("y", -1.0)], -(y.0 as f64)).unwrap(),
        Term::le([("x", 1.0), ("y", -1.0)], coupling as f64).unwrap(),
    ])
}

fn nonzero_coefficient() -> impl Strategy<Value = f64> {
    prop_oneof![-5i32..=-1, 1i32..=5].prop_map(|c| c as f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_canonical_form_round_trips(
        a in nonzero_coefficient(),
        b in nonzero_coefficient(),
        constant in -20i32..20,
        equality in any::<bool>()
    ) {
        let coefficients = [("u", a), ("v", b)];
        let term = if equality {
            Term::equality(coefficients, constant as f64).unwrap()
        } else {
            Term::le(coefficients, constant as f64).unwrap()
        };
        let parsed: Term = term.to_string().parse().unwrap();
        prop_assert_eq!(parsed, term);
    }

    #[test]
    fn prop_eliminating_absent_variable_is_identity(
        x_lo in -10i32..0, x_hi in 0i32..10,
        y_lo in -10i32..0, y_hi in 0i32..10,
        coupling in -5i32..5
    ) {
        let oracle = MinilpOracle::new();
        let region = bounds_list((x_lo, x_hi), (y_lo, y_hi), coupling);
        let projected = region.eliminate_vars(["z"], &oracle).unwrap();
        prop_assert!(projected.is_equivalent(&region, &oracle).unwrap());
    }

    #[test]
    fn prop_projection_preserves_remaining_bounds(
        x_lo in -10i32..0, x_hi in 0i32..10,
        y_lo in -10i32..0, y_hi in 0i32..10,
        coupling in -15i32..15
    ) {
        let oracle = MinilpOracle::new();
        let region = bounds_list((x_lo, x_hi), (y_lo, y_hi), coupling);
        let projected = region.eliminate_vars(["y"], &oracle).unwrap();
        prop_assert!(!projected.contains_var("y"));

        let before = region.get_variable_bounds("x", &oracle).unwrap();
        let after = projected.get_variable_bounds("x", &oracle).unwrap();
        match (before, after) {
            (Some(before), Some(after)) => {
                prop_assert!((before.lower - after.lower).abs() < 1e-6);
                prop_assert!((before.upper - after.upper).abs() < 1e-6);
            }
            (None, None) => {}
            other => prop_assert!(false, "feasibility changed: {:?}", other),
        }
    }

    #[test]
    fn prop_simplify_preserves_region(
        x_lo in -10i32..0, x_hi in 0i32..10,
        y_lo in -10i32..0, y_hi in 0i32..10,
        coupling in -15i32..15
    ) {
        let oracle = MinilpOracle::new();
        let region = bounds_list((x_lo, x_hi), (y_lo, y_hi), coupling);
        let simplified = region.simplify(None, &oracle).unwrap();
        prop_assert!(simplified.len() <= region.len());
        prop_assert!(simplified.is_equivalent(&region, &oracle).unwrap());
    }

    #[test]
    fn prop_refining_result_implies_original(
        bound in -10i32..10,
        slack in 0i32..10
    ) {
        // y <= x and x <= bound, require y <= bound + slack
        let oracle = MinilpOracle::new();
        let context = TermList::new([
            Term::le([("y", 1.0), ("x", -1.0)], 0.0).unwrap(),
            Term::le([("x", 1.0)], bound as f64).unwrap(),
        ]);
        let required = TermList::new([Term::le([("y", 1.0)], (bound + slack) as f64).unwrap()]);
        let refined = required
            .eliminate_vars_refining(&context, [Var::from("y")], &oracle)
            .unwrap();
        prop_assert!(!refined.contains_var("y"));
        prop_assert!(refined.conjoin(&context).refines(&required, &oracle).unwrap());
    }
}
