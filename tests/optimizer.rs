use std::cell::Cell;

use nrl_form::error::PipelineError;
use nrl_form::optimizer::Optimizer;

#[test]
fn quadratic_scenario_lands_in_window() {
    let opt = Optimizer::new(0.001, 100).unwrap();
    let max = opt
        .find_maximum(|x| -(x - 0.5).powi(2) + 1.0, (0.0, 1.0), 0.05)
        .unwrap();
    assert!(max.converged);
    assert!(
        (0.495..=0.505).contains(&max.argument),
        "argument {}",
        max.argument
    );
}

#[test]
fn interior_vertices_are_found_across_ranges() {
    let opt = Optimizer::default();
    for (c, k, range, step) in [
        (0.23, 4.0, (0.0, 1.0), 0.05),
        (-3.7, 0.0, (-10.0, 10.0), 0.5),
        (12.5, -2.0, (10.0, 20.0), 0.25),
    ] {
        let max = opt
            .find_maximum(|x: f64| -(x - c).powi(2) + k, range, step)
            .unwrap();
        assert!(max.converged, "c={c}");
        assert!((max.argument - c).abs() < 2.0 * step, "c={c} got {}", max.argument);
        assert!(max.is_interior(range));
    }
}

#[test]
fn captured_arguments_are_passed_through() {
    let opt = Optimizer::default();
    let centre = 0.7;
    let scale = 2.0;
    let objective = |x: f64| -scale * (x - centre).powi(2);
    let max = opt.find_maximum(objective, (0.0, 1.0), 0.1).unwrap();
    assert!((max.argument - centre).abs() < 0.01);
}

#[test]
fn monotone_objective_ends_near_the_boundary() {
    let opt = Optimizer::default();
    let max = opt.find_maximum(|x: f64| x, (0.0, 1.0), 0.1).unwrap();
    // The slope never flattens, so the search runs out of iterations.
    assert!(!max.converged);
    assert!(max.argument > 0.9);
}

#[test]
fn structural_errors_fail_fast() {
    let opt = Optimizer::default();
    let f = |x: f64| -x * x;
    assert_eq!(
        opt.find_maximum(f, (2.0, 1.0), 0.1),
        Err(PipelineError::InvalidSearchRange {
            low: 2.0,
            high: 1.0
        })
    );
    assert!(matches!(
        opt.find_maximum(f, (0.0, 1.0), -0.1),
        Err(PipelineError::InvalidStep { .. })
    ));
    assert!(matches!(
        opt.find_maximum(f, (0.0, f64::INFINITY), 0.1),
        Err(PipelineError::InvalidSearchRange { .. })
    ));
}

#[test]
fn stateful_objective_is_accepted_by_the_sequential_search() {
    let opt = Optimizer::default();
    let calls = Cell::new(0usize);
    let counted = |x: f64| {
        calls.set(calls.get() + 1);
        -(x - 0.3).powi(2)
    };
    let max = opt.find_maximum(counted, (0.0, 1.0), 0.1).unwrap();
    assert!((max.argument - 0.3).abs() < 0.01);
    // Ten grid samples, then slope evaluations during refinement.
    assert!(calls.get() > 10);
}

#[test]
fn parallel_search_agrees_with_sequential_search() {
    let opt = Optimizer::default();
    let f = |x: f64| -(x - 0.62).powi(2) + 2.0;
    assert_eq!(
        opt.par_find_maximum(f, (0.0, 1.0), 0.05),
        opt.find_maximum(f, (0.0, 1.0), 0.05)
    );
}
