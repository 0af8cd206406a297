//! The within estimator against explicit dummy-variable OLS.

use approx::assert_relative_eq;
use ndarray::{Array1, Array2};
use panelfe_data::PanelSample;
use panelfe_estimate::linalg::{DEFAULT_PIVOT_TOLERANCE, invert_spd};
use panelfe_estimate::{
    ClusteredCovariance, CovarianceEstimator, EstimationError, PanelRegression, RegressionSpec,
    WithinEstimator, cluster_robust_covariance,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

struct Rows {
    entities: Vec<String>,
    times: Vec<i64>,
    y: Vec<f64>,
    x1: Vec<f64>,
    x2: Vec<f64>,
}

/// Unbalanced panel: 8 entities, 6 periods, a few cells missing.
fn unbalanced_rows(seed: u64) -> Rows {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Rows {
        entities: Vec::new(),
        times: Vec::new(),
        y: Vec::new(),
        x1: Vec::new(),
        x2: Vec::new(),
    };
    for e in 0..8 {
        let alpha: f64 = rng.gen_range(-2.0..2.0);
        for t in 0..6 {
            // keep periods 0 and 1 for everyone so the panel stays connected
            if t > 1 && (e + t) % 4 == 0 {
                continue;
            }
            let x1: f64 = rng.gen_range(-1.0..3.0);
            let x2: f64 = rng.gen_range(0.0..1.0) + 0.2 * x1;
            let gamma = 0.3 * t as f64;
            rows.entities.push(format!("c{e}"));
            rows.times.push(2000 + t as i64);
            rows.x1.push(x1);
            rows.x2.push(x2);
            rows.y
                .push(1.5 * x1 - 0.7 * x2 + alpha + gamma + rng.gen_range(-0.3..0.3));
        }
    }
    rows
}

/// Staggered panel: entity `e` observed in periods `e`, `e + 1` and `e + 2`,
/// so neighbouring entities share two periods and the chain is connected.
fn staggered_rows(entities: usize, seed: u64) -> Rows {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Rows {
        entities: Vec::new(),
        times: Vec::new(),
        y: Vec::new(),
        x1: Vec::new(),
        x2: Vec::new(),
    };
    for e in 0..entities {
        let alpha: f64 = rng.gen_range(-2.0..2.0);
        for t in e..e + 3 {
            let x1: f64 = rng.gen_range(-1.0..3.0);
            let x2: f64 = rng.gen_range(0.0..1.0);
            rows.entities.push(format!("c{e:03}"));
            rows.times.push(t as i64);
            rows.x1.push(x1);
            rows.x2.push(x2);
            rows.y
                .push(0.8 * x1 + 0.4 * x2 + alpha + 0.05 * t as f64 + rng.gen_range(-0.3..0.3));
        }
    }
    rows
}

fn sample_of(rows: &Rows) -> PanelSample {
    PanelSample::new(
        "y",
        vec!["x1".to_string(), "x2".to_string()],
        &rows.entities,
        &rows.times,
        rows.y.clone(),
        vec![rows.x1.clone(), rows.x2.clone()],
    )
    .unwrap()
}

/// Explicit dummy-variable regression.
struct DummyOls {
    design: Array2<f64>,
    xtx_inv: Array2<f64>,
    beta: Array1<f64>,
    resid: Array1<f64>,
}

/// OLS of y on [x1, x2, entity dummies, time dummies except the first].
fn dummy_ols(sample: &PanelSample) -> DummyOls {
    let n = sample.len();
    let e = sample.n_entities();
    let t = sample.n_periods();
    let p = 2 + e + (t - 1);
    let mut design = Array2::<f64>::zeros((n, p));
    for i in 0..n {
        design[[i, 0]] = sample.columns()[0][i];
        design[[i, 1]] = sample.columns()[1][i];
        design[[i, 2 + sample.entity_index()[i]]] = 1.0;
        let ti = sample.time_index()[i];
        if ti > 0 {
            design[[i, 2 + e + ti - 1]] = 1.0;
        }
    }
    let y = Array1::from_vec(sample.y().to_vec());
    let xtx_inv = invert_spd(&design.t().dot(&design), DEFAULT_PIVOT_TOLERANCE).unwrap();
    let beta = xtx_inv.dot(&design.t().dot(&y));
    let resid = &y - &design.dot(&beta);
    DummyOls {
        design,
        xtx_inv,
        beta,
        resid,
    }
}

#[test]
fn test_matches_dummy_variable_ols() {
    let rows = unbalanced_rows(42);
    let sample = sample_of(&rows);
    assert!(!sample.is_balanced());

    let fit = WithinEstimator::default().fit(&sample).unwrap();
    let ols = dummy_ols(&sample);

    assert_relative_eq!(fit.coefficients[0], ols.beta[0], epsilon = 1e-8);
    assert_relative_eq!(fit.coefficients[1], ols.beta[1], epsilon = 1e-8);
    for (a, b) in fit.residuals.iter().zip(ols.resid.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-7);
    }
    assert_relative_eq!(fit.rss, ols.resid.dot(&ols.resid), epsilon = 1e-8);
}

#[test]
fn test_clustered_covariance_matches_dummy_design() {
    // the regressor block of the sandwich is the same whether the effects
    // are absorbed or estimated as dummies
    let rows = unbalanced_rows(11);
    let sample = sample_of(&rows);
    let fit = WithinEstimator::default().fit(&sample).unwrap();
    let parameters = fit.effective_parameters();
    let within = cluster_robust_covariance(
        &fit.design,
        &fit.residuals,
        &fit.xtx_inv,
        &fit.clusters,
        parameters,
    )
    .unwrap();

    let ols = dummy_ols(&sample);
    assert_eq!(ols.design.ncols(), parameters + 1);
    let full = cluster_robust_covariance(
        &ols.design,
        &ols.resid,
        &ols.xtx_inv,
        sample.entity_index(),
        parameters,
    )
    .unwrap();

    for i in 0..2 {
        for j in 0..2 {
            assert_relative_eq!(within[[i, j]], full[[i, j]], epsilon = 1e-8, max_relative = 1e-6);
        }
    }
    assert!(within[[0, 0]] > 0.0 && within[[1, 1]] > 0.0);
}

#[test]
fn test_row_order_does_not_matter() {
    let rows = unbalanced_rows(5);
    let baseline = WithinEstimator::default().fit(&sample_of(&rows)).unwrap();

    let mut order: Vec<usize> = (0..rows.y.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(99));
    let shuffled = Rows {
        entities: order.iter().map(|&i| rows.entities[i].clone()).collect(),
        times: order.iter().map(|&i| rows.times[i]).collect(),
        y: order.iter().map(|&i| rows.y[i]).collect(),
        x1: order.iter().map(|&i| rows.x1[i]).collect(),
        x2: order.iter().map(|&i| rows.x2[i]).collect(),
    };
    let permuted = WithinEstimator::default().fit(&sample_of(&shuffled)).unwrap();

    assert_relative_eq!(baseline.coefficients[0], permuted.coefficients[0], epsilon = 1e-9);
    assert_relative_eq!(baseline.coefficients[1], permuted.coefficients[1], epsilon = 1e-9);
    assert_relative_eq!(baseline.r2_within, permuted.r2_within, epsilon = 1e-9);

    let se_before = ClusteredCovariance.standard_errors(&baseline).unwrap();
    let se_after = ClusteredCovariance.standard_errors(&permuted).unwrap();
    for (a, b) in se_before.iter().zip(se_after.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-10, max_relative = 1e-9);
    }

    let spec = RegressionSpec::new("baseline_level", "y", "x1").with_controls(["x2".to_string()]);
    let regression = PanelRegression::default();
    let before = regression.fit_sample(&sample_of(&rows), &spec).unwrap();
    let after = regression.fit_sample(&sample_of(&shuffled), &spec).unwrap();
    assert_relative_eq!(before.se, after.se, epsilon = 1e-10, max_relative = 1e-9);
    assert_relative_eq!(before.ci_low, after.ci_low, epsilon = 1e-9);
    assert_relative_eq!(before.ci_high, after.ci_high, epsilon = 1e-9);
}

#[test]
fn test_staggered_panel_matches_dummy_variable_ols() {
    let rows = staggered_rows(30, 17);
    let sample = sample_of(&rows);
    assert_eq!(sample.n_periods(), 32);

    let fit = WithinEstimator::default().fit(&sample).unwrap();
    let ols = dummy_ols(&sample);

    assert_relative_eq!(fit.coefficients[0], ols.beta[0], epsilon = 1e-8);
    assert_relative_eq!(fit.coefficients[1], ols.beta[1], epsilon = 1e-8);
    for (a, b) in fit.residuals.iter().zip(ols.resid.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-7);
    }
}

#[test]
fn test_long_staggered_panel_is_estimated() {
    let rows = staggered_rows(200, 3);
    let sample = sample_of(&rows);
    assert_eq!(sample.len(), 600);

    let fit = WithinEstimator::default().fit(&sample).unwrap();
    assert_eq!(fit.demean_iterations, 1);
    assert!((fit.coefficients[0] - 0.8).abs() < 0.15);
    assert!(ClusteredCovariance.standard_errors(&fit).unwrap()[0] > 0.0);
}

#[test]
fn test_regression_result_for_common_trend_treatment() {
    // every entity receives the same treatment path, which the time effects absorb
    let entities: Vec<String> = ["A", "B", "C"]
        .iter()
        .flat_map(|e| std::iter::repeat(e.to_string()).take(3))
        .collect();
    let times: Vec<i64> = (0..3).flat_map(|_| [1, 2, 3]).collect();
    let treat: Vec<f64> = (0..3).flat_map(|_| [0.0, 1.0, 2.0]).collect();
    let alpha = [0.0, 1.0, -1.0];
    let y: Vec<f64> = (0..9)
        .map(|i| 2.0 * treat[i] + alpha[i / 3] + 0.5 * (i % 3) as f64)
        .collect();
    let sample = PanelSample::new(
        "y",
        vec!["treat".to_string()],
        &entities,
        &times,
        y,
        vec![treat],
    )
    .unwrap();

    let spec = RegressionSpec::new("baseline_level", "y", "treat");
    let err = PanelRegression::default()
        .fit_sample(&sample, &spec)
        .unwrap_err();
    assert!(matches!(err, EstimationError::PerfectCollinearity { .. }));
}

#[test]
fn test_entity_specific_treatment_is_recovered() {
    let entities: Vec<String> = ["A", "B", "C"]
        .iter()
        .flat_map(|e| std::iter::repeat(e.to_string()).take(3))
        .collect();
    let times: Vec<i64> = (0..3).flat_map(|_| [1, 2, 3]).collect();
    let treat = vec![0.0, 1.0, 2.0, 0.0, 2.0, 3.0, 1.0, 1.0, 4.0];
    let alpha = [0.0, 1.0, -1.0];
    let noise = [0.01, -0.02, 0.01, 0.0, 0.015, -0.015, -0.01, 0.02, -0.01];
    let y: Vec<f64> = (0..9)
        .map(|i| 2.0 * treat[i] + alpha[i / 3] + 0.5 * (i % 3) as f64 + noise[i])
        .collect();
    let sample = PanelSample::new(
        "y",
        vec!["treat".to_string()],
        &entities,
        &times,
        y,
        vec![treat],
    )
    .unwrap();

    let spec = RegressionSpec::new("baseline_level", "y", "treat");
    let result = PanelRegression::default().fit_sample(&sample, &spec).unwrap();

    assert!((result.coef - 2.0).abs() < 0.05);
    assert!(result.se > 0.0);
    assert!(result.ci_low < 2.0 && 2.0 < result.ci_high);
    assert_eq!(result.nobs, 9);
    assert_eq!(result.n_entity, 3);
    assert_eq!(result.n_time, 3);
    assert!(result.r2_within > 0.9);
}
