mod common;

use bmr_sim::{Termination, TourStatistics, TraceMoments};

use common::gaussian_engine;

#[test]
fn fast_output_clock_records_every_tour() {
    let mut engine = gaussian_engine(100, 1000.0, 2024);
    let summary = engine.run_fixed_tours().unwrap();

    assert_eq!(summary.termination, Termination::Completed);
    assert_eq!(summary.tours_completed, 100);
    assert_eq!(engine.current_tour(), 100);

    let trace = engine.trace();
    assert!(trace.len() > 1000, "only {} outputs", trace.len());
    assert!(trace.states().iter().all(|state| state.len() == 2));
    assert!(trace.tours().windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(trace.times().windows(2).all(|pair| pair[0] < pair[1]));
    assert!(trace.tours().iter().all(|&tour| tour < 100));

    let tours = TourStatistics::from_trace(trace);
    // a tour can end before the output clock fires, so allow a few gaps
    assert!(tours.tours_observed() >= 90, "{} tours observed", tours.tours_observed());
    assert_eq!(summary.stats.regenerations, 100);
    assert_eq!(summary.stats.outputs as usize, trace.len());
}

#[test]
fn output_rate_controls_trace_density() {
    let mut fast = gaussian_engine(100, 1000.0, 7);
    let mut slow = gaussian_engine(100, 1.0, 7);
    fast.run_fixed_tours().unwrap();
    slow.run_fixed_tours().unwrap();

    assert_eq!(fast.current_tour(), slow.current_tour());
    assert!(
        fast.trace().len() > 50 * slow.trace().len().max(1),
        "fast {} slow {}",
        fast.trace().len(),
        slow.trace().len()
    );
}

#[test]
fn outputs_estimate_target_moments() {
    let mut engine = gaussian_engine(2000, 10.0, 99);
    engine.run_fixed_tours().unwrap();

    let moments = TraceMoments::from_trace(engine.trace()).unwrap();
    assert!(moments.count > 1000);
    assert!(moments.mean[0].abs() < 0.3, "mean {}", moments.mean);
    assert!(moments.mean[1].abs() < 0.3, "mean {}", moments.mean);

    // covariance [[1.2, 0.4], [0.4, 0.8]]
    let cov = &moments.covariance;
    assert!(cov[(0, 0)] > 0.8 && cov[(0, 0)] < 1.6, "cov {cov}");
    assert!(cov[(1, 1)] > 0.5 && cov[(1, 1)] < 1.1, "cov {cov}");
    assert!(cov[(0, 1)] > 0.15 && cov[(0, 1)] < 0.7, "cov {cov}");
}

#[test]
#[ignore = "long run: about eight million steps"]
fn slow_output_clock_over_many_tours() {
    let mut engine = gaussian_engine(100_000, 1.0, 2024);
    let summary = engine.run_fixed_tours().unwrap();

    assert_eq!(summary.tours_completed, 100_000);
    let tours = TourStatistics::from_trace(engine.trace());
    assert!(tours.mean_outputs_per_tour() < 5.0);
    assert!(engine.trace().tours().iter().all(|&tour| tour < 100_000));
}
