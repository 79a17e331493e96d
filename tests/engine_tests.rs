//! Behavioural tests for the integration engine through the public API

use parquad::integrate::{
    EVALUATIONS_PER_REGION, EngineError, IntegrationRequest, integrate, partition,
};
use parquad::parallel::WorkQueue;
use std::sync::atomic::{AtomicU64, Ordering};

fn square(side: f64, steps: usize, threads: usize) -> IntegrationRequest {
    IntegrationRequest {
        thread_count: threads,
        points_count: 10_000_000,
        rel_err: 0.0,
        x_start: 0.0,
        x_end: side,
        y_start: 0.0,
        y_end: side,
        init_steps_x: steps,
        init_steps_y: steps,
        ..IntegrationRequest::default()
    }
}

#[test]
fn test_partition_endpoints_and_order() {
    for (n, start, end) in [(1, 0.0, 1.0), (7, -3.5, 2.25), (100, -50.0, 50.0)] {
        let points = partition(n, start, end).unwrap();
        assert_eq!(points.len(), n + 1);
        assert_eq!(points[0], start);
        assert_eq!(points[n], end);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
    }
    assert!(matches!(partition(0, 0.0, 1.0), Err(EngineError::InvalidArgument(_))));
}

#[test]
fn test_constant_integrand_any_thread_count() {
    for threads in [1, 2, 8] {
        let request = square(10.0, 4, threads);
        let result = integrate(&request, &|_: f64, _: f64| 1.0).unwrap();
        assert!(
            (result.value - 100.0).abs() <= request.abs_err,
            "{threads} threads gave {}",
            result.value
        );
    }
}

#[test]
fn test_thread_count_does_not_change_result() {
    let f = |x: f64, y: f64| (x * y).sin() + (-(x - 1.0).powi(2)).exp();
    let request = IntegrationRequest {
        abs_err: 1e-5,
        ..square(2.0, 3, 1)
    };

    let baseline = integrate(&request, &f).unwrap();
    for threads in [2, 3, 8] {
        let result = integrate(&IntegrationRequest { thread_count: threads, ..request.clone() }, &f)
            .unwrap();
        assert!((result.value - baseline.value).abs() <= 1e-9 * baseline.value.abs().max(1.0));
        assert_eq!(result.evaluations, baseline.evaluations);
        assert_eq!(result.stats.regions_subdivided, baseline.stats.regions_subdivided);
    }
}

#[test]
fn test_error_estimate_within_tolerance() {
    let f = |x: f64, y: f64| x.sin() * y.cos();
    let exact = (1.0 - 3f64.cos()) * 3f64.sin();

    let loose = integrate(&IntegrationRequest { abs_err: 1e-4, ..square(3.0, 2, 4) }, &f).unwrap();
    let tight = integrate(&IntegrationRequest { abs_err: 1e-7, ..square(3.0, 2, 4) }, &f).unwrap();

    assert!(loose.error_estimate <= 1e-4);
    assert!(tight.error_estimate <= 1e-7);
    assert!(tight.evaluations >= loose.evaluations);
    assert!((tight.value - exact).abs() < 1e-6);
    assert!(!tight.stats.budget_exhausted);
}

#[test]
fn test_zero_max_iter_evaluates_seeds_only() {
    let request = IntegrationRequest {
        abs_err: 1e-15,
        max_iter: 0,
        init_steps_x: 6,
        init_steps_y: 5,
        ..square(2.0, 1, 3)
    };
    let result = integrate(&request, &|x: f64, y: f64| (10.0 * x * y).cos()).unwrap();
    assert_eq!(result.evaluations, 30 * EVALUATIONS_PER_REGION);
    assert_eq!(result.stats.regions_subdivided, 0);
    assert_eq!(result.stats.regions_accepted, 30);
    assert_eq!(result.stats.max_depth, 0);
}

#[test]
fn test_depth_limit_bounds_evaluations() {
    let request = IntegrationRequest {
        abs_err: 1e-15,
        max_iter: 2,
        ..square(2.0, 2, 4)
    };
    let result = integrate(&request, &|x: f64, y: f64| (10.0 * x * y).cos()).unwrap();

    // each seed expands to at most 1 + 4 + 16 regions
    let seeds = request.seed_count() as u64;
    assert!(result.evaluations <= EVALUATIONS_PER_REGION * seeds * 21);
    assert!(result.stats.max_depth <= 2);
    assert!(!result.stats.budget_exhausted);
}

#[test]
fn test_relative_tolerance_bounds_error() {
    let abs_err = 1e-6;
    let rel_err = 1e-3;
    let request = IntegrationRequest {
        abs_err,
        rel_err,
        ..square(2.0, 4, 4)
    };
    // positive integrand: the live sum only grows towards the final value
    let result = integrate(&request, &|x: f64, y: f64| (-(x * x + y * y)).exp()).unwrap();

    let tolerance = abs_err.max(rel_err * result.value.abs());
    assert!(!result.stats.budget_exhausted);
    assert!(
        result.error_estimate <= tolerance * (1.0 + 1e-12),
        "{} > {tolerance}",
        result.error_estimate
    );
    assert!((result.value - 0.778_067_579_929_367_8).abs() <= tolerance);
}

#[test]
fn test_budget_bounds_evaluations() {
    let threads = 4;
    let request = IntegrationRequest {
        abs_err: 1e-14,
        points_count: 20_000,
        x_start: -5.0,
        y_start: -5.0,
        ..square(5.0, 2, threads)
    };
    let result = integrate(&request, &parquad::functions::ackley).unwrap();

    let seeds = request.seed_count() as u64;
    let bound = EVALUATIONS_PER_REGION * seeds
        + 4 * request.points_count
        + 4 * EVALUATIONS_PER_REGION * (threads as u64 + 1);
    assert!(result.stats.budget_exhausted);
    assert!(result.evaluations <= bound, "{} > {bound}", result.evaluations);
}

#[test]
fn test_every_integrand_call_is_counted() {
    let calls = AtomicU64::new(0);
    let f = |x: f64, y: f64| {
        calls.fetch_add(1, Ordering::Relaxed);
        (x + y).cos()
    };
    let result = integrate(&IntegrationRequest { abs_err: 1e-6, ..square(3.0, 2, 4) }, &f).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), result.evaluations);
}

#[test]
fn test_panicking_integrand_is_reported() {
    let result = integrate(&square(1.0, 2, 4), &|x: f64, _: f64| {
        if x > 0.5 {
            panic!("outside the table");
        }
        x
    });
    match result {
        Err(EngineError::IntegrandFault { x, reason, .. }) => {
            assert!(x > 0.5);
            assert!(reason.contains("outside the table"));
        }
        other => panic!("expected an integrand fault, got {other:?}"),
    }
}

#[test]
fn test_queue_delivers_each_item_once() {
    let queue = &WorkQueue::new();
    let producers = 4;
    let per_producer = 1_000;

    let mut received: Vec<usize> = crossbeam::thread::scope(|s| {
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(move |_| {
                    let mut seen = Vec::new();
                    while let Some(item) = queue.pop() {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        let pushers: Vec<_> = (0..producers)
            .map(|p| {
                s.spawn(move |_| {
                    for i in 0..per_producer {
                        queue.push(p * per_producer + i);
                    }
                })
            })
            .collect();
        for pusher in pushers {
            pusher.join().unwrap();
        }
        queue.shutdown();

        consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect()
    })
    .unwrap();

    received.sort_unstable();
    assert_eq!(received, (0..producers * per_producer).collect::<Vec<_>>());
}
