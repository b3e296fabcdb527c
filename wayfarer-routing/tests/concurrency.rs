mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use wayfarer_routing::{BuildError, EngineGate, Error, GateStatus, Profile, RouteOutcome};

use common::*;

const THREADS: usize = 8;

#[test]
fn test_gate_builds_exactly_once() {
    let gate = Arc::new(EngineGate::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let builds = Arc::clone(&builds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gate.get_or_build(|| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Ok(rhombus_engine())
                })
                .unwrap()
            })
        })
        .collect();

    let engines: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(gate.status(), GateStatus::Ready);
    for engine in &engines[1..] {
        assert!(Arc::ptr_eq(&engines[0], engine));
    }
}

#[test]
fn test_waiters_see_the_build_failure() {
    let gate = Arc::new(EngineGate::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let builds = Arc::clone(&builds);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gate.get_or_build(|| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Err(BuildError::NoProfiles.into())
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(gate.status(), GateStatus::Failed);
    let build_errors = results
        .iter()
        .filter(|r| matches!(r, Err(Error::Build(BuildError::NoProfiles))))
        .count();
    let unavailable = results
        .iter()
        .filter(|r| matches!(r, Err(Error::EngineUnavailable(_))))
        .count();
    assert_eq!(build_errors, 1);
    assert_eq!(unavailable, THREADS - 1);

    // No retry after a failure
    assert!(matches!(
        gate.get_or_build(|| Ok(rhombus_engine())),
        Err(Error::EngineUnavailable(_))
    ));
}

#[test]
fn test_concurrent_queries_agree() {
    let engine = rhombus_engine();
    let queries = [
        (Profile::Car, rhombus_point(A), rhombus_point(C)),
        (Profile::Foot, rhombus_point(A), rhombus_point(C)),
        (Profile::Bike, at(RHOMBUS_LON, 20.0, 30.0), at(RHOMBUS_LON, 90.0, -50.0)),
        (Profile::Car, at(RHOMBUS_LON, 100.0, -20.0), rhombus_point(B)),
    ];
    let expected: Vec<RouteOutcome> = queries
        .iter()
        .map(|&(p, a, b)| engine.calculate_route(p, a.lat, a.lon, b.lat, b.lon).unwrap())
        .collect();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let engine = &engine;
            let queries = &queries;
            let expected = &expected;
            scope.spawn(move || {
                for round in 0..25 {
                    let i = (t + round) % queries.len();
                    let (profile, a, b) = queries[i];
                    let outcome = engine
                        .calculate_route(profile, a.lat, a.lon, b.lat, b.lon)
                        .unwrap();
                    assert_eq!(outcome, expected[i]);
                    assert!(engine.resolve_point(profile, a.lat, a.lon).unwrap().is_some());
                }
            });
        }
    });
}
