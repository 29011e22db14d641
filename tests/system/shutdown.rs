//! Cancellation and bounded-wait behaviour

use crate::common::test_helpers::*;
use handoff::core::shutdown::ShutdownSignal;
use handoff::system::{HandoffSystem, SystemState};
use handoff::worker::{Destination, WorkerExit, WorkerState};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_stop_is_prompt() {
    let mut system = fast_system();
    system.add_queue("main", 5).unwrap();
    system
        .add_producer("P1", labelled("Data", 10_000), "main", ms(1))
        .unwrap();
    system
        .add_consumer("C1", Destination::new(), "main", ms(10), None)
        .unwrap();

    system.start().unwrap();
    thread::sleep(ms(100));

    let started = Instant::now();
    system.stop().unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(system.state(), SystemState::Stopped);
    let stats = system.statistics();
    assert!(stats.total_produced < 10_000);
    assert!(stats.producers.iter().all(|p| p.state.is_terminal()));
    assert!(stats.consumers.iter().all(|c| c.state.is_terminal()));
}

#[test]
fn test_backpressure_without_consumer_ends_producer() {
    let mut system = fast_system();
    system.add_queue("main", 2).unwrap();
    system
        .add_producer("P1", labelled("Data", 5), "main", ms(0))
        .unwrap();

    system.start().unwrap();
    let started = Instant::now();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    let stats = system.statistics();
    let producer = stats.producer("P1").unwrap();
    assert_eq!(producer.produced, 2);
    assert_eq!(
        producer.state,
        WorkerState::Finished(WorkerExit::Backpressure)
    );
    assert_eq!(stats.total_remaining, 2);
}

#[test]
fn test_outer_signal_cancels_child_system() {
    let app_signal = ShutdownSignal::new();
    let mut system: HandoffSystem<String> =
        HandoffSystem::with_shutdown(fast_tuning(), app_signal.child());
    system.add_queue("main", 3).unwrap();
    system
        .add_producer("P1", labelled("Data", 5_000), "main", ms(1))
        .unwrap();
    system
        .add_consumer("C1", Destination::new(), "main", ms(5), None)
        .unwrap();

    system.start().unwrap();
    let canceller = {
        let app_signal = app_signal.clone();
        thread::spawn(move || {
            thread::sleep(ms(100));
            app_signal.cancel();
        })
    };

    let started = Instant::now();
    system.wait_for_completion(None).unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(system.state(), SystemState::Stopped);
    assert!(system.shutdown_signal().is_cancelled());
}

#[test]
fn test_completed_system_leaves_parent_untouched() {
    let app_signal = ShutdownSignal::new();
    let mut system: HandoffSystem<String> =
        HandoffSystem::with_shutdown(fast_tuning(), app_signal.child());
    system.add_queue("main", 3).unwrap();
    system
        .add_producer("P1", labelled("Data", 3), "main", ms(0))
        .unwrap();
    system
        .add_consumer("C1", Destination::new(), "main", ms(0), None)
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    assert!(system.shutdown_signal().is_shutdown_requested());
    assert!(!app_signal.is_shutdown_requested());
}

#[test]
fn test_worker_fault_is_contained() {
    let mut system = fast_system();
    system.add_queue("main", 50).unwrap();
    system.add_queue("side", 50).unwrap();
    system
        .add_producer("P1", labelled("Main", 50), "main", ms(0))
        .unwrap();
    system
        .add_producer("P2", labelled("Side", 50), "side", ms(0))
        .unwrap();

    let faulty = system
        .add_consumer("C1", poisoned_destination(), ["main", "side"], ms(0), None)
        .unwrap();
    let main_results = Destination::new();
    system
        .add_consumer("C2", main_results.clone(), "main", ms(1), None)
        .unwrap();
    let side_results = Destination::new();
    system
        .add_consumer("C3", side_results.clone(), "side", ms(1), None)
        .unwrap();

    system.start().unwrap();
    let started = Instant::now();
    system.wait_for_completion(None).unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(system.state(), SystemState::Stopped);
    assert!(matches!(faulty.state(), WorkerState::Failed(_)));

    // Exactly one item went down with the faulted consumer
    let stats = system.statistics();
    assert_eq!(stats.total_produced, 100);
    assert_eq!(main_results.len() + side_results.len(), 99);
    assert_eq!(stats.total_remaining, 0);
    assert!(stats.queues.iter().all(|q| q.unfinished == 0));
    for name in ["C2", "C3"] {
        assert_eq!(
            stats.consumer(name).unwrap().state,
            WorkerState::Finished(WorkerExit::DrainComplete)
        );
    }
}
