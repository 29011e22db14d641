//! Canonical scenarios run end to end with small delays

use crate::common::test_helpers::*;
use handoff::queue::ItemStatus;
use handoff::system::SystemState;
use handoff::worker::{Destination, WorkerExit, WorkerState};

#[test]
fn test_single_producer_single_consumer() {
    let mut system = fast_system();
    system.add_queue("main", 5).unwrap();
    system
        .add_producer("Producer-1", labelled("Data", 20), "main", ms(2))
        .unwrap();
    let destination = Destination::new();
    system
        .add_consumer("Consumer-1", destination.clone(), "main", ms(3), None)
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    assert_eq!(system.state(), SystemState::Stopped);
    assert_eq!(destination.len(), 20);
    assert!(system.queue("main").unwrap().is_empty());
    destination.with_items(|items| {
        // Single producer, single consumer: FIFO end to end
        let payloads: Vec<&str> = items.iter().map(|i| i.payload().as_str()).collect();
        assert_eq!(payloads, labelled("Data", 20));
        assert!(items.iter().all(|i| i.status() == ItemStatus::Consumed));
    });
}

#[test]
fn test_two_producers_one_queue() {
    let mut system = fast_system();
    system.add_queue("main", 5).unwrap();
    system
        .add_producer("P1", labelled("P1-Data", 10), "main", ms(2))
        .unwrap();
    system
        .add_producer("P2", labelled("P2-Data", 10), "main", ms(3))
        .unwrap();
    let destination = Destination::new();
    system
        .add_consumer("C1", destination.clone(), "main", ms(1), None)
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    assert_eq!(destination.len(), 20);
    destination.with_items(|items| {
        // Per-producer order survives interleaving
        for prefix in ["P1-Data-", "P2-Data-"] {
            let ids: Vec<u64> = items
                .iter()
                .filter(|i| i.payload().starts_with(prefix))
                .map(|i| i.id())
                .collect();
            assert_eq!(ids, (0..10).collect::<Vec<_>>());
        }
    });
}

#[test]
fn test_backpressure_with_slow_consumer() {
    let mut system = fast_system();
    system.add_queue("main", 3).unwrap();
    system
        .add_producer("FastProducer", labelled("FastData", 15), "main", ms(1))
        .unwrap();
    let destination = Destination::new();
    system
        .add_consumer("SlowConsumer", destination.clone(), "main", ms(15), None)
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    let stats = system.statistics();
    assert_eq!(destination.len(), 15);
    let queue = stats.queue("main").unwrap();
    assert_eq!(queue.high_water_mark, 3);
    assert!(queue.high_water_mark <= queue.capacity);
    assert_eq!(
        stats.producer("FastProducer").unwrap().state,
        WorkerState::Finished(WorkerExit::SourceExhausted)
    );
}

#[test]
fn test_one_consumer_three_queues() {
    let mut system = fast_system();
    for (queue, producer, prefix) in [
        ("sensor1", "Producer-S1", "Sensor1"),
        ("sensor2", "Producer-S2", "Sensor2"),
        ("sensor3", "Producer-S3", "Sensor3"),
    ] {
        system.add_queue(queue, 5).unwrap();
        system
            .add_producer(producer, labelled(prefix, 5), queue, ms(2))
            .unwrap();
    }
    let destination = Destination::new();
    system
        .add_consumer(
            "Aggregator",
            destination.clone(),
            ["sensor1", "sensor2", "sensor3"],
            ms(2),
            None,
        )
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    assert_eq!(destination.len(), 15);
    let stats = system.statistics();
    let aggregator = stats.consumer("Aggregator").unwrap();
    let attempts: Vec<u64> = aggregator.queues.iter().map(|a| a.attempts).collect();
    let spread = attempts.iter().max().unwrap() - attempts.iter().min().unwrap();
    assert!(spread <= 1, "uneven visits: {:?}", attempts);
    for activity in &aggregator.queues {
        assert_eq!(activity.hits, 5, "queue {}", activity.queue);
    }
}

#[test]
fn test_max_items_leaves_remainder() {
    let mut system = fast_system();
    system.add_queue("main", 10).unwrap();
    system
        .add_producer("P1", labelled("Data", 10), "main", ms(0))
        .unwrap();
    let destination = Destination::new();
    system
        .add_consumer("C1", destination.clone(), "main", ms(5), Some(5))
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    let stats = system.statistics();
    assert_eq!(destination.len(), 5);
    assert_eq!(stats.total_consumed, 5);
    assert_eq!(stats.total_remaining, 5);
    assert_eq!(
        stats.consumer("C1").unwrap().state,
        WorkerState::Finished(WorkerExit::MaxItemsReached)
    );
}
