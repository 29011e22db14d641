//! Accounting properties that must hold for any run

use crate::common::test_helpers::*;
use handoff::worker::Destination;

#[test]
fn test_no_loss_no_duplication_across_consumers() {
    let mut system = fast_system();
    system.add_queue("q1", 4).unwrap();
    system.add_queue("q2", 2).unwrap();
    for (name, queue, count) in [("A", "q1", 30), ("B", "q1", 25), ("C", "q2", 40)] {
        system
            .add_producer(name, labelled(name, count), queue, ms(0))
            .unwrap();
    }
    let destination = Destination::new();
    system
        .add_consumer("C1", destination.clone(), ["q1", "q2"], ms(0), None)
        .unwrap();
    system
        .add_consumer("C2", destination.clone(), "q2", ms(1), None)
        .unwrap();
    system
        .add_consumer("C3", destination.clone(), "q1", ms(1), None)
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    let stats = system.statistics();
    assert_eq!(stats.total_produced, 95);
    assert_eq!(stats.total_consumed, 95);
    for queue in &stats.queues {
        assert_eq!(queue.total_enqueued, queue.total_dequeued, "{}", queue.name);
        assert_eq!(queue.unfinished, 0);
    }

    let mut payloads: Vec<String> = destination.take_all().into_iter().map(|i| i.into_payload()).collect();
    payloads.sort();
    payloads.dedup();
    assert_eq!(payloads.len(), 95);
}

#[test]
fn test_produced_never_exceeds_source() {
    let mut system = fast_system();
    system.add_queue("main", 2).unwrap();
    system
        .add_producer("P1", labelled("Data", 12), "main", ms(0))
        .unwrap();
    system
        .add_consumer("C1", Destination::new(), "main", ms(0), Some(3))
        .unwrap();

    system.start().unwrap();
    system.wait_for_completion(COMPLETION_TIMEOUT).unwrap();

    let stats = system.statistics();
    for producer in &stats.producers {
        assert!(producer.produced as usize <= producer.source_len);
    }
    // Consumer stopped at 3, queue holds 2, producer gave up on the sixth
    let producer = stats.producer("P1").unwrap();
    assert!(producer.is_short());
    assert_eq!(stats.total_consumed, 3);
    assert_eq!(stats.total_produced, 3 + stats.total_remaining as u64);
}
