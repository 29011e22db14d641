//! Table rendering for [`SystemStatistics`]

use crate::system::stats::SystemStatistics;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};

/// Render the full statistics report as text.
///
/// Headings are coloured through `colored`, so they follow the global colour
/// override set at startup.
pub fn render_statistics(stats: &SystemStatistics) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "--- Stats ---".bold()));
    out.push_str(&format!("State:    {}\n", stats.state));
    out.push_str(&format!("Duration: {:.2}s\n", stats.duration_secs));
    out.push_str(&format!(
        "Produced: {}, Consumed: {}, Remaining: {}\n",
        stats.total_produced, stats.total_consumed, stats.total_remaining
    ));

    if !stats.queues.is_empty() {
        out.push_str(&format!("\n{}\n", "Queues".cyan().bold()));
        out.push_str(&queue_table(stats).to_string());
    }
    if !stats.producers.is_empty() {
        out.push_str(&format!("\n{}\n", "Producers".cyan().bold()));
        out.push_str(&producer_table(stats).to_string());
    }
    if !stats.consumers.is_empty() {
        out.push_str(&format!("\n{}\n", "Consumers".cyan().bold()));
        out.push_str(&consumer_table(stats).to_string());
    }
    out
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(titles.iter().map(|t| Cell::new(t)).collect()));
    table
}

fn queue_table(stats: &SystemStatistics) -> Table {
    let mut table = new_table(&[
        "Queue",
        "Capacity",
        "Depth",
        "High water",
        "Enqueued",
        "Dequeued",
    ]);
    for queue in &stats.queues {
        table.add_row(Row::new(vec![
            Cell::new(&queue.name),
            Cell::new(&queue.capacity.to_string()),
            Cell::new(&queue.depth.to_string()),
            Cell::new(&queue.high_water_mark.to_string()),
            Cell::new(&queue.total_enqueued.to_string()),
            Cell::new(&queue.total_dequeued.to_string()),
        ]));
    }
    table
}

fn producer_table(stats: &SystemStatistics) -> Table {
    let mut table = new_table(&["Producer", "Queue", "Produced", "Attempts", "State"]);
    for producer in &stats.producers {
        table.add_row(Row::new(vec![
            Cell::new(&producer.name),
            Cell::new(&producer.queue),
            Cell::new(&format!("{}/{}", producer.produced, producer.source_len)),
            Cell::new(&producer.attempts.to_string()),
            Cell::new(&producer.state.to_string()),
        ]));
    }
    table
}

fn consumer_table(stats: &SystemStatistics) -> Table {
    let mut table = new_table(&["Consumer", "Consumed", "Destination", "Polls (hits)", "State"]);
    for consumer in &stats.consumers {
        let consumed = match consumer.max_items {
            Some(max) => format!("{} (max {})", consumer.consumed, max),
            None => consumer.consumed.to_string(),
        };
        let polls = consumer
            .queues
            .iter()
            .map(|a| format!("{}: {} ({})", a.queue, a.attempts, a.hits))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(Row::new(vec![
            Cell::new(&consumer.name),
            Cell::new(&consumed),
            Cell::new(&consumer.destination_len.to_string()),
            Cell::new(&polls),
            Cell::new(&consumer.state.to_string()),
        ]));
    }
    table
}
