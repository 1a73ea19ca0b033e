use anyhow::{Context, ensure};
use clap::Parser;
use mini_pubsub::{Broker, Config, Consumer, Producer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Runs concurrent producers and consumers against an in-process broker and
/// checks that every published message is delivered exactly once per consumer.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Topic to publish to
    #[arg(short, long, default_value = "orders")]
    topic: String,

    /// Number of concurrent producers
    #[arg(short, long, default_value_t = 4)]
    producers: usize,

    /// Messages published by each producer
    #[arg(short, long, default_value_t = 1000)]
    messages: usize,

    /// Number of consumers draining the topic
    #[arg(short = 'n', long, default_value_t = 2)]
    consumers: usize,
}

fn message_total(producers: usize, messages: usize) -> anyhow::Result<u64> {
    producers
        .checked_mul(messages)
        .and_then(|total| u64::try_from(total).ok())
        .context("--producers times --messages overflows the message count")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {:?}", args.config))?;
    mini_pubsub::logging::init(&config.logging);

    let broker = Broker::new(config.broker.clone());
    broker.create_topic(&args.topic);

    let consumers: Vec<Consumer> = (0..args.consumers)
        .map(|i| Consumer::new(format!("consumer-{}", i), broker.clone()))
        .collect();
    for consumer in &consumers {
        consumer.subscribe(&args.topic)?;
    }

    let total = message_total(args.producers, args.messages)?;

    info!(
        "Publishing {} messages from {} producers to topic '{}'",
        total,
        args.producers,
        args.topic
    );

    let started = Instant::now();
    let offsets = std::thread::scope(|scope| -> anyhow::Result<Vec<u64>> {
        let handles: Vec<_> = (0..args.producers)
            .map(|p| {
                let producer = Producer::new(format!("producer-{}", p), broker.clone());
                let topic = args.topic.as_str();
                let count = args.messages;
                scope.spawn(move || {
                    (0..count)
                        .map(|i| producer.publish(topic, format!("{}-{}", producer.client_id(), i)))
                        .collect::<Result<Vec<u64>, _>>()
                })
            })
            .collect();

        let mut offsets = Vec::new();
        for handle in handles {
            let produced = handle
                .join()
                .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
            offsets.extend(produced);
        }
        Ok(offsets)
    })?;
    let publish_elapsed = started.elapsed();

    let unique: HashSet<u64> = offsets.iter().copied().collect();
    ensure!(
        unique.len() as u64 == total && unique.iter().all(|&o| o < total),
        "offsets are not a gap-free sequence 0..{}",
        total
    );

    for consumer in &consumers {
        let mut received = 0u64;
        loop {
            let batch = consumer.poll_batch(&args.topic, 256)?;
            if batch.is_empty() {
                break;
            }
            for message in &batch {
                ensure!(
                    message.offset == received,
                    "consumer '{}' saw offset {} out of order",
                    consumer.client_id(),
                    message.offset
                );
                received += 1;
            }
        }
        ensure!(
            received == total,
            "consumer '{}' received {} of {} messages",
            consumer.client_id(),
            received,
            total
        );
        info!(
            "Consumer '{}' drained {} messages",
            consumer.client_id(),
            received
        );
    }

    let stats = broker.topic_stats(&args.topic)?;
    info!(
        "Topic '{}': {} messages, {} payload bytes, published in {:?}",
        stats.name, stats.message_count, stats.payload_bytes, publish_elapsed
    );

    Ok(())
}
