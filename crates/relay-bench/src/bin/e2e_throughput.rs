//! End-to-end throughput benchmark for the relay.
//!
//! Connects N observers and one publisher to a running server and counts
//! how many messages the observers receive per second.

use plotrelay_client::{Publisher, PublisherConfig};
use plotrelay_protocol::{OBSERVER_PATH, PROVIDER_PATH};
use plotrelay_transport::Connection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SERVER_ADDR: &str = "127.0.0.1:8080";
const WARMUP_SECS: u64 = 2;
const BENCH_SECS: u64 = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args: Vec<String> = std::env::args().collect();
    let num_observers: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(16);

    println!("Relay end-to-end throughput benchmark");
    println!("Make sure the server is running: cargo run --release --bin relay");
    println!();
    println!("Observers: {}", num_observers);
    println!("Warmup: {}s, Measurement: {}s", WARMUP_SECS, BENCH_SECS);

    let received = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for _ in 0..num_observers {
        let url = format!("ws://{}{}", SERVER_ADDR, OBSERVER_PATH);
        let mut observer = plotrelay_transport::connect(&url, Duration::from_secs(5)).await?;
        let received = Arc::clone(&received);
        handles.push(tokio::spawn(async move {
            while let Ok(Some(_)) = observer.recv().await {
                received.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    let config = PublisherConfig::new(format!("ws://{}{}", SERVER_ADDR, PROVIDER_PATH))
        .with_name("bench")
        .with_connect_timeout(Duration::from_secs(5));
    let mut publisher = Publisher::connect(config).await?;

    let series = serde_json::json!({ "x": vec![0.0; 32], "y": vec![1.0; 32] });
    let publish = tokio::spawn(async move {
        loop {
            if publisher.plot(&series).await.is_err() {
                break;
            }
            tokio::task::yield_now().await;
        }
    });

    tokio::time::sleep(Duration::from_secs(WARMUP_SECS)).await;

    received.store(0, Ordering::SeqCst);
    let start = Instant::now();
    tokio::time::sleep(Duration::from_secs(BENCH_SECS)).await;

    let elapsed = start.elapsed();
    let total = received.load(Ordering::SeqCst);
    let per_sec = total as f64 / elapsed.as_secs_f64();

    println!();
    println!("Duration:        {:>10.2}s", elapsed.as_secs_f64());
    println!("Deliveries:      {:>10}", total);
    println!("Throughput:      {:>10.0} deliveries/s", per_sec);
    println!(
        "Per observer:    {:>10.0} msg/s",
        per_sec / num_observers.max(1) as f64
    );

    publish.abort();
    for handle in handles {
        handle.abort();
    }

    Ok(())
}
