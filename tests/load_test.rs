//! Load testing for the balancer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_load_distribution() {
    // 1. Setup Mock Backends
    let backends = vec![
        common::start_mock_backend("I came from A").await,
        common::start_mock_backend("I came from B").await,
        common::start_mock_backend("I came from C").await,
    ];

    // 2. Start Balancer
    let (proxy_addr, cluster, handle) = common::start_balancer(common::config_for(&backends)).await;

    // 3. Run Load Test
    let concurrency = 20;
    let requests_per_task = 30;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}", proxy_addr);
        tasks.push(tokio::spawn(async move {
            let mut seen: HashMap<String, usize> = HashMap::new();
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                        if let Ok(body) = res.text().await {
                            *seen.entry(body).or_default() += 1;
                        }
                    }
                }
            }
            (seen, latencies)
        }));
    }

    let mut totals: HashMap<String, usize> = HashMap::new();
    let mut all_latencies: Vec<Duration> = Vec::new();
    for task in tasks {
        let (seen, latencies) = task.await.unwrap();
        for (body, n) in seen {
            *totals.entry(body).or_default() += n;
        }
        all_latencies.extend(latencies);
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "Every request should succeed");
    assert_eq!(totals.len(), 3, "Every backend should receive traffic");
    assert!(cluster.backends().iter().all(|b| b.is_alive()));

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("Distribution:   {:?}", totals);
    println!("-------------------------\n");

    handle.abort();
}
