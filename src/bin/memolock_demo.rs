//! Demo binary: fetches a small set of URLs through a [`Coordinator`] so that
//! concurrent requests for the same URL single-flight onto one HTTP fetch.
//!
//! Mirrors the Go original's `Manager`, which fired many concurrent
//! goroutines at a fixed URL pool through a `RedisMemoLock`. The gRPC
//! admin/fan-out service that also lived there is out of scope here.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use memolock::store::RedisStore;
use memolock::{Coordinator, CoordinatorConfig};

#[derive(Parser)]
#[command(name = "memolock-demo", version, about = "Single-flight URL fetcher")]
struct Cli {
    /// Path to a YAML config file (see `CoordinatorConfig`).
    #[arg(long = "config", default_value = "config.yml")]
    config: std::path::PathBuf,

    /// URLs to fetch. Each is requested `requests_per_url` times
    /// concurrently; only the first request per URL should reach the
    /// network.
    #[arg(required = true)]
    urls: Vec<String>,

    /// Concurrent requests issued per URL.
    #[arg(long = "requests-per-url", default_value_t = 8)]
    requests_per_url: usize,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CoordinatorConfig::from_yaml_file(&cli.config)?;
    let store = Arc::new(RedisStore::connect(&config.redis_url).await?);
    let coordinator = Arc::new(Coordinator::new(store, config.tag.clone()).await?);

    let http = reqwest::Client::new();
    let lock_ttl = config.lock_ttl();
    let value_ttl = config.value_ttl();

    let mut tasks = Vec::new();
    for url in &cli.urls {
        for attempt in 0..cli.requests_per_url {
            let coordinator = coordinator.clone();
            let http = http.clone();
            let url = url.clone();
            tasks.push(tokio::spawn(async move {
                let result = coordinator
                    .get_resource(&url, lock_ttl, || async {
                        let response = http.get(&url).send().await?;
                        let body = response.text().await?;
                        Ok::<_, reqwest::Error>((body, value_ttl))
                    })
                    .await;
                (url, attempt, result)
            }));
        }
    }

    for task in tasks {
        let (url, attempt, result) = task.await?;
        match result {
            Ok(body) => println!("url={url} attempt={attempt} bytes={}", body.len()),
            Err(err) => println!("url={url} attempt={attempt} error={err}"),
        }
    }

    coordinator.close();
    // Give the dispatcher a moment to drain before the process exits.
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}
