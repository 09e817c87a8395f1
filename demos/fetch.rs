//! Fetch a few pages through the pipeline, twice, the second round
//! served from the in-memory response cache.
//!
//! cargo run --example fetch -- [config.yml] [url...]
use reqflow::config::serde_yaml;
use reqflow::config::{Configurable, Settings};
use reqflow::prelude::*;
use reqflow::serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Context {
    config: serde_yaml::Value,
}

impl Configurable for Context {
    fn config(&self) -> &serde_yaml::Value {
        &self.config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "demos/fetch.yml".to_string());
    let mut urls: Vec<String> = args.collect();
    if urls.is_empty() {
        urls = vec![
            "https://httpbin.org/get".to_string(),
            "https://httpbin.org/headers".to_string(),
        ];
    }

    let ctx = Context {
        config: Context::load_config(&config_path)?,
    };
    let http_section = ctx
        .get_config_value("http")
        .cloned()
        .unwrap_or(serde_yaml::Value::Null);
    let settings = Settings::from_config(&http_section)?;
    tracing::info!("Loaded settings from {}: {:?}", config_path, settings);

    let cache = ResponseCache::from_settings(Arc::new(MemoryStore::new()), &settings);
    let downloader = Downloader::from_settings(settings)?.with_cache(cache);

    let mut queue: RequestQueue = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            Request::builder()
                .url(url.as_str())
                .priority(i as i64)
                .callback(HandlerRef::scoped("Demo", "parse"))
                .extra("params", json!({"round": 1}))
                .build()
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .collect();

    for round in 0..2 {
        let mut pending = Vec::new();
        while let Some(mut request) = queue.pop() {
            let response = downloader.fetch_cached(&mut request, true).await?;
            tracing::info!(
                "[round {}] {} -> {} ({} bytes)",
                round,
                request,
                response.status,
                response.body.len()
            );
            pending.push(request);
        }
        queue.extend(pending);
    }
    Ok(())
}
