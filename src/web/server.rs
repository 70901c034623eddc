//! Web server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::audio::{AudioCache, AudioProxy};
use crate::config::Config;
use crate::content::ContentExpander;
use crate::feed::{Aggregator, FeedRegistry};

use super::handlers::{AppState, SharedState};
use super::router::create_router;

/// Audio hosts commonly chain tracking redirectors before the CDN.
const MAX_REDIRECTS: usize = 10;

/// Interval between sweeps of expired audio cache entries.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("Too many redirects");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Builds the outbound HTTP client shared by feeds, pages and audio.
///
/// No overall request timeout is set: audio bodies stream for as long as the
/// listener plays. Feed and page fetches apply their own timeouts.
pub fn build_http_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .redirect(create_redirect_policy())
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

impl AppState {
    /// Wires every service from configuration around one HTTP client.
    pub fn from_config(config: &Config, client: reqwest::Client, registry: FeedRegistry) -> Self {
        let cache = Arc::new(AudioCache::new(
            config.audio_cache_ttl(),
            config.audio_cache_max_bytes,
        ));

        Self {
            aggregator: Aggregator::new(client.clone(), config.fetch_timeout()),
            expander: ContentExpander::new(
                client.clone(),
                config.fetch_timeout(),
                config.content_cache_capacity,
            ),
            proxy: AudioProxy::new(client, cache),
            registry: RwLock::new(registry),
            limits: config.aggregate_limits(),
        }
    }
}

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    state: SharedState,
    cors_origins: Vec<String>,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState, cors_origins: Vec<String>) -> Self {
        Self {
            addr,
            state: Arc::new(state),
            cors_origins,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Periodically drops expired audio entries so bodies that are never
    /// requested again do not stay resident.
    fn start_cache_sweep_task(cache: Arc<AudioCache>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let evicted = cache.evict_expired();
                if evicted > 0 {
                    tracing::info!(
                        evicted = evicted,
                        remaining = cache.len(),
                        "Evicted expired audio cache entries"
                    );
                } else {
                    tracing::debug!("No expired audio cache entries");
                }
            }
        });
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let cache = Arc::clone(self.state.proxy.cache());
        let router = create_router(self.state, &self.cors_origins);

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cache_sweep_task(cache);
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }
}
