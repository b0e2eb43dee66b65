use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Args;

use crate::{
    catalog::StockCatalog,
    feed::ReconnectConfig,
    session::{Session, SessionStore},
    views::login::DEFAULT_LOGIN_DELAY,
};

pub const DEFAULT_FEED_URL: &str = "http://localhost:3000";

/// Used when `RUST_LOG` is unset. Names the library, not the binary.
pub const DEFAULT_LOG_FILTER: &str = "trading_dashboard=debug,tower_http=debug";

#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// File standing in for browser local storage.
    #[arg(long, env = "DASHBOARD_STORE_PATH", default_value = ".dashboard-storage.json")]
    pub store_path: PathBuf,
    /// Stock data file overriding the bundled one.
    #[arg(long, env = "DASHBOARD_DATA_PATH")]
    pub data_path: Option<PathBuf>,
}

impl StorageArgs {
    pub fn open_session(&self) -> Result<Session> {
        SessionStore::open(&self.store_path)
    }

    pub async fn load_catalog(&self) -> Result<StockCatalog> {
        match &self.data_path {
            Some(path) => StockCatalog::load(path).await,
            None => StockCatalog::bundled(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    #[arg(long, env = "DASHBOARD_FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,
    #[arg(long, default_value = "500")]
    pub reconnect_delay_ms: u64,
    #[arg(long, default_value = "3000")]
    pub reconnect_delay_max_ms: u64,
    /// Unlimited when omitted.
    #[arg(long)]
    pub reconnect_attempts: Option<u32>,
}

impl FeedArgs {
    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_delay_max_ms),
            max_retries: self.reconnect_attempts,
            ..Default::default()
        }
    }
}

/// Settings the terminal app needs once running.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub feed_url: String,
    pub reconnect: ReconnectConfig,
    pub login_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            reconnect: ReconnectConfig::default(),
            login_delay: DEFAULT_LOGIN_DELAY,
        }
    }
}

impl From<&FeedArgs> for AppConfig {
    fn from(args: &FeedArgs) -> Self {
        Self {
            feed_url: args.feed_url.clone(),
            reconnect: args.reconnect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestArgs {
        #[command(flatten)]
        feed: FeedArgs,
        #[command(flatten)]
        storage: StorageArgs,
    }

    #[test]
    fn test_defaults() {
        let args = TestArgs::parse_from(["dashboard"]);
        let config = AppConfig::from(&args.feed);
        assert_eq!(config.feed_url, "http://localhost:3000");
        assert_eq!(config.reconnect, ReconnectConfig::default());
        assert_eq!(config.login_delay, Duration::from_millis(500));
        assert!(args.storage.data_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = TestArgs::parse_from([
            "dashboard",
            "--feed-url",
            "http://127.0.0.1:4000",
            "--reconnect-delay-ms",
            "100",
            "--reconnect-attempts",
            "3",
            "--store-path",
            "/tmp/store.json",
        ]);
        let reconnect = args.feed.reconnect();
        assert_eq!(args.feed.feed_url, "http://127.0.0.1:4000");
        assert_eq!(reconnect.initial_delay, Duration::from_millis(100));
        assert_eq!(reconnect.max_delay, Duration::from_millis(3000));
        assert_eq!(reconnect.max_retries, Some(3));
        assert_eq!(args.storage.store_path, PathBuf::from("/tmp/store.json"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_log_filter_enables_library() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(
                target: "trading_dashboard::feed::client",
                "Socket connect error: refused"
            );
            tracing::debug!(target: "trading_dashboard::session", "Opened store");
            tracing::debug!(target: "hyper::proto", "ignored");
        });

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("Socket connect error: refused"));
        assert!(log.contains("Opened store"));
        assert!(!log.contains("ignored"));
    }

    #[tokio::test]
    async fn test_bundled_catalog_by_default() {
        let args = TestArgs::parse_from(["dashboard"]);
        let catalog = args.storage.load_catalog().await.unwrap();
        assert_eq!(catalog.len(), 16);
    }
}
