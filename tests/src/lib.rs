pub use exec_log::ExecLog;

mod logging_driver;
pub use logging_driver::{DriverOp, LoggingDriver};

pub mod models;

use biggie::{db::Builder, Db, ModelDef};
use biggie_driver_memory::Memory;

pub use std_util::*;

/// A database over a fresh in-memory store, with every pipeline logged.
pub struct Test {
    pub db: Db,

    /// The store behind `db`, for asserting on raw keys.
    pub store: Memory,

    pub log: ExecLog,
}

impl Test {
    /// Build a database for `models` with default settings.
    pub async fn new(models: impl IntoIterator<Item = ModelDef>) -> Test {
        let mut builder = Db::builder();
        for model in models {
            builder.register(model);
        }
        Test::with_builder(builder).await
    }

    /// Build a database from a configured builder.
    pub async fn with_builder(mut builder: Builder) -> Test {
        init_logging();

        let store = Memory::new();
        let driver = LoggingDriver::new(Box::new(store.clone()));
        let log = ExecLog::new(driver.ops_log_handle());
        let db = builder.build(driver).await.unwrap();

        Test { db, store, log }
    }

    /// Decoded fields of the raw hash at `key`.
    pub fn hash(&self, key: &str) -> Vec<(String, String)> {
        self.store
            .hash(key)
            .into_iter()
            .map(|(field, value)| (field, String::from_utf8_lossy(&value).into_owned()))
            .collect()
    }

    /// One decoded field of the raw hash at `key`.
    pub fn field(&self, key: &str, field: &str) -> Option<String> {
        self.hash(key)
            .into_iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Keys whose name starts with `prefix`.
    pub fn keys_like(&self, prefix: &str) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect()
    }
}

/// Route `tracing` output to the test harness. `RUST_LOG` picks the level.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    // Only the first call per process installs the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
