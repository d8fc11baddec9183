use biggie::{
    driver::{Driver, Pipeline, Reply},
    Result,
};

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One flushed pipeline and what it produced.
#[derive(Debug)]
pub struct DriverOp {
    pub pipeline: Pipeline,
    pub replies: Vec<Reply>,
}

/// Wraps a driver and records every pipeline that succeeds through it.
#[derive(Debug)]
pub struct LoggingDriver {
    inner: Box<dyn Driver>,

    /// Shared with the test so it can inspect the traffic.
    ops_log: Arc<Mutex<Vec<DriverOp>>>,
}

impl LoggingDriver {
    pub fn new(driver: Box<dyn Driver>) -> LoggingDriver {
        LoggingDriver {
            inner: driver,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ops_log_handle(&self) -> Arc<Mutex<Vec<DriverOp>>> {
        self.ops_log.clone()
    }
}

#[async_trait]
impl Driver for LoggingDriver {
    async fn exec(&self, pipeline: Pipeline) -> Result<Vec<Reply>> {
        let replies = self.inner.exec(pipeline.clone()).await?;

        self.ops_log
            .lock()
            .expect("ops log poisoned")
            .push(DriverOp {
                pipeline,
                replies: replies.clone(),
            });

        Ok(replies)
    }

    async fn reset(&self) -> Result<()> {
        self.inner.reset().await
    }
}
