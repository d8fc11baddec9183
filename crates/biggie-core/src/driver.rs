mod command;
pub use command::{Command, ScoreBound};

mod pipeline;
pub use pipeline::{Pipeline, Replies, Slot};

mod reply;
pub use reply::Reply;

use crate::async_trait;

use std::fmt::Debug;

/// A key-value store that offers hashes, sets and sorted sets and executes
/// pipelines of commands as one batch.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Execute every command of the pipeline as one batch.
    ///
    /// On success the result holds exactly one reply per command, in
    /// command order. The first failing command fails the whole call;
    /// writes the backend already applied are not rolled back.
    async fn exec(&self, pipeline: Pipeline) -> crate::Result<Vec<Reply>>;

    /// Drop every key. Used by test suites between runs.
    async fn reset(&self) -> crate::Result<()>;
}
