//! Turns model diffs into store pipelines and runs them.
//!
//! Building the commands is pure (`build`); the stage functions in `save`,
//! `remove` and `load` own the round trips and the order they happen in.

mod build;

mod load;
pub(crate) use load::{load, load_many};

mod remove;
pub(crate) use remove::{clear, remove};

mod resolve;

mod save;
pub(crate) use save::save;
