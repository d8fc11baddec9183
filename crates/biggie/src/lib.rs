mod collection;
pub use collection::Collection;

pub mod db;
pub use db::Db;

mod engine;

pub mod finder;
pub use finder::{Finder, Query, Range};

mod model;
pub use model::{Associated, ChangeSet, Model};

pub mod publish;
pub use publish::{Envelope, EnvelopeKind, Publisher};

mod validate;
pub use validate::{ErrorCode, ValidationError};

pub use biggie_core::{
    driver,
    schema::{self, ModelDef, Property, Validator},
    Attributes, Error, Result, Schema, Value,
};

/// The result of saving one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The model was written.
    Saved,

    /// Nothing had changed; no I/O was done for it.
    Unchanged,

    /// Validation failed; see [`Model::errors`].
    Rejected,
}

/// The result of saving a batch, as positions into the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub saved: Vec<usize>,
    pub unchanged: Vec<usize>,
    pub rejected: Vec<usize>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.rejected.is_empty()
    }

    /// The outcome of the model at `index`.
    pub fn of(&self, index: usize) -> SaveOutcome {
        if self.rejected.contains(&index) {
            SaveOutcome::Rejected
        } else if self.saved.contains(&index) {
            SaveOutcome::Saved
        } else {
            SaveOutcome::Unchanged
        }
    }

    pub(crate) fn single(&self) -> SaveOutcome {
        self.of(0)
    }
}
