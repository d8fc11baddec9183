mod store;
use store::{Entry, Store};

use biggie_core::{
    async_trait,
    driver::{Driver, Pipeline, Reply},
    Result,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// An in-process store speaking the command subset the engine uses.
///
/// A pipeline runs under one lock, so no other pipeline interleaves with it.
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    store: Arc<Mutex<Store>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A panic mid-pipeline leaves partially applied writes, which is
        // the same state a failed command leaves behind.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every key currently holding a value, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().keys().is_empty()
    }

    /// Members of the set at `key`, ascending. Empty when the key is absent
    /// or holds another kind of value.
    pub fn members(&self, key: &str) -> Vec<u64> {
        match self.lock().get(key) {
            Some(Entry::Set(ids)) => ids.iter().copied().collect(),
            Some(Entry::ZSet(ids)) => {
                let mut ids: Vec<_> = ids.keys().copied().collect();
                ids.sort_unstable();
                ids
            }
            _ => vec![],
        }
    }

    /// The raw fields of the hash at `key`.
    pub fn hash(&self, key: &str) -> Vec<(String, Vec<u8>)> {
        match self.lock().get(key) {
            Some(Entry::Hash(fields)) => fields
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
            _ => vec![],
        }
    }
}

#[async_trait]
impl Driver for Memory {
    async fn exec(&self, pipeline: Pipeline) -> Result<Vec<Reply>> {
        let mut store = self.lock();
        pipeline
            .into_iter()
            .map(|command| {
                trace!(%command, "apply");
                store.apply(&command)
            })
            .collect()
    }

    async fn reset(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}
