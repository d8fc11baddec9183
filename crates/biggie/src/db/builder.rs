use super::{Db, Shared};
use crate::Publisher;

use biggie_core::{
    schema::{self, ModelDef, Validator},
    Driver, Result, Value,
};

use std::sync::Arc;

/// How many records a relation-free type may hold for `Db::clear` to remove
/// them one by one instead of dropping the type's keys wholesale.
const DEFAULT_CLEAR_BATCH_LIMIT: usize = 1000;

pub struct Builder {
    /// Schema builder
    core: schema::Builder,

    publisher: Option<Arc<dyn Publisher>>,

    clear_batch_limit: usize,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            core: schema::Builder::new(),
            publisher: None,
            clear_batch_limit: DEFAULT_CLEAR_BATCH_LIMIT,
        }
    }
}

impl Builder {
    pub fn register(&mut self, model: ModelDef) -> &mut Self {
        self.core.register(model);
        self
    }

    pub fn validator(&mut self, name: impl Into<String>, validator: Validator) -> &mut Self {
        self.core.validator(name, validator);
        self
    }

    pub fn property_type(
        &mut self,
        name: impl Into<String>,
        caster: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.core.property_type(name, caster);
        self
    }

    /// Forward change notifications to `publisher` after every save.
    pub fn publisher(&mut self, publisher: Arc<dyn Publisher>) -> &mut Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn clear_batch_limit(&mut self, limit: usize) -> &mut Self {
        self.clear_batch_limit = limit;
        self
    }

    pub async fn connect(&mut self, url: &str) -> Result<Db> {
        let driver = super::connect(url).await?;
        self.build_with(driver)
    }

    pub async fn build(&mut self, driver: impl Driver) -> Result<Db> {
        self.build_with(Arc::new(driver))
    }

    fn build_with(&mut self, driver: Arc<dyn Driver>) -> Result<Db> {
        let schema = self.core.build()?;

        tracing::debug!(
            models = schema.models().count(),
            driver = ?driver,
            "schema registered"
        );

        Ok(Db {
            shared: Arc::new(Shared {
                schema: Arc::new(schema),
                driver,
                publisher: self.publisher.clone(),
                clear_batch_limit: self.clear_batch_limit,
            }),
        })
    }
}
