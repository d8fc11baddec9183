mod builder;
pub use builder::Builder;

mod connect;
pub use connect::connect;

use crate::{
    engine,
    finder::{Finder, Query},
    publish::{Envelope, Publisher},
    Associated, Collection, Model,
};

use biggie_core::{
    driver::{Command, Pipeline, Replies},
    key::{self, Scope},
    schema::{AssocKind, ModelType},
    Driver, Error, Result, Schema,
};

use std::sync::Arc;
use tracing::debug;

/// Shared state between all `Db` clones.
pub(crate) struct Shared {
    pub(crate) schema: Arc<Schema>,
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) publisher: Option<Arc<dyn Publisher>>,
    pub(crate) clear_batch_limit: usize,
}

/// A handle to a store and the schema registered against it. Cheap to
/// clone.
#[derive(Clone)]
pub struct Db {
    pub(crate) shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.shared.schema
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.shared.driver
    }

    pub(crate) fn clear_batch_limit(&self) -> usize {
        self.shared.clear_batch_limit
    }

    pub(crate) fn model_type(&self, name: &str) -> Result<Arc<ModelType>> {
        self.schema().resolve(name).cloned()
    }

    /// A fresh, unsaved model of type `ty`.
    pub fn new_model(&self, ty: &str) -> Result<Model> {
        Ok(Model::new(self.model_type(ty)?))
    }

    /// Flush one pipeline. An empty pipeline does no I/O.
    pub(crate) async fn exec(&self, stage: &'static str, pipeline: Pipeline) -> Result<Replies> {
        let len = pipeline.len();
        if len == 0 {
            return Replies::new(0, vec![]);
        }

        debug!(stage, commands = len, writes = pipeline.has_writes(), "flush pipeline");
        let replies = self.shared.driver.exec(pipeline).await?;
        Replies::new(len, replies)
    }

    pub(crate) fn publish(&self, envelope: Envelope) {
        if let Some(publisher) = &self.shared.publisher {
            publisher.publish(&envelope.channel, &envelope);
        }
    }

    /// Load one record by id.
    pub async fn get(&self, ty: &str, id: u64) -> Result<Model> {
        let ty = self.model_type(ty)?;
        let mut models = engine::load(self, &ty, &[id]).await?;
        models
            .pop()
            .ok_or_else(|| Error::record_not_found(key::record(&ty.name, id)))
    }

    /// Every record of the type, by ascending id.
    pub async fn all(&self, ty: &str) -> Result<Collection> {
        self.find(ty, Query::new())?.all().await
    }

    pub async fn count(&self, ty: &str) -> Result<u64> {
        let ty = self.model_type(ty)?;
        let mut pipeline = Pipeline::new();
        let slot = pipeline.push(Command::SCard {
            key: key::collection(&ty.name),
        });
        let mut replies = self.exec("count", pipeline).await?;
        replies.take(slot).into_id()
    }

    /// Remove every record of the type together with its indexes, views and
    /// id counter.
    pub async fn clear(&self, ty: &str) -> Result<()> {
        let ty = self.model_type(ty)?;
        engine::clear(self, &ty).await
    }

    /// Plan a query against the type. Fails with `invalid_query` before any
    /// I/O when the query can't be compiled.
    pub fn find(&self, ty: &str, query: Query) -> Result<Finder> {
        let ty = self.model_type(ty)?;
        let base = key::collection(&ty.name);
        Finder::new(self.clone(), ty.clone(), Scope::Type(&ty.name), base, query)
    }

    /// Plan a query against the children of `parent` linked through the
    /// `has_many` or many-to-many association `name`.
    pub fn find_associated(&self, parent: &Model, name: &str, query: Query) -> Result<Finder> {
        let (target, pid) = self.scoped(parent, name)?;
        let base = key::assoc(&parent.ty.name, pid, &target.name);
        let scope = Scope::parent(&parent.ty.name, pid, &target.name);
        Finder::new(self.clone(), target.clone(), scope, base, query)
    }

    /// The records currently in the view, by ascending id.
    pub async fn view(&self, ty: &str, view: &str) -> Result<Collection> {
        let ty = self.model_type(ty)?;
        let key = key::view(Scope::Type(&ty.name), check_view(&ty, view)?);
        self.load_set(&ty, key).await
    }

    /// The children of `parent` through association `name` that are in the
    /// view.
    pub async fn view_associated(
        &self,
        parent: &Model,
        name: &str,
        view: &str,
    ) -> Result<Collection> {
        let (target, pid) = self.scoped(parent, name)?;
        let scope = Scope::parent(&parent.ty.name, pid, &target.name);
        let key = key::view(scope, check_view(&target, view)?);
        self.load_set(&target, key).await
    }

    /// Read the other side of association `name` from the store.
    pub async fn get_association(&self, model: &Model, name: &str) -> Result<Associated> {
        let relation = model.ty.relation(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "model `{}` has no association `{name}`",
                model.ty.name
            ))
        })?;
        let target = self.schema().target(relation).clone();

        match relation.kind {
            AssocKind::HasMany | AssocKind::ManyToMany => {
                if model.id.is_none() {
                    return Ok(Associated::Many(Collection::new()));
                }
                let finder = self.find_associated(model, name, Query::new())?;
                Ok(Associated::Many(finder.all().await?))
            }
            AssocKind::HasOne | AssocKind::BelongsTo => {
                let pointer = model
                    .get(&key::foreign_key(&target.name))
                    .and_then(|value| value.as_u64());
                let Some(id) = pointer else {
                    return Ok(Associated::One(None));
                };
                let mut models = engine::load(self, &target, &[id]).await?;
                Ok(Associated::One(models.pop()))
            }
        }
    }

    /// The target type and the parent id behind a scoped read.
    fn scoped(&self, parent: &Model, name: &str) -> Result<(Arc<ModelType>, u64)> {
        let relation = parent.ty.relation(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "model `{}` has no association `{name}`",
                parent.ty.name
            ))
        })?;

        if !matches!(relation.kind, AssocKind::HasMany | AssocKind::ManyToMany) {
            return Err(Error::invalid_argument(format!(
                "`{}.{name}` is not a collection association",
                parent.ty.name
            )));
        }

        let pid = parent.id.ok_or_else(|| {
            Error::invalid_argument(format!(
                "cannot query `{}.{name}` of an unsaved model",
                parent.ty.name
            ))
        })?;

        Ok((self.schema().target(relation).clone(), pid))
    }

    async fn load_set(&self, ty: &Arc<ModelType>, key: String) -> Result<Collection> {
        let mut pipeline = Pipeline::new();
        let slot = pipeline.push(Command::SMembers { key });
        let mut replies = self.exec("view", pipeline).await?;

        let mut ids = replies.take(slot).into_ids()?;
        ids.sort_unstable();

        Ok(engine::load(self, ty, &ids).await?.into_iter().collect())
    }
}

fn check_view<'a>(ty: &ModelType, view: &'a str) -> Result<&'a str> {
    if ty.views.iter().any(|declared| declared == view) {
        Ok(view)
    } else {
        Err(Error::invalid_argument(format!(
            "model `{}` has no view `{view}`",
            ty.name
        )))
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("schema", &self.shared.schema)
            .field("driver", &self.shared.driver)
            .finish()
    }
}
