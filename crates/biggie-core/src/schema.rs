mod builder;
pub use builder::Builder;

mod model;
pub use model::{ModelDef, ModelId, ModelType, ViewFn};

mod property;
pub use property::{Property, PropertyDef};

mod relation;
pub use relation::{AssocKind, Relation, RelationId};

mod ty;
pub use ty::{Caster, Type};

mod validator;
pub use validator::{Check, Validator};

use crate::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Every registered model type.
///
/// Built once by [`Builder::build`] and shared by `Arc` afterwards; nothing
/// mutates it after registration.
#[derive(Debug)]
pub struct Schema {
    models: Vec<Arc<ModelType>>,
    by_name: IndexMap<String, ModelId>,
    by_plural: IndexMap<String, ModelId>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Get a model by ID
    pub fn model(&self, id: ModelId) -> &Arc<ModelType> {
        &self.models[id.0]
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelType>> {
        self.models.iter()
    }

    /// Find a model by its type name or its plural.
    pub fn get(&self, name: &str) -> Option<&Arc<ModelType>> {
        let name = name.to_lowercase();
        self.by_name
            .get(&name)
            .or_else(|| self.by_plural.get(&name))
            .map(|id| self.model(*id))
    }

    pub fn get_by_plural(&self, plural: &str) -> Option<&Arc<ModelType>> {
        self.by_plural.get(plural).map(|id| self.model(*id))
    }

    /// Like [`Schema::get`], failing with `invalid_argument` for unknown names.
    pub fn resolve(&self, name: &str) -> Result<&Arc<ModelType>> {
        self.get(name)
            .ok_or_else(|| Error::invalid_argument(format!("unknown model type `{name}`")))
    }

    /// The relation on the other side of `relation`.
    pub fn pair(&self, relation: &Relation) -> &Relation {
        &self.model(relation.pair.model).relations[relation.pair.index]
    }

    /// The target model of `relation`.
    pub fn target(&self, relation: &Relation) -> &Arc<ModelType> {
        self.model(relation.target)
    }
}
