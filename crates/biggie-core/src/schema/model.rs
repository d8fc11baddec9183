use super::{AssocKind, Property, PropertyDef, Relation};
use crate::Attributes;

use indexmap::{IndexMap, IndexSet};
use std::{fmt, sync::Arc};

/// Classifies a record's attributes into zero or more named views.
pub type ViewFn = Arc<dyn Fn(&Attributes) -> Vec<String> + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// A model type declaration, handed to `Db::builder().register()`.
#[derive(Clone)]
pub struct ModelDef {
    pub(super) name: String,
    pub(super) plural: Option<String>,
    pub(super) properties: IndexMap<String, Property>,
    pub(super) indexes: Vec<String>,
    pub(super) views: Vec<String>,
    pub(super) view_fn: Option<ViewFn>,
    pub(super) has_many: Vec<String>,
    pub(super) has_one: Vec<String>,
    pub(super) belongs_to: Vec<String>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> ModelDef {
        ModelDef {
            name: name.into().to_lowercase(),
            plural: None,
            properties: IndexMap::new(),
            indexes: vec![],
            views: vec![],
            view_fn: None,
            has_many: vec![],
            has_one: vec![],
            belongs_to: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Override the plural used to resolve `has_many` declarations.
    pub fn plural(mut self, plural: impl Into<String>) -> ModelDef {
        self.plural = Some(plural.into().to_lowercase());
        self
    }

    pub fn property(mut self, name: impl Into<String>, property: Property) -> ModelDef {
        self.properties.insert(name.into(), property);
        self
    }

    /// Maintain a store index for the property so finders can use it.
    pub fn index(mut self, name: impl Into<String>) -> ModelDef {
        self.indexes.push(name.into());
        self
    }

    /// Declare the type's views and the callback that sorts a record into
    /// them. Names the callback returns that are not declared are ignored.
    pub fn views<I, S, F>(mut self, names: I, f: F) -> ModelDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Attributes) -> Vec<String> + Send + Sync + 'static,
    {
        self.views = names.into_iter().map(Into::into).collect();
        self.view_fn = Some(Arc::new(f));
        self
    }

    /// Children of the type named by its plural.
    pub fn has_many(mut self, plural: impl Into<String>) -> ModelDef {
        self.has_many.push(plural.into().to_lowercase());
        self
    }

    pub fn has_one(mut self, name: impl Into<String>) -> ModelDef {
        self.has_one.push(name.into().to_lowercase());
        self
    }

    pub fn belongs_to(mut self, name: impl Into<String>) -> ModelDef {
        self.belongs_to.push(name.into().to_lowercase());
        self
    }
}

impl fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("plural", &self.plural)
            .field("properties", &self.properties)
            .field("indexes", &self.indexes)
            .field("views", &self.views)
            .field("has_many", &self.has_many)
            .field("has_one", &self.has_one)
            .field("belongs_to", &self.belongs_to)
            .finish()
    }
}

/// A registered model type.
pub struct ModelType {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Type name, used as the first segment of every key of the type.
    pub name: String,

    pub plural: String,

    /// Declared properties plus the foreign keys added by associations.
    pub properties: IndexMap<String, PropertyDef>,

    pub indexes: IndexSet<String>,

    pub views: Vec<String>,

    pub(super) view_fn: Option<ViewFn>,

    pub relations: Vec<Relation>,
}

impl ModelType {
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn is_indexed(&self, name: &str) -> bool {
        self.indexes.contains(name)
    }

    /// Indexed properties with their definitions, in declaration order.
    pub fn indexed_properties(&self) -> impl Iterator<Item = &PropertyDef> + '_ {
        self.indexes.iter().filter_map(|name| self.properties.get(name))
    }

    pub fn has_views(&self) -> bool {
        self.view_fn.is_some() && !self.views.is_empty()
    }

    /// The declared views `attributes` belong to.
    pub fn classify(&self, attributes: &Attributes) -> Vec<String> {
        let Some(view_fn) = &self.view_fn else {
            return vec![];
        };
        view_fn(attributes)
            .into_iter()
            .filter(|view| self.views.contains(view))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Look up a relation by its declared name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|rel| rel.name == name)
    }

    pub fn has_relations(&self) -> bool {
        !self.relations.is_empty()
    }

    pub fn relations_of_kind(&self, kind: AssocKind) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.iter().filter(move |rel| rel.kind == kind)
    }

    /// One many-to-many relation per partner type.
    ///
    /// Mutual `belongs_to` declarations (and any `has_many` between the same
    /// pair of types) all describe one link set; this yields it once.
    pub fn many_to_many(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.iter().enumerate().filter_map(|(i, rel)| {
            let first = self
                .relations
                .iter()
                .position(|other| other.is_many_to_many() && other.target == rel.target);
            (rel.is_many_to_many() && first == Some(i)).then_some(rel)
        })
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("plural", &self.plural)
            .field("properties", &self.properties)
            .field("indexes", &self.indexes)
            .field("views", &self.views)
            .field("relations", &self.relations)
            .finish()
    }
}
