mod change_set;
pub use change_set::ChangeSet;
pub(crate) use change_set::Link;

use crate::{engine, validate::ValidationError, Collection, Db, SaveOutcome};
use biggie_core::{
    key,
    schema::{AssocKind, ModelType, Relation},
    Attributes, Error, Result, Value,
};

use indexmap::IndexMap;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::sync::Arc;

/// One record of a model type.
///
/// Setters only touch the in-memory state; nothing reaches the store until
/// [`Model::save`] or [`Model::remove`].
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) ty: Arc<ModelType>,
    pub(crate) id: Option<u64>,
    pub(crate) attributes: Attributes,

    /// Snapshot of the attributes as last persisted.
    pub(crate) previous: Attributes,

    pub(crate) changes: ChangeSet,

    /// View membership as last persisted.
    pub(crate) views: Vec<String>,

    pub(crate) is_new: bool,
    pub(crate) is_removed: bool,
    pub(crate) errors: IndexMap<String, ValidationError>,

    /// Children persisted through this instance, by relation name.
    pub(crate) associated: IndexMap<String, Associated>,
}

/// The other side of an association.
#[derive(Debug, Clone)]
pub enum Associated {
    /// `has_one` and `belongs_to`.
    One(Option<Model>),

    /// `has_many` and many-to-many.
    Many(Collection),
}

impl Associated {
    pub fn as_one(&self) -> Option<&Model> {
        match self {
            Associated::One(model) => model.as_ref(),
            Associated::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&Collection> {
        match self {
            Associated::Many(collection) => Some(collection),
            Associated::One(_) => None,
        }
    }

    pub fn into_one(self) -> Option<Model> {
        match self {
            Associated::One(model) => model,
            Associated::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Collection {
        match self {
            Associated::Many(collection) => collection,
            Associated::One(model) => model.into_iter().collect(),
        }
    }
}

fn non_null<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a Value> {
    attributes.get(name).filter(|value| !value.is_null())
}

impl Model {
    pub(crate) fn new(ty: Arc<ModelType>) -> Model {
        Model {
            ty,
            id: None,
            attributes: Attributes::new(),
            previous: Attributes::new(),
            changes: ChangeSet::default(),
            views: vec![],
            is_new: true,
            is_removed: false,
            errors: IndexMap::new(),
            associated: IndexMap::new(),
        }
    }

    /// A model materialized from the store. Bypasses the diff path.
    pub(crate) fn loaded(ty: Arc<ModelType>, id: u64, attributes: Attributes) -> Model {
        let views = ty.classify(&attributes);
        Model {
            ty,
            id: Some(id),
            previous: attributes.clone(),
            attributes,
            changes: ChangeSet::default(),
            views,
            is_new: false,
            is_removed: false,
            errors: IndexMap::new(),
            associated: IndexMap::new(),
        }
    }

    pub fn ty(&self) -> &Arc<ModelType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// The current value of an attribute; `None` when unset or null.
    pub fn get(&self, name: &str) -> Option<&Value> {
        non_null(&self.attributes, name)
    }

    /// The value of an attribute as last persisted.
    pub fn previous(&self, name: &str) -> Option<&Value> {
        non_null(&self.previous, name)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Set an attribute. Setting `Value::Null` clears it.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Model> {
        if self.ty.property(name).is_none() {
            return Err(Error::invalid_argument(format!(
                "model `{}` has no property `{name}`",
                self.ty.name
            )));
        }

        let value = value.into();
        let current = self.attributes.get(name).cloned().unwrap_or_default();
        if current == value {
            return Ok(self);
        }

        let persisted = self.previous.get(name).cloned().unwrap_or_default();
        if !self.is_new && persisted == value {
            self.changes.unmark(name);
        } else {
            self.changes.mark(name);
        }

        self.attributes.insert(name.to_string(), value);
        self.errors.shift_remove(name);
        Ok(self)
    }

    /// Set several attributes at once.
    pub fn update<I, K, V>(&mut self, attributes: I) -> Result<&mut Model>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attributes {
            self.set(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Set an attribute as if it had been persisted.
    pub(crate) fn set_silent(&mut self, name: &str, value: Value) {
        self.previous.insert(name.to_string(), value.clone());
        self.attributes.insert(name.to_string(), value);
    }

    /// Overwrite an attribute with its canonical cast form without touching
    /// the diff.
    pub(crate) fn replace(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn changed_attributes(&self) -> impl Iterator<Item = &str> + '_ {
        self.changes.attributes()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_removed(&self) -> bool {
        self.is_removed
    }

    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &IndexMap<String, ValidationError> {
        &self.errors
    }

    pub fn error(&self, property: &str) -> Option<&ValidationError> {
        self.errors.get(property)
    }

    /// The views this record belonged to when it was last persisted.
    pub fn views(&self) -> &[String] {
        &self.views
    }

    fn relation(&self, name: &str) -> Result<&Relation> {
        self.ty.relation(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "model `{}` has no association `{name}`",
                self.ty.name
            ))
        })
    }

    fn check_target(&self, relation: &Relation, other: &Model) -> Result<()> {
        if relation.target != other.ty.id {
            return Err(Error::invalid_argument(format!(
                "association `{}.{}` does not accept a `{}`",
                self.ty.name, relation.name, other.ty.name
            )));
        }
        Ok(())
    }

    /// Queue a child for saving through this model.
    ///
    /// Works for `has_many`, many-to-many and `has_one` relations. The child
    /// is saved after this model on the next [`Model::save`], once this
    /// model's id is known.
    pub fn add_association(&mut self, name: &str, child: Model) -> Result<&mut Model> {
        let relation = self.relation(name)?.clone();
        self.check_target(&relation, &child)?;

        match relation.kind {
            AssocKind::HasMany | AssocKind::ManyToMany => {
                self.changes.push_child(&relation.name, child);
            }
            AssocKind::HasOne => {
                self.changes.replace_child(&relation.name, child);
            }
            AssocKind::BelongsTo => {
                return Err(Error::invalid_argument(format!(
                    "`{}.{name}` is a belongs_to association; use `set_association`",
                    self.ty.name
                )))
            }
        }

        Ok(self)
    }

    /// Link this model with an already-saved model.
    ///
    /// For `belongs_to` this points the foreign key at `target`; for
    /// many-to-many it links the two records on the next save; for `has_one`
    /// it makes `target` this model's child.
    pub fn set_association(&mut self, name: &str, target: &Model) -> Result<&mut Model> {
        let relation = self.relation(name)?.clone();
        self.check_target(&relation, target)?;

        let Some(target_id) = target.id else {
            return Err(Error::invalid_argument(format!(
                "cannot link `{}.{name}` to an unsaved `{}`",
                self.ty.name, target.ty.name
            )));
        };

        match relation.kind {
            AssocKind::BelongsTo => {
                self.set(&key::foreign_key(&target.ty.name), target_id)?;
            }
            AssocKind::ManyToMany => {
                self.changes.push_link(&relation.name, target.link());
            }
            AssocKind::HasOne => {
                self.set(&key::foreign_key(&target.ty.name), target_id)?;
                self.changes.replace_links(&relation.name, target.link());
            }
            AssocKind::HasMany => {
                return Err(Error::invalid_argument(format!(
                    "`{}.{name}` is a has_many association; use `add_association`",
                    self.ty.name
                )))
            }
        }

        Ok(self)
    }

    /// The models persisted through this instance for `name`.
    pub fn association(&self, name: &str) -> Option<&Associated> {
        self.associated.get(name)
    }

    pub(crate) fn link(&self) -> Link {
        Link {
            ty: self.ty.clone(),
            id: self.id.unwrap_or_default(),
            attributes: self.previous.clone(),
            views: self.views.clone(),
        }
    }

    /// Validate and persist this model, then any children queued with
    /// [`Model::add_association`].
    pub async fn save(&mut self, db: &Db) -> Result<SaveOutcome> {
        let outcome = engine::save(db, std::slice::from_mut(self)).await?;
        Ok(outcome.single())
    }

    /// Remove this model, cascading to `has_many` children.
    ///
    /// Removing a model that was never saved does nothing.
    pub async fn remove(&mut self, db: &Db) -> Result<()> {
        engine::remove(db, std::slice::from_mut(self)).await
    }

    /// Run validations without saving. Returns `true` when valid.
    pub async fn validate(&mut self, db: &Db) -> Result<bool> {
        let valid = crate::validate::validate(db, std::slice::from_mut(self)).await?;
        Ok(valid.iter().all(|ok| *ok))
    }

    pub(crate) fn mark_saved(&mut self) -> IndexMap<String, Vec<Model>> {
        self.attributes.retain(|_, value| !value.is_null());
        self.previous = self.attributes.clone();
        self.views = self.ty.classify(&self.attributes);
        self.is_new = false;
        self.is_removed = false;
        self.errors.clear();
        self.changes.take_saved()
    }

    /// Detach the model from its record. Its attributes stay in memory and
    /// are all marked changed so a later save inserts a fresh record.
    pub(crate) fn mark_removed(&mut self) {
        self.id = None;
        self.is_new = true;
        self.is_removed = true;
        self.previous.clear();
        self.views.clear();
        self.changes.clear();
        let names: Vec<String> = self
            .attributes
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, _)| name.clone())
            .collect();
        for name in names {
            self.changes.mark(&name);
        }
    }

    /// The attributes as a JSON object, including the id.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let attrs: Vec<_> = self
            .attributes
            .iter()
            .filter(|(_, value)| !value.is_null())
            .collect();

        let mut map = serializer.serialize_map(Some(attrs.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in attrs {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
