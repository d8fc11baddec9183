use crate::{engine, validate, BatchOutcome, Db, Model};
use biggie_core::Result;

use std::ops::{Index, IndexMut};

/// An ordered batch of models, saved and removed with one pipeline per
/// stage.
///
/// A collection may mix model types.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    models: Vec<Model>,
}

impl Collection {
    pub fn new() -> Collection {
        Collection::default()
    }

    pub fn push(&mut self, model: Model) {
        self.models.push(model);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    pub fn first(&self) -> Option<&Model> {
        self.models.first()
    }

    pub fn last(&self) -> Option<&Model> {
        self.models.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.models.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Model> {
        self.models.iter_mut()
    }

    pub fn as_slice(&self) -> &[Model] {
        &self.models
    }

    pub fn into_vec(self) -> Vec<Model> {
        self.models
    }

    /// Ids of the saved members, in order.
    pub fn ids(&self) -> Vec<u64> {
        self.models.iter().filter_map(Model::id).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.models.iter().any(Model::has_errors)
    }

    /// Members that failed their last validation.
    pub fn errors(&self) -> impl Iterator<Item = &Model> + '_ {
        self.models.iter().filter(|model| model.has_errors())
    }

    /// Validate every member and persist the valid ones. Invalid members
    /// are reported in [`BatchOutcome::rejected`] and keep their errors.
    pub async fn save(&mut self, db: &Db) -> Result<BatchOutcome> {
        engine::save(db, &mut self.models).await
    }

    /// Remove every member, cascading to their `has_many` children.
    pub async fn remove(&mut self, db: &Db) -> Result<()> {
        engine::remove(db, &mut self.models).await
    }

    /// Run validations on every member without saving. Returns `true` when
    /// every member is valid.
    pub async fn validate(&mut self, db: &Db) -> Result<bool> {
        let valid = validate::validate(db, &mut self.models).await?;
        Ok(valid.iter().all(|ok| *ok))
    }
}

impl From<Vec<Model>> for Collection {
    fn from(models: Vec<Model>) -> Collection {
        Collection { models }
    }
}

impl FromIterator<Model> for Collection {
    fn from_iter<I: IntoIterator<Item = Model>>(iter: I) -> Collection {
        Collection {
            models: iter.into_iter().collect(),
        }
    }
}

impl Extend<Model> for Collection {
    fn extend<I: IntoIterator<Item = Model>>(&mut self, iter: I) {
        self.models.extend(iter);
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Model;
    type IntoIter = std::slice::Iter<'a, Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

impl Index<usize> for Collection {
    type Output = Model;

    fn index(&self, index: usize) -> &Model {
        &self.models[index]
    }
}

impl IndexMut<usize> for Collection {
    fn index_mut(&mut self, index: usize) -> &mut Model {
        &mut self.models[index]
    }
}
