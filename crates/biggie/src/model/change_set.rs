use super::Model;
use biggie_core::{schema::ModelType, Attributes};

use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// What changed on a model since it was last persisted.
///
/// Owned by its model and cleared when a save succeeds.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    attributes: IndexSet<String>,
    associations: IndexMap<String, Pending>,
}

/// An association edit waiting for the next save, keyed by relation name.
#[derive(Debug, Clone)]
pub(crate) enum Pending {
    /// Owned models to save after this model has an id.
    Children(Vec<Model>),

    /// Already-saved models to link with this one.
    Links(Vec<Link>),
}

/// A snapshot of a persisted model this model is being linked to.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub(crate) ty: Arc<ModelType>,
    pub(crate) id: u64,
    pub(crate) attributes: Attributes,
    pub(crate) views: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.associations.is_empty()
    }

    /// Names of attributes set since the last save.
    pub fn attributes(&self) -> impl Iterator<Item = &str> + '_ {
        self.attributes.iter().map(String::as_str)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Names of relations with pending edits.
    pub fn associations(&self) -> impl Iterator<Item = &str> + '_ {
        self.associations.keys().map(String::as_str)
    }

    pub(crate) fn mark(&mut self, attribute: &str) {
        self.attributes.insert(attribute.to_string());
    }

    pub(crate) fn unmark(&mut self, attribute: &str) {
        self.attributes.shift_remove(attribute);
    }

    pub(crate) fn push_child(&mut self, relation: &str, child: Model) {
        match self.associations.get_mut(relation) {
            Some(Pending::Children(children)) => children.push(child),
            _ => {
                self.associations
                    .insert(relation.to_string(), Pending::Children(vec![child]));
            }
        }
    }

    /// Replace whatever is pending for a single-valued relation.
    pub(crate) fn replace_child(&mut self, relation: &str, child: Model) {
        self.associations
            .insert(relation.to_string(), Pending::Children(vec![child]));
    }

    pub(crate) fn push_link(&mut self, relation: &str, link: Link) {
        match self.associations.get_mut(relation) {
            Some(Pending::Links(links)) => {
                links.retain(|existing| existing.id != link.id);
                links.push(link);
            }
            _ => {
                self.associations
                    .insert(relation.to_string(), Pending::Links(vec![link]));
            }
        }
    }

    pub(crate) fn replace_links(&mut self, relation: &str, link: Link) {
        self.associations
            .insert(relation.to_string(), Pending::Links(vec![link]));
    }

    /// Pending links whose target is of type `ty`, across every relation
    /// name that points at it.
    pub(crate) fn links_to<'a>(&'a self, ty: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.associations
            .values()
            .filter_map(|pending| match pending {
                Pending::Links(links) => Some(links),
                Pending::Children(_) => None,
            })
            .flatten()
            .filter(move |link| link.ty.name == ty)
    }

    /// Clear the diff, handing back the owned children that still need
    /// saving.
    pub(crate) fn take_saved(&mut self) -> IndexMap<String, Vec<Model>> {
        self.attributes.clear();
        std::mem::take(&mut self.associations)
            .into_iter()
            .filter_map(|(name, pending)| match pending {
                Pending::Children(children) => Some((name, children)),
                Pending::Links(_) => None,
            })
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.attributes.clear();
        self.associations.clear();
    }
}
