mod plan;
use plan::Plan;

mod query;
pub use query::{Condition, Filter, Query, Range};

use crate::{engine, Collection, Db, Model};

use biggie_core::{
    driver::{Command, Pipeline},
    key::Scope,
    schema::ModelType,
    Result,
};

use std::{collections::BTreeSet, sync::Arc};
use tracing::debug;

/// A planned query, executed by one of its terminal methods.
///
/// Results are ordered by id, ascending unless [`Finder::desc`] is set.
#[derive(Clone)]
pub struct Finder {
    db: Db,
    ty: Arc<ModelType>,

    /// The set every result is drawn from: the type's collection, or a
    /// parent's link set for scoped finders.
    base: String,

    plan: Plan,

    desc: bool,
}

impl Finder {
    pub(crate) fn new(
        db: Db,
        ty: Arc<ModelType>,
        scope: Scope<'_>,
        base: String,
        query: Query,
    ) -> Result<Finder> {
        let plan = plan::plan(&ty, scope, query)?;
        Ok(Finder {
            db,
            ty,
            base,
            plan,
            desc: false,
        })
    }

    pub fn asc(mut self) -> Finder {
        self.desc = false;
        self
    }

    pub fn desc(mut self) -> Finder {
        self.desc = true;
        self
    }

    pub async fn all(self) -> Result<Collection> {
        self.fetch(0, None).await
    }

    /// `len` results starting at `start`.
    pub async fn some(self, start: usize, len: usize) -> Result<Collection> {
        self.fetch(start, Some(len)).await
    }

    pub async fn limit(self, len: usize) -> Result<Collection> {
        self.fetch(0, Some(len)).await
    }

    pub async fn first(self) -> Result<Option<Model>> {
        Ok(self.fetch(0, Some(1)).await?.into_iter().next())
    }

    /// The result with the highest id.
    pub async fn last(self) -> Result<Option<Model>> {
        self.desc().first().await
    }

    async fn fetch(self, start: usize, len: Option<usize>) -> Result<Collection> {
        if self.plan.is_void() || len == Some(0) {
            return Ok(Collection::new());
        }

        debug!(ty = %self.ty.name, base = %self.base, probes = self.plan.probes.len(), filters = self.plan.filters.len(), "find");

        if self.plan.is_scan() {
            let mut pipeline = Pipeline::new();
            let slot = pipeline.push(Command::Sort {
                key: self.base.clone(),
                offset: start,
                count: len,
                desc: self.desc,
            });
            let mut replies = self.db.exec("find", pipeline).await?;
            let ids = replies.take(slot).into_ids()?;
            return self.load(&ids).await;
        }

        let mut ids = self.candidates().await?;
        if self.desc {
            ids.reverse();
        }

        if self.plan.filters.is_empty() {
            let ids = window(&ids, start, len);
            return self.load(ids).await;
        }

        let matching: Vec<Model> = engine::load(&self.db, &self.ty, &ids)
            .await?
            .into_iter()
            .filter(|model| self.plan.filters.iter().all(|f| f(model)))
            .collect();

        Ok(window(&matching, start, len).iter().cloned().collect())
    }

    /// Ids satisfying every indexed condition, ascending. Without indexed
    /// conditions, every member of the base set.
    async fn candidates(&self) -> Result<Vec<u64>> {
        let mut pipeline = Pipeline::new();

        if self.plan.probes.is_empty() {
            let slot = pipeline.push(Command::SMembers {
                key: self.base.clone(),
            });
            let mut replies = self.db.exec("find", pipeline).await?;
            let mut ids = replies.take(slot).into_ids()?;
            ids.sort_unstable();
            return Ok(ids);
        }

        let slots: Vec<Vec<_>> = self
            .plan
            .probes
            .iter()
            .map(|probes| {
                probes
                    .iter()
                    .map(|probe| pipeline.push(probe.clone()))
                    .collect()
            })
            .collect();
        let mut replies = self.db.exec("find", pipeline).await?;

        let mut result: Option<BTreeSet<u64>> = None;
        for condition in slots {
            let mut matched = BTreeSet::new();
            for slot in condition {
                matched.extend(replies.take(slot).into_ids()?);
            }

            let narrowed = match result {
                Some(acc) => acc.intersection(&matched).copied().collect(),
                None => matched,
            };
            if narrowed.is_empty() {
                return Ok(vec![]);
            }
            result = Some(narrowed);
        }

        Ok(result.unwrap_or_default().into_iter().collect())
    }

    async fn load(&self, ids: &[u64]) -> Result<Collection> {
        Ok(engine::load(&self.db, &self.ty, ids).await?.into_iter().collect())
    }
}

fn window<T>(items: &[T], start: usize, len: Option<usize>) -> &[T] {
    let start = start.min(items.len());
    let end = match len {
        Some(len) => start.saturating_add(len).min(items.len()),
        None => items.len(),
    };
    &items[start..end]
}

impl std::fmt::Debug for Finder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finder")
            .field("ty", &self.ty.name)
            .field("base", &self.base)
            .field("probes", &self.plan.probes)
            .field("filters", &self.plan.filters.len())
            .field("desc", &self.desc)
            .finish()
    }
}
