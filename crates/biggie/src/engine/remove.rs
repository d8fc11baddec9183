use super::{
    build::{build_remove, build_type_clear, build_unlink, RemoveMode},
    load, load_many,
    resolve::RemoveReads,
};
use crate::{Db, Model};

use async_recursion::async_recursion;
use biggie_core::{
    driver::{Command, Pipeline},
    key,
    schema::{ModelId, ModelType},
    Result,
};

use std::{collections::HashSet, sync::Arc};
use tracing::debug;

/// Records already torn down within one removal call tree.
type Visited = HashSet<(ModelId, u64)>;

pub(crate) async fn remove(db: &Db, models: &mut [Model]) -> Result<()> {
    let mut visited = Visited::new();
    remove_models(db, models, RemoveMode::Direct, &mut visited).await
}

/// Remove every record of a type.
pub(crate) async fn clear(db: &Db, ty: &Arc<ModelType>) -> Result<()> {
    let mut pipeline = Pipeline::new();
    let slot = pipeline.push(Command::SMembers {
        key: key::collection(&ty.name),
    });
    let mut replies = db.exec("clear", pipeline).await?;

    let mut ids = replies.take(slot).into_ids()?;
    ids.sort_unstable();
    let mut models = load(db, ty, &ids).await?;

    debug!(ty = %ty.name, records = models.len(), "clear");

    let mut visited = Visited::new();
    let mut pipeline = Pipeline::new();

    if !ty.has_relations() && models.len() <= db.clear_batch_limit() {
        remove_models(db, &mut models, RemoveMode::Direct, &mut visited).await?;
        pipeline.push(Command::Del {
            keys: vec![key::counter(&ty.name)],
        });
    } else {
        remove_models(db, &mut models, RemoveMode::Clear(ty.id), &mut visited).await?;
        build_type_clear(ty, &mut pipeline);
    }

    db.exec("clear", pipeline).await?;
    Ok(())
}

/// Tear down `models`, then cascade to their `has_many` children.
///
/// 1. one pipeline tears the batch down and reads the ids of dependents;
/// 2. one pipeline loads the dependents;
/// 3. one pipeline unlinks many-to-many partners, then the children are
///    removed recursively.
#[async_recursion]
async fn remove_models(
    db: &Db,
    models: &mut [Model],
    mode: RemoveMode,
    visited: &mut Visited,
) -> Result<()> {
    let schema = db.schema().clone();

    let targets: Vec<usize> = models
        .iter()
        .enumerate()
        .filter_map(|(i, model)| match model.id {
            Some(id) if !model.is_new && visited.insert((model.ty.id, id)) => Some(i),
            _ => None,
        })
        .collect();

    if targets.is_empty() {
        return Ok(());
    }

    debug!(records = targets.len(), ?mode, "remove");

    let mut pipeline = Pipeline::new();
    let reads = RemoveReads::plan(&schema, models, &targets, &mut pipeline);
    for &i in &targets {
        build_remove(&schema, &models[i], mode, &mut pipeline);
    }

    let mut replies = db.exec("remove", pipeline).await?;
    let dependents = reads.collect(&mut replies)?;

    let owners: Vec<_> = targets.iter().map(|&i| (i, models[i].link())).collect();
    for &i in &targets {
        models[i].mark_removed();
    }

    // Load children not already handled and every partner together.
    let mut requests = vec![];
    for (_, child, ids) in &dependents.children {
        let ids = ids
            .iter()
            .copied()
            .filter(|id| !visited.contains(&(child.id, *id)))
            .collect();
        requests.push((child.clone(), ids));
    }
    for (_, partner, ids) in &dependents.partners {
        requests.push((partner.clone(), ids.clone()));
    }

    let mut loaded = load_many(db, &requests).await?.into_iter();
    let children: Vec<_> = dependents
        .children
        .iter()
        .map(|(parent, _, _)| (*parent, loaded.next().unwrap_or_default()))
        .collect();

    let mut pipeline = Pipeline::new();
    for (owner, partner_ty, ids) in &dependents.partners {
        let partners = loaded.next().unwrap_or_default();
        let Some((_, link)) = owners.iter().find(|(i, _)| i == owner) else {
            continue;
        };
        for &pid in ids {
            let partner = partners.iter().find(|model| model.id == Some(pid));
            build_unlink(link, partner_ty, pid, partner, &mut pipeline);
        }
    }
    db.exec("unlink", pipeline).await?;

    for (parent, mut models) in children {
        remove_models(db, &mut models, RemoveMode::Cascade(parent), visited).await?;
    }

    Ok(())
}
