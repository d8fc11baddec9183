use super::{
    build::build_save,
    resolve::{resolve_save, Queued},
};
use crate::{
    publish::{Envelope, EnvelopeKind},
    validate, Associated, BatchOutcome, Collection, Db, Model,
};

use async_recursion::async_recursion;
use biggie_core::{
    driver::{Command, Pipeline},
    key,
    schema::AssocKind,
    Result,
};

use tracing::debug;

/// Validate and persist a batch, then the children it releases.
///
/// 1. validation, with every unique probe in one pipeline;
/// 2. one pipeline reserving ids for new models and updating existing ones;
/// 3. one pipeline inserting the new models;
/// 4. the released children, recursively.
#[async_recursion]
pub(crate) async fn save(db: &Db, models: &mut [Model]) -> Result<BatchOutcome> {
    let schema = db.schema().clone();
    let valid = validate::validate(db, models).await?;

    let mut outcome = BatchOutcome::default();
    let mut inserts = vec![];
    let mut updates = vec![];

    for (i, model) in models.iter().enumerate() {
        if !valid[i] {
            outcome.rejected.push(i);
        } else if !model.is_changed() {
            outcome.unchanged.push(i);
        } else if model.is_new {
            inserts.push(i);
        } else {
            updates.push(i);
        }
    }

    if inserts.is_empty() && updates.is_empty() {
        return Ok(outcome);
    }

    debug!(inserts = inserts.len(), updates = updates.len(), "save");

    // Stage one: reserve ids and write the updates.
    let mut pipeline = Pipeline::new();
    let slots: Vec<_> = inserts
        .iter()
        .map(|&i| {
            pipeline.push(Command::Incr {
                key: key::counter(&models[i].ty.name),
            })
        })
        .collect();
    for &i in &updates {
        build_save(&schema, &models[i], &mut pipeline);
    }

    let mut replies = db.exec("save ids", pipeline).await?;
    let ids = slots
        .into_iter()
        .map(|slot| replies.take(slot).into_id())
        .collect::<Result<Vec<_>>>()?;
    for (&i, id) in inserts.iter().zip(ids) {
        models[i].id = Some(id);
    }

    // Stage two: the inserts, now that their ids are known.
    let mut pipeline = Pipeline::new();
    for &i in &inserts {
        build_save(&schema, &models[i], &mut pipeline);
    }
    if let Err(err) = db.exec("save rows", pipeline).await {
        // The reserved ids are burned; the models stay new.
        for &i in &inserts {
            models[i].id = None;
        }
        return Err(err);
    }

    let mut written: Vec<usize> = updates.iter().chain(&inserts).copied().collect();
    written.sort_unstable();

    let mut queued = vec![];
    for &i in &written {
        let envelope = envelope(&models[i]);
        let children = models[i].mark_saved();
        queued.extend(resolve_save(&schema, i, &models[i], children)?);
        db.publish(envelope);
    }
    outcome.saved = written;

    save_children(db, models, queued).await?;

    Ok(outcome)
}

/// Save every queued child in one batch and hand each back to its parent.
async fn save_children(db: &Db, parents: &mut [Model], queued: Vec<Queued>) -> Result<()> {
    if queued.is_empty() {
        return Ok(());
    }

    let mut batch = vec![];
    let mut groups = vec![];
    for queued in queued {
        let start = batch.len();
        batch.extend(queued.children);
        groups.push((queued.parent, queued.relation, queued.kind, start..batch.len()));
    }

    let children = save(db, &mut batch).await?;

    let mut batch: Vec<Option<Model>> = batch.into_iter().map(Some).collect();
    for (parent, relation, kind, range) in groups {
        let parent = &mut parents[parent];

        for i in range {
            let Some(child) = batch[i].take() else {
                continue;
            };

            if children.rejected.contains(&i) {
                // Stays pending until the parent is saved again.
                match kind {
                    AssocKind::HasOne => parent.changes.replace_child(&relation, child),
                    _ => parent.changes.push_child(&relation, child),
                }
                continue;
            }

            match kind {
                AssocKind::HasOne => {
                    if let Some(id) = child.id {
                        let fk = key::foreign_key(&child.ty.name);
                        parent.set_silent(&fk, id.into());
                    }
                    parent
                        .associated
                        .insert(relation.clone(), Associated::One(Some(child)));
                }
                _ => match parent
                    .associated
                    .entry(relation.clone())
                    .or_insert_with(|| Associated::Many(Collection::new()))
                {
                    Associated::Many(collection) => collection.push(child),
                    other => *other = Associated::Many(Collection::from(vec![child])),
                },
            }
        }
    }

    Ok(())
}

/// The notification for a model about to be marked saved.
fn envelope(model: &Model) -> Envelope {
    let id = model.id.unwrap_or_default();

    let (kind, data) = if model.is_new {
        (EnvelopeKind::New, model.to_json())
    } else {
        let mut data = serde_json::Map::new();
        data.insert("id".into(), id.into());
        for name in model.changes.attributes() {
            let value = model.get(name).cloned().unwrap_or_default();
            data.insert(
                name.to_string(),
                serde_json::to_value(value).unwrap_or_default(),
            );
        }
        (EnvelopeKind::Change, serde_json::Value::Object(data))
    };

    Envelope {
        kind,
        data,
        channel: Envelope::channel(kind, &model.ty.name, id),
    }
}
