mod error;
pub use error::{ErrorCode, ValidationError};

use crate::{Db, Model};

use biggie_core::{
    driver::{Command, Pipeline, ScoreBound, Slot},
    key::{self, Scope},
    schema::{ModelId, Validator},
    Result,
};

use futures::future::{join_all, BoxFuture};
use std::collections::HashSet;
use tracing::debug;

/// A store probe for a unique value, answered by the validation pipeline.
struct Probe {
    model: usize,
    property: String,
    slot: Slot,
}

/// An async validator invocation.
struct Task {
    model: usize,
    property: String,
    validator: String,
    verdict: BoxFuture<'static, bool>,
}

/// Validate a batch of models, recording failures on each model.
///
/// Returns one verdict per model. Unchanged, already-saved models are
/// skipped and reported valid. Synchronous checks run first; models that
/// pass them then have their unique probes and async validators run
/// concurrently, with every probe of the batch in a single pipeline.
pub(crate) async fn validate(db: &Db, models: &mut [Model]) -> Result<Vec<bool>> {
    let mut seen: HashSet<(ModelId, String, String)> = HashSet::new();
    let mut pipeline = Pipeline::new();
    let mut probes = vec![];
    let mut tasks = vec![];

    for (i, model) in models.iter_mut().enumerate() {
        if !model.is_new && !model.is_changed() {
            continue;
        }
        model.errors.clear();

        let ty = model.ty.clone();
        let mut deferred = vec![];

        for prop in ty.properties.values() {
            let value = model.attributes.get(&prop.name).cloned().unwrap_or_default();

            if value.is_null() {
                if prop.required {
                    model
                        .errors
                        .insert(prop.name.clone(), ValidationError::required(&prop.name));
                }
                continue;
            }

            if !model.is_new && !model.changes.contains(&prop.name) {
                continue;
            }

            let Some(value) = prop.ty.cast(&value) else {
                model.errors.insert(
                    prop.name.clone(),
                    ValidationError::ty(&prop.name, prop.ty.name()),
                );
                continue;
            };
            model.replace(&prop.name, value.clone());

            let failed = prop.checks.iter().find(|check| match &check.validator {
                Validator::Sync(f) => f(&value) != check.want,
                Validator::Async(_) => false,
            });
            if let Some(check) = failed {
                model.errors.insert(
                    prop.name.clone(),
                    ValidationError::valid(&prop.name, &check.name),
                );
                continue;
            }

            deferred.push((prop, value));
        }

        // A model failing synchronously never reaches the store.
        if model.has_errors() {
            continue;
        }

        // Only a model passing its synchronous checks claims its unique
        // values within the batch.
        let claims: Vec<_> = deferred
            .iter()
            .filter(|(prop, _)| prop.unique)
            .map(|(prop, value)| (ty.id, prop.name.clone(), value.to_key_part()))
            .collect();
        for claim in &claims {
            if seen.contains(claim) {
                model
                    .errors
                    .insert(claim.1.clone(), ValidationError::unique(&claim.1));
            }
        }
        if model.has_errors() {
            continue;
        }
        seen.extend(claims);

        for (prop, value) in deferred {
            if prop.unique {
                let scope = Scope::Type(&ty.name);
                let command = match value.score() {
                    Some(score) if prop.is_numeric() => Command::ZRangeByScore {
                        key: key::index(scope, &prop.name),
                        min: ScoreBound::Inclusive(score),
                        max: ScoreBound::Inclusive(score),
                    },
                    _ => Command::SMembers {
                        key: key::index_value(scope, &prop.name, &value.to_key_part()),
                    },
                };
                probes.push(Probe {
                    model: i,
                    property: prop.name.clone(),
                    slot: pipeline.push(command),
                });
            }

            for check in &prop.checks {
                if let Validator::Async(f) = &check.validator {
                    tasks.push(Task {
                        model: i,
                        property: prop.name.clone(),
                        validator: check.name.clone(),
                        verdict: f(value.clone(), check.want, model.attributes.clone()),
                    });
                }
            }
        }
    }

    if !probes.is_empty() || !tasks.is_empty() {
        debug!(probes = probes.len(), tasks = tasks.len(), "validate");
    }

    let (verdicts, labels): (Vec<_>, Vec<_>) = tasks
        .into_iter()
        .map(|task| (task.verdict, (task.model, task.property, task.validator)))
        .unzip();
    let (replies, verdicts) = futures::join!(db.exec("validate", pipeline), join_all(verdicts));
    let mut replies = replies?;

    for probe in probes {
        let holders = replies.take(probe.slot).into_ids()?;
        let model = &mut models[probe.model];
        if holders.iter().any(|&holder| Some(holder) != model.id) {
            model
                .errors
                .entry(probe.property.clone())
                .or_insert_with(|| ValidationError::unique(&probe.property));
        }
    }

    for ((i, property, validator), ok) in labels.into_iter().zip(verdicts) {
        if !ok {
            models[i]
                .errors
                .entry(property.clone())
                .or_insert_with(|| ValidationError::valid(&property, &validator));
        }
    }

    Ok(models.iter().map(|model| !model.has_errors()).collect())
}
