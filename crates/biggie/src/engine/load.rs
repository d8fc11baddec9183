use crate::{Db, Model};

use biggie_core::{
    driver::{Command, Pipeline, Slot},
    key,
    schema::ModelType,
    Attributes, Result,
};

use std::sync::Arc;
use tracing::trace;

/// Materialize records of one type by id, in the order given. Ids whose
/// hash is gone are skipped.
pub(crate) async fn load(db: &Db, ty: &Arc<ModelType>, ids: &[u64]) -> Result<Vec<Model>> {
    let mut loaded = load_many(db, &[(ty.clone(), ids.to_vec())]).await?;
    Ok(loaded.pop().unwrap_or_default())
}

/// Like [`load`] for several types, in one pipeline.
pub(crate) async fn load_many(
    db: &Db,
    requests: &[(Arc<ModelType>, Vec<u64>)],
) -> Result<Vec<Vec<Model>>> {
    let mut pipeline = Pipeline::new();
    let mut slots: Vec<Vec<(u64, Option<Slot>)>> = Vec::with_capacity(requests.len());

    for (ty, ids) in requests {
        let fields: Vec<String> = ty.properties.keys().cloned().collect();
        let per_type = ids
            .iter()
            .map(|&id| {
                // A type without properties never has a hash to read.
                let slot = (!fields.is_empty()).then(|| {
                    pipeline.push(Command::HMGet {
                        key: key::record(&ty.name, id),
                        fields: fields.clone(),
                    })
                });
                (id, slot)
            })
            .collect();
        slots.push(per_type);
    }

    let mut replies = db.exec("load", pipeline).await?;
    let mut loaded = Vec::with_capacity(requests.len());

    for ((ty, _), per_type) in requests.iter().zip(slots) {
        let mut models = Vec::with_capacity(per_type.len());

        for (id, slot) in per_type {
            let Some(slot) = slot else {
                models.push(Model::loaded(ty.clone(), id, Attributes::new()));
                continue;
            };

            let values = replies.take(slot).into_fields()?;
            if values.iter().all(Option::is_none) {
                trace!(ty = %ty.name, id, "record missing; skipped");
                continue;
            }

            let attributes: Attributes = ty
                .properties
                .values()
                .zip(values)
                .filter_map(|(prop, bytes)| Some((prop.name.clone(), prop.ty.decode(bytes?))))
                .collect();

            trace!(ty = %ty.name, id, fields = attributes.len(), "record loaded");
            models.push(Model::loaded(ty.clone(), id, attributes));
        }

        loaded.push(models);
    }

    Ok(loaded)
}
