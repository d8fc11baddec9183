use crate::model::{Link, Model};

use biggie_core::{
    driver::{Command, Pipeline},
    key::{self, Scope},
    schema::{AssocKind, ModelId, ModelType, Schema},
    Attributes, Value,
};

/// Why a record is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RemoveMode {
    /// Removed by the caller.
    Direct,

    /// Removed because its parent of this type was removed. The parent has
    /// already dropped the assoc set and the scoped view and numeric index
    /// keys.
    Cascade(ModelId),

    /// Removed by clearing the whole type. The type's collection, view and
    /// numeric index keys are dropped wholesale afterwards.
    Clear(ModelId),
}

/// Which index structures a teardown touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entries {
    /// Views and every index.
    All,

    /// Only the per-value sets of non-numeric indexes, which can't be
    /// dropped wholesale because their keys embed the value.
    ValueSets,
}

fn non_null<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a Value> {
    attributes.get(name).filter(|value| !value.is_null())
}

/// Commands persisting a model's diff. The model must have an id.
pub(super) fn build_save(schema: &Schema, model: &Model, pipeline: &mut Pipeline) {
    let Some(id) = model.id else {
        return;
    };
    let ty = &*model.ty;
    let scope = Scope::Type(&ty.name);
    let views = ty.classify(&model.attributes);

    if model.is_new {
        pipeline.push(Command::SAdd {
            key: key::collection(&ty.name),
            member: id,
        });
    }

    view_delta(pipeline, scope, id, &model.views, &views);
    index_delta(pipeline, ty, scope, id, model);

    for relation in ty.relations_of_kind(AssocKind::BelongsTo) {
        let parent = schema.target(relation);
        let fk = key::foreign_key(&parent.name);

        let prev = if model.is_new {
            None
        } else {
            model.previous(&fk).and_then(Value::as_u64)
        };
        let cur = model.get(&fk).and_then(Value::as_u64);

        match schema.pair(relation).kind {
            AssocKind::HasMany if prev != cur => {
                if let Some(old) = prev {
                    pipeline.push(Command::SRem {
                        key: key::assoc(&parent.name, old, &ty.name),
                        member: id,
                    });
                    let scope = Scope::parent(&parent.name, old, &ty.name);
                    remove_entries(
                        pipeline,
                        ty,
                        scope,
                        id,
                        &model.previous,
                        &model.views,
                        Entries::All,
                    );
                }
                if let Some(new) = cur {
                    pipeline.push(Command::SAdd {
                        key: key::assoc(&parent.name, new, &ty.name),
                        member: id,
                    });
                    let scope = Scope::parent(&parent.name, new, &ty.name);
                    add_entries(pipeline, ty, scope, id, &model.attributes, &views);
                }
            }
            AssocKind::HasMany => {
                if let Some(pid) = cur {
                    let scope = Scope::parent(&parent.name, pid, &ty.name);
                    view_delta(pipeline, scope, id, &model.views, &views);
                    index_delta(pipeline, ty, scope, id, model);
                }
            }
            AssocKind::HasOne if prev != cur => {
                if let Some(old) = prev {
                    pipeline.push(Command::HDel {
                        key: key::record(&parent.name, old),
                        fields: vec![key::foreign_key(&ty.name)],
                    });
                }
                if let Some(pid) = cur {
                    pipeline.push(Command::HSet {
                        key: key::record(&parent.name, pid),
                        field: key::foreign_key(&ty.name),
                        value: id.to_string().into_bytes(),
                    });
                }
            }
            _ => {}
        }
    }

    // An already-saved child adopted through `set_association`.
    for relation in ty.relations_of_kind(AssocKind::HasOne) {
        let child = schema.target(relation);
        for link in model.changes.links_to(&child.name) {
            pipeline.push(Command::HSet {
                key: key::record(&child.name, link.id),
                field: key::foreign_key(&ty.name),
                value: id.to_string().into_bytes(),
            });
        }
    }

    // Both directions are written from this side; the partner's own diff
    // never carries the reverse link.
    for relation in ty.many_to_many() {
        let partner = schema.target(relation);
        for link in model.changes.links_to(&partner.name) {
            pipeline.push(Command::SAdd {
                key: key::assoc(&ty.name, id, &partner.name),
                member: link.id,
            });
            let scope = Scope::parent(&ty.name, id, &partner.name);
            add_entries(pipeline, partner, scope, link.id, &link.attributes, &link.views);

            pipeline.push(Command::SAdd {
                key: key::assoc(&partner.name, link.id, &ty.name),
                member: id,
            });
            let scope = Scope::parent(&partner.name, link.id, &ty.name);
            add_entries(pipeline, ty, scope, id, &model.attributes, &views);
        }
    }

    let mut fields = vec![];
    let mut cleared = vec![];
    for name in model.changes.attributes() {
        match model.get(name) {
            Some(value) => fields.push((name.to_string(), value.to_bytes())),
            None if !model.is_new => cleared.push(name.to_string()),
            None => {}
        }
    }

    if !fields.is_empty() {
        pipeline.push(Command::HMSet {
            key: key::record(&ty.name, id),
            fields,
        });
    }

    if !cleared.is_empty() {
        pipeline.push(Command::HDel {
            key: key::record(&ty.name, id),
            fields: cleared,
        });
    }
}

/// Commands tearing down a persisted model.
pub(super) fn build_remove(schema: &Schema, model: &Model, mode: RemoveMode, pipeline: &mut Pipeline) {
    let Some(id) = model.id else {
        return;
    };
    let ty = &*model.ty;
    let scope = Scope::Type(&ty.name);

    if mode == RemoveMode::Clear(ty.id) {
        remove_entries(pipeline, ty, scope, id, &model.previous, &[], Entries::ValueSets);
    } else {
        remove_entries(
            pipeline,
            ty,
            scope,
            id,
            &model.previous,
            &model.views,
            Entries::All,
        );
        pipeline.push(Command::SRem {
            key: key::collection(&ty.name),
            member: id,
        });
    }

    // Link sets owned by this record, with the scoped copies that can be
    // dropped by key.
    let owned = ty
        .relations_of_kind(AssocKind::HasMany)
        .chain(ty.many_to_many());
    for relation in owned {
        let child = schema.target(relation);
        let scope = Scope::parent(&ty.name, id, &child.name);

        let mut keys = vec![key::assoc(&ty.name, id, &child.name)];
        keys.extend(child.views.iter().map(|view| key::view(scope, view)));
        keys.extend(
            child
                .indexed_properties()
                .filter(|prop| prop.is_numeric())
                .map(|prop| key::index(scope, &prop.name)),
        );

        pipeline.push(Command::Del { keys });
    }

    for relation in ty.relations_of_kind(AssocKind::BelongsTo) {
        let parent = schema.target(relation);
        let fk = key::foreign_key(&parent.name);
        let Some(pid) = model.previous(&fk).and_then(Value::as_u64) else {
            continue;
        };

        match schema.pair(relation).kind {
            AssocKind::HasOne => {
                pipeline.push(Command::HDel {
                    key: key::record(&parent.name, pid),
                    fields: vec![key::foreign_key(&ty.name)],
                });
            }
            AssocKind::HasMany => {
                let scope = Scope::parent(&parent.name, pid, &ty.name);
                if mode == RemoveMode::Cascade(parent.id) {
                    remove_entries(pipeline, ty, scope, id, &model.previous, &[], Entries::ValueSets);
                } else {
                    pipeline.push(Command::SRem {
                        key: key::assoc(&parent.name, pid, &ty.name),
                        member: id,
                    });
                    remove_entries(
                        pipeline,
                        ty,
                        scope,
                        id,
                        &model.previous,
                        &model.views,
                        Entries::All,
                    );
                }
            }
            _ => {}
        }
    }

    pipeline.push(Command::Del {
        keys: vec![key::record(&ty.name, id)],
    });
}

/// Commands dropping a type's shared keys after its records are gone.
pub(super) fn build_type_clear(ty: &ModelType, pipeline: &mut Pipeline) {
    let scope = Scope::Type(&ty.name);

    let mut keys: Vec<String> = ty
        .indexed_properties()
        .filter(|prop| prop.is_numeric())
        .map(|prop| key::index(scope, &prop.name))
        .collect();
    keys.extend(ty.views.iter().map(|view| key::view(scope, view)));
    keys.push(key::counter(&ty.name));
    keys.push(key::collection(&ty.name));

    pipeline.push(Command::Del { keys });
}

/// Commands detaching a removed record from one many-to-many partner.
///
/// `owner` is the snapshot of the removed record taken before teardown;
/// `partner` is the loaded partner, or `None` when its hash is gone.
pub(super) fn build_unlink(
    owner: &Link,
    partner_ty: &ModelType,
    partner_id: u64,
    partner: Option<&Model>,
    pipeline: &mut Pipeline,
) {
    let owner_ty = &*owner.ty;

    pipeline.push(Command::SRem {
        key: key::assoc(&partner_ty.name, partner_id, &owner_ty.name),
        member: owner.id,
    });
    let scope = Scope::parent(&partner_ty.name, partner_id, &owner_ty.name);
    remove_entries(
        pipeline,
        owner_ty,
        scope,
        owner.id,
        &owner.attributes,
        &owner.views,
        Entries::All,
    );

    if let Some(partner) = partner {
        let scope = Scope::parent(&owner_ty.name, owner.id, &partner_ty.name);
        remove_entries(
            pipeline,
            partner_ty,
            scope,
            partner_id,
            &partner.previous,
            &[],
            Entries::ValueSets,
        );
    }
}

fn add_entries(
    pipeline: &mut Pipeline,
    ty: &ModelType,
    scope: Scope<'_>,
    id: u64,
    attributes: &Attributes,
    views: &[String],
) {
    for view in views {
        pipeline.push(Command::SAdd {
            key: key::view(scope, view),
            member: id,
        });
    }

    for prop in ty.indexed_properties() {
        let Some(value) = non_null(attributes, &prop.name) else {
            continue;
        };
        if prop.is_numeric() {
            if let Some(score) = value.score() {
                pipeline.push(Command::ZAdd {
                    key: key::index(scope, &prop.name),
                    score,
                    member: id,
                });
            }
        } else {
            pipeline.push(Command::SAdd {
                key: key::index_value(scope, &prop.name, &value.to_key_part()),
                member: id,
            });
        }
    }
}

fn remove_entries(
    pipeline: &mut Pipeline,
    ty: &ModelType,
    scope: Scope<'_>,
    id: u64,
    attributes: &Attributes,
    views: &[String],
    entries: Entries,
) {
    if entries == Entries::All {
        for view in views {
            pipeline.push(Command::SRem {
                key: key::view(scope, view),
                member: id,
            });
        }
    }

    for prop in ty.indexed_properties() {
        let Some(value) = non_null(attributes, &prop.name) else {
            continue;
        };
        if !prop.is_numeric() {
            pipeline.push(Command::SRem {
                key: key::index_value(scope, &prop.name, &value.to_key_part()),
                member: id,
            });
        } else if entries == Entries::All {
            pipeline.push(Command::ZRem {
                key: key::index(scope, &prop.name),
                member: id,
            });
        }
    }
}

/// Move the record between views, touching only the symmetric difference.
fn view_delta(pipeline: &mut Pipeline, scope: Scope<'_>, id: u64, old: &[String], new: &[String]) {
    for view in old.iter().filter(|view| !new.contains(view)) {
        pipeline.push(Command::SRem {
            key: key::view(scope, view),
            member: id,
        });
    }
    for view in new.iter().filter(|view| !old.contains(view)) {
        pipeline.push(Command::SAdd {
            key: key::view(scope, view),
            member: id,
        });
    }
}

fn index_delta(pipeline: &mut Pipeline, ty: &ModelType, scope: Scope<'_>, id: u64, model: &Model) {
    for prop in ty.indexed_properties() {
        if !model.is_new && !model.changes.contains(&prop.name) {
            continue;
        }

        let prev = if model.is_new {
            None
        } else {
            model.previous(&prop.name)
        };
        let cur = model.get(&prop.name);
        if prev == cur {
            continue;
        }

        if prop.is_numeric() {
            if prev.is_some() {
                pipeline.push(Command::ZRem {
                    key: key::index(scope, &prop.name),
                    member: id,
                });
            }
            if let Some(score) = cur.and_then(Value::score) {
                pipeline.push(Command::ZAdd {
                    key: key::index(scope, &prop.name),
                    score,
                    member: id,
                });
            }
        } else {
            if let Some(prev) = prev {
                pipeline.push(Command::SRem {
                    key: key::index_value(scope, &prop.name, &prev.to_key_part()),
                    member: id,
                });
            }
            if let Some(cur) = cur {
                pipeline.push(Command::SAdd {
                    key: key::index_value(scope, &prop.name, &cur.to_key_part()),
                    member: id,
                });
            }
        }
    }
}
