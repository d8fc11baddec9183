//! Discovers the models a save or remove drags along with it.

use crate::Model;

use biggie_core::{
    driver::{Command, Pipeline, Replies, Slot},
    key,
    schema::{AssocKind, ModelId, ModelType, Schema},
    Error, Result,
};

use indexmap::IndexMap;
use std::sync::Arc;

/// Children released by one saved parent for one relation.
pub(super) struct Queued {
    /// Position of the parent in its batch.
    pub(super) parent: usize,
    pub(super) relation: String,
    pub(super) kind: AssocKind,
    pub(super) children: Vec<Model>,
}

/// Point the children handed back by `Model::mark_saved` at their freshly
/// saved parent so they can be saved next.
pub(super) fn resolve_save(
    schema: &Schema,
    index: usize,
    parent: &Model,
    children: IndexMap<String, Vec<Model>>,
) -> Result<Vec<Queued>> {
    let Some(pid) = parent.id else {
        return Ok(vec![]);
    };
    let mut queued = vec![];

    for (name, mut kids) in children {
        let Some(relation) = parent.ty.relation(&name) else {
            continue;
        };

        match relation.kind {
            AssocKind::HasMany | AssocKind::HasOne => {
                let fk = key::foreign_key(&parent.ty.name);
                for kid in &mut kids {
                    kid.set(&fk, pid)?;
                }
            }
            AssocKind::ManyToMany => {
                let pair = schema.pair(relation);
                for kid in &mut kids {
                    kid.changes.push_link(&pair.name, parent.link());
                }
            }
            AssocKind::BelongsTo => {
                return Err(Error::invalid_argument(format!(
                    "`{}.{name}` can't own the models it belongs to",
                    parent.ty.name
                )))
            }
        }

        queued.push(Queued {
            parent: index,
            relation: name,
            kind: relation.kind,
            children: kids,
        });
    }

    Ok(queued)
}

/// One `SUNION` over the link sets of every parent of a type in the batch.
struct ChildRead {
    parent: ModelId,
    child: Arc<ModelType>,
    slot: Slot,
}

/// The partners of one removed record across one many-to-many relation.
struct PartnerRead {
    owner: usize,
    partner: Arc<ModelType>,
    slot: Slot,
}

/// Reads queued ahead of a teardown, answered by the same pipeline.
#[derive(Default)]
pub(super) struct RemoveReads {
    children: Vec<ChildRead>,
    partners: Vec<PartnerRead>,
}

/// Dependents found by [`RemoveReads`].
#[derive(Default)]
pub(super) struct Dependents {
    /// `has_many` children to cascade to, grouped by the parent's type.
    pub(super) children: Vec<(ModelId, Arc<ModelType>, Vec<u64>)>,

    /// Many-to-many partners to unlink, by position of the removed record.
    pub(super) partners: Vec<(usize, Arc<ModelType>, Vec<u64>)>,
}

impl RemoveReads {
    /// Queue the dependent reads for `models[i]` for each `i` in `targets`.
    /// Must be pushed before the teardown commands of the same pipeline.
    pub(super) fn plan(
        schema: &Schema,
        models: &[Model],
        targets: &[usize],
        pipeline: &mut Pipeline,
    ) -> RemoveReads {
        let mut reads = RemoveReads::default();
        let mut unions: IndexMap<(ModelId, ModelId), (Arc<ModelType>, Vec<String>)> =
            IndexMap::new();

        for &i in targets {
            let model = &models[i];
            let Some(id) = model.id else {
                continue;
            };

            for relation in model.ty.relations_of_kind(AssocKind::HasMany) {
                let child = schema.target(relation);
                unions
                    .entry((model.ty.id, child.id))
                    .or_insert_with(|| (child.clone(), vec![]))
                    .1
                    .push(key::assoc(&model.ty.name, id, &child.name));
            }

            for relation in model.ty.many_to_many() {
                let partner = schema.target(relation);
                let slot = pipeline.push(Command::SMembers {
                    key: key::assoc(&model.ty.name, id, &partner.name),
                });
                reads.partners.push(PartnerRead {
                    owner: i,
                    partner: partner.clone(),
                    slot,
                });
            }
        }

        for ((parent, _), (child, keys)) in unions {
            let slot = pipeline.push(Command::SUnion { keys });
            reads.children.push(ChildRead {
                parent,
                child,
                slot,
            });
        }

        reads
    }

    pub(super) fn collect(self, replies: &mut Replies) -> Result<Dependents> {
        let mut dependents = Dependents::default();

        for read in self.children {
            let mut ids = replies.take(read.slot).into_ids()?;
            ids.sort_unstable();
            dependents.children.push((read.parent, read.child, ids));
        }

        for read in self.partners {
            let mut ids = replies.take(read.slot).into_ids()?;
            ids.sort_unstable();
            dependents.partners.push((read.owner, read.partner, ids));
        }

        Ok(dependents)
    }
}
