use super::ModelId;

/// How a model relates to the target of one of its associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssocKind {
    /// The target holds this model's id; this model keeps a set of target
    /// ids (`assoc:this:id:target`) and scoped index/view copies.
    HasMany,

    /// This model keeps the single target's id in a `<target>_id` field.
    HasOne,

    /// This model keeps its parent's id in a `<parent>_id` field.
    BelongsTo,

    /// Both sides keep a link set of the other side's ids.
    ManyToMany,
}

/// Identifies a relation by the model it is declared on and its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationId {
    pub model: ModelId,
    pub index: usize,
}

impl RelationId {
    pub(crate) fn placeholder() -> RelationId {
        RelationId {
            model: ModelId(usize::MAX),
            index: usize::MAX,
        }
    }
}

/// A resolved association.
#[derive(Debug, Clone)]
pub struct Relation {
    /// The declared name: the target's plural for `has_many`, the target's
    /// type name otherwise.
    pub name: String,

    pub target: ModelId,

    pub kind: AssocKind,

    /// The relation on the target that describes the same link from the
    /// other side.
    pub pair: RelationId,
}

impl Relation {
    pub fn is_has_many(&self) -> bool {
        self.kind == AssocKind::HasMany
    }

    pub fn is_has_one(&self) -> bool {
        self.kind == AssocKind::HasOne
    }

    pub fn is_belongs_to(&self) -> bool {
        self.kind == AssocKind::BelongsTo
    }

    pub fn is_many_to_many(&self) -> bool {
        self.kind == AssocKind::ManyToMany
    }
}
