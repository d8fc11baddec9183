//! Store key naming.
//!
//! The layout is fixed so data written by other clients of the same store
//! stays readable:
//!
//! | key                                   | kind       | holds                          |
//! |---------------------------------------|------------|--------------------------------|
//! | `type:id`                             | hash       | attributes                     |
//! | `collection:type`                     | set        | every id of the type           |
//! | `id:type`                             | string     | id counter                     |
//! | `index:type:prop`                     | sorted set | numeric index, scored by value |
//! | `index:type:prop:value`               | set        | ids holding `value`            |
//! | `view:type:view`                      | set        | ids in the view                |
//! | `assoc:parent:pid:child`              | set        | child ids of one parent        |
//!
//! Index and view keys can also be scoped under a parent
//! (`index:parent:pid:child:...`, `view:parent:pid:child:...`).

use std::fmt;

/// The prefix an index or view key is built under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// The type's own top-level structures.
    Type(&'a str),

    /// The copy maintained under one parent of a has-many association.
    Parent {
        parent: &'a str,
        id: u64,
        child: &'a str,
    },
}

impl<'a> Scope<'a> {
    pub fn parent(parent: &'a str, id: u64, child: &'a str) -> Scope<'a> {
        Scope::Parent { parent, id, child }
    }

    /// The type whose records the scoped structure holds.
    pub fn ty(&self) -> &'a str {
        match *self {
            Scope::Type(ty) => ty,
            Scope::Parent { child, .. } => child,
        }
    }
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Type(ty) => f.write_str(ty),
            Scope::Parent { parent, id, child } => write!(f, "{parent}:{id}:{child}"),
        }
    }
}

/// The attribute hash of one record.
pub fn record(ty: &str, id: u64) -> String {
    format!("{ty}:{id}")
}

/// The membership set of every id of a type.
pub fn collection(ty: &str) -> String {
    format!("collection:{ty}")
}

/// The id counter of a type.
pub fn counter(ty: &str) -> String {
    format!("id:{ty}")
}

/// The sorted set backing a numeric index.
pub fn index(scope: Scope<'_>, prop: &str) -> String {
    format!("index:{scope}:{prop}")
}

/// The per-value set backing a non-numeric index.
pub fn index_value(scope: Scope<'_>, prop: &str, value: &str) -> String {
    format!("index:{scope}:{prop}:{value}")
}

pub fn view(scope: Scope<'_>, view: &str) -> String {
    format!("view:{scope}:{view}")
}

/// The set of child ids linked to one parent.
pub fn assoc(parent: &str, id: u64, child: &str) -> String {
    format!("assoc:{parent}:{id}:{child}")
}

/// The hash field a has-one parent keeps its child's id in, and the field a
/// belongs-to child keeps its parent's id in.
pub fn foreign_key(ty: &str) -> String {
    format!("{ty}_id")
}
