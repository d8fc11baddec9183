use super::query::{Condition, Filter, Query};

use biggie_core::{
    driver::{Command, ScoreBound},
    key::{self, Scope},
    schema::{ModelType, PropertyDef},
    Error, Result, Value,
};

use std::sync::Arc;

/// A compiled query.
#[derive(Clone, Default)]
pub(crate) struct Plan {
    /// One entry per indexed condition, holding the probes whose results
    /// are unioned. An entry with no probes matches nothing.
    pub(crate) probes: Vec<Vec<Command>>,

    /// Applied in-process to the materialized candidates.
    pub(crate) filters: Vec<Filter>,
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("probes", &self.probes)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Plan {
    /// Whether the plan reads the base set directly, with nothing to
    /// narrow or filter.
    pub(crate) fn is_scan(&self) -> bool {
        self.probes.is_empty() && self.filters.is_empty()
    }

    /// Whether some condition can never match.
    pub(crate) fn is_void(&self) -> bool {
        self.probes.iter().any(Vec::is_empty)
    }
}

/// Compile `query` for records of `ty` under `scope`. Performs no I/O.
pub(crate) fn plan(ty: &ModelType, scope: Scope<'_>, query: Query) -> Result<Plan> {
    let mut plan = Plan {
        probes: vec![],
        filters: query.filters,
    };

    for (name, condition) in query.conditions {
        let prop = ty.property(&name).ok_or_else(|| {
            Error::invalid_query(format!("model `{}` has no property `{name}`", ty.name))
        })?;

        if let Condition::Range(_) = condition {
            if !prop.is_numeric() {
                return Err(Error::invalid_query(format!(
                    "range on non-numeric property `{}.{name}`",
                    ty.name
                )));
            }
        }

        if ty.is_indexed(&name) {
            plan.probes.push(probes(prop, scope, &condition, &ty.name)?);
        } else {
            plan.filters.push(post_filter(prop, condition, &ty.name)?);
        }
    }

    Ok(plan)
}

fn cast(prop: &PropertyDef, value: &Value, ty: &str) -> Result<Value> {
    prop.ty.cast(value).ok_or_else(|| {
        Error::invalid_query(format!(
            "`{value}` is not a valid {} for `{ty}.{}`",
            prop.ty.name(),
            prop.name
        ))
    })
}

fn probes(prop: &PropertyDef, scope: Scope<'_>, condition: &Condition, ty: &str) -> Result<Vec<Command>> {
    let values = match condition {
        Condition::Range(range) => {
            return Ok(vec![Command::ZRangeByScore {
                key: key::index(scope, &prop.name),
                min: range.min,
                max: range.max,
            }])
        }
        Condition::Eq(value) => std::slice::from_ref(value),
        Condition::Any(values) => values.as_slice(),
    };

    values
        .iter()
        .map(|value| {
            let value = cast(prop, value, ty)?;
            Ok(match value.score() {
                Some(score) if prop.is_numeric() => Command::ZRangeByScore {
                    key: key::index(scope, &prop.name),
                    min: ScoreBound::Inclusive(score),
                    max: ScoreBound::Inclusive(score),
                },
                _ => Command::SMembers {
                    key: key::index_value(scope, &prop.name, &value.to_key_part()),
                },
            })
        })
        .collect()
}

fn post_filter(prop: &PropertyDef, condition: Condition, ty: &str) -> Result<Filter> {
    let name = prop.name.clone();

    Ok(match condition {
        Condition::Range(range) => Arc::new(move |model| {
            model
                .get(&name)
                .and_then(Value::score)
                .is_some_and(|score| range.contains(score))
        }),
        Condition::Eq(value) => {
            let value = cast(prop, &value, ty)?;
            Arc::new(move |model| model.get(&name) == Some(&value))
        }
        Condition::Any(values) => {
            let values = values
                .iter()
                .map(|value| cast(prop, value, ty))
                .collect::<Result<Vec<_>>>()?;
            Arc::new(move |model| model.get(&name).is_some_and(|v| values.contains(v)))
        }
    })
}
