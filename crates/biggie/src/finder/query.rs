use crate::Model;

use biggie_core::{driver::ScoreBound, Value};

use std::{fmt, sync::Arc};

/// An in-process predicate over materialized models.
pub type Filter = Arc<dyn Fn(&Model) -> bool + Send + Sync>;

/// A declarative query: property conditions, all of which must hold, plus
/// optional predicates.
///
/// ```
/// use biggie::{Query, Range};
///
/// let query = Query::new()
///     .eq("name", "Tinkerbell")
///     .range("age", Range::new().gt(3).lt(10));
/// ```
#[derive(Clone, Default)]
pub struct Query {
    pub(crate) conditions: Vec<(String, Condition)>,
    pub(crate) filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The property equals the value.
    Eq(Value),

    /// The property equals any of the values.
    Any(Vec<Value>),

    /// The numeric property lies within the range.
    Range(Range),
}

/// Bounds on a numeric property. Unset ends are open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub(crate) min: ScoreBound,
    pub(crate) max: ScoreBound,
}

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    /// A query matching every model `f` accepts.
    pub fn predicate(f: impl Fn(&Model) -> bool + Send + Sync + 'static) -> Query {
        Query::new().filter(f)
    }

    pub fn eq(self, property: impl Into<String>, value: impl Into<Value>) -> Query {
        self.condition(property, Condition::Eq(value.into()))
    }

    pub fn any<I, V>(self, property: impl Into<String>, values: I) -> Query
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.condition(property, Condition::Any(values))
    }

    pub fn range(self, property: impl Into<String>, range: Range) -> Query {
        self.condition(property, Condition::Range(range))
    }

    pub fn condition(mut self, property: impl Into<String>, condition: Condition) -> Query {
        self.conditions.push((property.into(), condition));
        self
    }

    pub fn filter(mut self, f: impl Fn(&Model) -> bool + Send + Sync + 'static) -> Query {
        self.filters.push(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.is_empty()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("conditions", &self.conditions)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Default for Range {
    fn default() -> Range {
        Range {
            min: ScoreBound::NegInf,
            max: ScoreBound::PosInf,
        }
    }
}

impl Range {
    pub fn new() -> Range {
        Range::default()
    }

    pub fn gt(mut self, value: impl Into<f64>) -> Range {
        self.min = ScoreBound::Exclusive(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<f64>) -> Range {
        self.min = ScoreBound::Inclusive(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<f64>) -> Range {
        self.max = ScoreBound::Exclusive(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<f64>) -> Range {
        self.max = ScoreBound::Inclusive(value.into());
        self
    }

    pub fn contains(&self, score: f64) -> bool {
        self.min.admits_from_below(score) && self.max.admits_from_above(score)
    }
}
