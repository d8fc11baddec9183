use crate::{Attributes, Value};

use futures::future::BoxFuture;
use regex::Regex;
use std::{fmt, sync::Arc, sync::LazyLock};

/// A named predicate attached to properties with `Property::validate`.
#[derive(Clone)]
pub enum Validator {
    /// Passes when the predicate's result equals the wanted flag.
    Sync(Arc<dyn Fn(&Value) -> bool + Send + Sync>),

    /// Called with the value, the wanted flag and a snapshot of the model's
    /// attributes. Resolves to `true` when the value is valid.
    Async(Arc<dyn Fn(Value, bool, Attributes) -> BoxFuture<'static, bool> + Send + Sync>),
}

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,4}\b").ok());

impl Validator {
    pub fn sync(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Validator {
        Validator::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Validator
    where
        F: Fn(Value, bool, Attributes) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = bool> + Send + 'static,
    {
        Validator::Async(Arc::new(move |value, want, attrs| Box::pin(f(value, want, attrs))))
    }

    /// The built-in `email` validator.
    pub fn email() -> Validator {
        Validator::sync(|value| match (value.as_str(), EMAIL.as_ref()) {
            (Some(s), Some(re)) => re.is_match(s),
            _ => false,
        })
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Validator::Async(_))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Validator::Sync(_) => "Validator::Sync",
            Validator::Async(_) => "Validator::Async",
        })
    }
}

/// A validator bound to one property.
#[derive(Debug, Clone)]
pub struct Check {
    /// Registered validator name, used in the `EVALID` message.
    pub name: String,

    /// The result the predicate must produce for the value to pass.
    pub want: bool,

    pub validator: Validator,
}
