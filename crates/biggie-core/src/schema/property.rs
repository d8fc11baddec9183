use super::{Check, Type};

/// Declares one property of a model.
///
/// ```
/// use biggie_core::schema::Property;
///
/// let email = Property::string().required().unique().validate("email", true);
/// ```
#[derive(Debug, Clone)]
pub struct Property {
    pub(super) ty: String,
    pub(super) required: bool,
    pub(super) unique: bool,
    pub(super) checks: Vec<(String, bool)>,
}

impl Property {
    /// A property of a built-in or registered type, by type name.
    pub fn of(ty: impl Into<String>) -> Property {
        Property {
            ty: ty.into(),
            required: false,
            unique: false,
            checks: vec![],
        }
    }

    pub fn number() -> Property {
        Property::of("number")
    }

    pub fn string() -> Property {
        Property::of("string")
    }

    pub fn binary() -> Property {
        Property::of("binary")
    }

    pub fn boolean() -> Property {
        Property::of("boolean")
    }

    pub fn required(mut self) -> Property {
        self.required = true;
        self
    }

    /// No two records of the type may hold the same value. Unique
    /// properties are always indexed.
    pub fn unique(mut self) -> Property {
        self.unique = true;
        self
    }

    /// Run the registered validator `name`; the value passes when the
    /// validator's verdict equals `want`.
    pub fn validate(mut self, name: impl Into<String>, want: bool) -> Property {
        self.checks.push((name.into(), want));
        self
    }
}

/// A property after registration, with its type and validators resolved.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub ty: Type,
    pub required: bool,
    pub unique: bool,
    pub checks: Vec<Check>,
}

impl PropertyDef {
    /// A numeric, optional property with no validators. Used for the
    /// foreign keys added by associations.
    pub(super) fn foreign_key(name: String) -> PropertyDef {
        PropertyDef {
            name,
            ty: Type::Number,
            required: false,
            unique: false,
            checks: vec![],
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.ty.is_numeric()
    }
}
