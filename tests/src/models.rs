//! Model declarations shared by the suites.

use biggie::{ModelDef, Property, Value};

/// `kitten` below two years, `adult` from two on.
fn age_views(attrs: &biggie::Attributes) -> Vec<String> {
    match attrs.get("age").and_then(Value::as_i64) {
        Some(age) if age < 2 => vec!["kitten".into()],
        Some(_) => vec!["adult".into()],
        None => vec![],
    }
}

pub fn cat() -> ModelDef {
    ModelDef::new("cat")
        .property("name", Property::string().required())
        .property("age", Property::number())
        .property("color", Property::string())
        .index("name")
        .index("age")
        .views(["kitten", "adult"], age_views)
}

/// A cat owned by a person.
pub fn owned_cat() -> ModelDef {
    cat().belongs_to("person")
}

pub fn person() -> ModelDef {
    ModelDef::new("person")
        .property("name", Property::string())
        .property("email", Property::string().unique().validate("email", true))
        .has_many("cats")
}

/// A person holding exactly one passport.
pub fn passport_holder() -> ModelDef {
    ModelDef::new("person")
        .property("name", Property::string())
        .has_one("passport")
}

pub fn passport() -> ModelDef {
    ModelDef::new("passport")
        .property("number", Property::string().required())
        .belongs_to("person")
}

/// Articles and tags belong to each other.
pub fn article() -> ModelDef {
    ModelDef::new("article")
        .property("title", Property::string())
        .belongs_to("tag")
}

pub fn tag() -> ModelDef {
    ModelDef::new("tag")
        .property("label", Property::string().unique())
        .property("score", Property::number())
        .index("score")
        .belongs_to("article")
}

/// A tree: every node may have child nodes.
pub fn node() -> ModelDef {
    ModelDef::new("node")
        .property("label", Property::string())
        .index("label")
        .has_many("nodes")
        .belongs_to("node")
}
