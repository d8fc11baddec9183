use super::{
    AssocKind, Caster, Check, ModelDef, ModelId, ModelType, PropertyDef, Relation, RelationId,
    Schema, Type, Validator,
};
use crate::{key, Error, Result};

use indexmap::{IndexMap, IndexSet};
use std::{collections::HashSet, sync::Arc};

/// Collects model declarations, validators and property types, then
/// resolves them into a [`Schema`].
#[derive(Debug, Clone)]
pub struct Builder {
    models: Vec<ModelDef>,
    validators: IndexMap<String, Validator>,
    types: IndexMap<String, CasterEntry>,
}

#[derive(Clone)]
struct CasterEntry(Caster);

impl std::fmt::Debug for CasterEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Caster")
    }
}

/// A relation as declared, before pairing.
struct Declared {
    name: String,
    target: ModelId,
    kind: AssocKind,
}

/// State while the schema is being resolved.
struct BuildSchema<'a> {
    builder: &'a Builder,
    by_name: IndexMap<String, ModelId>,
    by_plural: IndexMap<String, ModelId>,
    plurals: Vec<String>,
    relations: Vec<Vec<Relation>>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        let mut validators = IndexMap::new();
        validators.insert("email".to_string(), Validator::email());

        Builder {
            models: vec![],
            validators,
            types: IndexMap::new(),
        }
    }

    pub fn register(&mut self, model: ModelDef) -> &mut Self {
        self.models.push(model);
        self
    }

    /// Register a named validator, replacing any earlier one with the same
    /// name (including the built-in `email`).
    pub fn validator(&mut self, name: impl Into<String>, validator: Validator) -> &mut Self {
        self.validators.insert(name.into(), validator);
        self
    }

    /// Register a custom property type.
    pub fn property_type(
        &mut self,
        name: impl Into<String>,
        caster: impl Fn(&crate::Value) -> Option<crate::Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.types.insert(name.into(), CasterEntry(Arc::new(caster)));
        self
    }

    pub fn build(&self) -> Result<Schema> {
        let mut cx = BuildSchema {
            builder: self,
            by_name: IndexMap::new(),
            by_plural: IndexMap::new(),
            plurals: vec![],
            relations: vec![],
        };

        cx.register_names()?;
        let declared = cx.declare_relations()?;
        cx.link_relations(declared)?;

        let models = self
            .models
            .iter()
            .enumerate()
            .map(|(i, def)| cx.build_model(ModelId(i), def))
            .collect::<Result<Vec<_>>>()?;

        Ok(Schema {
            models,
            by_name: cx.by_name,
            by_plural: cx.by_plural,
        })
    }

    fn resolve_type(&self, name: &str) -> Option<Type> {
        Type::builtin(name).or_else(|| {
            self.types.get(name).map(|entry| Type::Custom {
                name: name.to_string(),
                caster: entry.0.clone(),
            })
        })
    }
}

impl BuildSchema<'_> {
    fn register_names(&mut self) -> Result<()> {
        for (i, def) in self.builder.models.iter().enumerate() {
            let id = ModelId(i);

            if def.name.is_empty() || def.name.contains(':') {
                return Err(Error::invalid_schema(format!(
                    "model name `{}` is empty or contains `:`",
                    def.name
                )));
            }

            if self.by_name.insert(def.name.clone(), id).is_some() {
                return Err(Error::invalid_schema(format!(
                    "model `{}` is registered more than once",
                    def.name
                )));
            }

            let plural = match &def.plural {
                Some(plural) => plural.clone(),
                None => pluralizer::pluralize(&def.name, 2, false),
            };

            if let Some(other) = self.by_plural.insert(plural.clone(), id) {
                return Err(Error::invalid_schema(format!(
                    "models `{}` and `{}` share the plural `{plural}`",
                    self.builder.models[other.0].name, def.name
                )));
            }

            self.plurals.push(plural);
        }

        Ok(())
    }

    fn declare_relations(&self) -> Result<Vec<Vec<Declared>>> {
        let mut declared = vec![];

        for def in &self.builder.models {
            let mut rels = vec![];

            for plural in &def.has_many {
                let target = self
                    .by_plural
                    .get(plural)
                    .or_else(|| self.by_name.get(plural))
                    .copied()
                    .ok_or_else(|| unregistered(def, "has_many", plural))?;
                rels.push(Declared {
                    name: plural.clone(),
                    target,
                    kind: AssocKind::HasMany,
                });
            }

            for (names, kind) in [
                (&def.has_one, AssocKind::HasOne),
                (&def.belongs_to, AssocKind::BelongsTo),
            ] {
                for name in names {
                    let target = self
                        .by_name
                        .get(name)
                        .copied()
                        .ok_or_else(|| unregistered(def, kind_name(kind), name))?;
                    rels.push(Declared {
                        name: name.clone(),
                        target,
                        kind,
                    });
                }
            }

            let mut seen = HashSet::new();
            for rel in &rels {
                if !seen.insert(&rel.name) {
                    return Err(Error::invalid_schema(format!(
                        "model `{}` declares the association `{}` twice",
                        def.name, rel.name
                    )));
                }
            }

            declared.push(rels);
        }

        Ok(declared)
    }

    /// Resolve every declared relation into its final kind and link it with
    /// its pair on the target model.
    fn link_relations(&mut self, declared: Vec<Vec<Declared>>) -> Result<()> {
        // Two distinct types that belong to each other form a many-to-many
        // pair. Every relation between them takes that kind.
        let mut m2m = HashSet::new();
        for (a, rels) in declared.iter().enumerate() {
            for rel in rels.iter().filter(|rel| rel.kind == AssocKind::BelongsTo) {
                let b = rel.target.0;
                let mutual = a != b
                    && declared[b]
                        .iter()
                        .any(|other| other.kind == AssocKind::BelongsTo && other.target.0 == a);
                if mutual {
                    m2m.insert((a.min(b), a.max(b)));
                }
            }
        }

        self.relations = declared
            .into_iter()
            .enumerate()
            .map(|(a, rels)| {
                rels.into_iter()
                    .map(|rel| {
                        let b = rel.target.0;
                        let kind = if m2m.contains(&(a.min(b), a.max(b))) {
                            AssocKind::ManyToMany
                        } else {
                            rel.kind
                        };
                        Relation {
                            name: rel.name,
                            target: rel.target,
                            kind,
                            pair: RelationId::placeholder(),
                        }
                    })
                    .collect()
            })
            .collect();

        // Pair each has_many / has_one with the single belongs_to on the
        // target that points back.
        for a in 0..self.relations.len() {
            for i in 0..self.relations[a].len() {
                let rel = &self.relations[a][i];
                if !matches!(rel.kind, AssocKind::HasMany | AssocKind::HasOne) {
                    continue;
                }
                let b = rel.target.0;

                let candidates: Vec<usize> = self.relations[b]
                    .iter()
                    .enumerate()
                    .filter(|(_, other)| other.is_belongs_to() && other.target.0 == a)
                    .map(|(j, _)| j)
                    .collect();

                let j = match candidates[..] {
                    [j] => j,
                    [] => {
                        return Err(Error::invalid_schema(format!(
                            "`{}.{}` has no matching `belongs_to` on `{}`",
                            self.builder.models[a].name,
                            rel.name,
                            self.builder.models[b].name,
                        )))
                    }
                    _ => {
                        return Err(Error::invalid_schema(format!(
                            "`{}.{}` matches more than one `belongs_to` on `{}`",
                            self.builder.models[a].name,
                            rel.name,
                            self.builder.models[b].name,
                        )))
                    }
                };

                if self.relations[b][j].pair != RelationId::placeholder() {
                    return Err(Error::invalid_schema(format!(
                        "`{}` belongs to `{}` through more than one `has_many`/`has_one`",
                        self.builder.models[b].name, self.builder.models[a].name,
                    )));
                }

                self.relations[a][i].pair = RelationId {
                    model: ModelId(b),
                    index: j,
                };
                self.relations[b][j].pair = RelationId {
                    model: ModelId(a),
                    index: i,
                };
            }
        }

        // Many-to-many relations pair with the first many-to-many relation
        // on the partner that points back; every belongs_to left must have
        // been claimed above.
        for a in 0..self.relations.len() {
            for i in 0..self.relations[a].len() {
                let rel = &self.relations[a][i];
                match rel.kind {
                    AssocKind::ManyToMany => {
                        let b = rel.target.0;
                        let j = self.relations[b]
                            .iter()
                            .position(|other| other.is_many_to_many() && other.target.0 == a)
                            .ok_or_else(|| {
                                Error::invalid_schema(format!(
                                    "`{}.{}` has no reciprocal association on `{}`",
                                    self.builder.models[a].name,
                                    rel.name,
                                    self.builder.models[b].name,
                                ))
                            })?;
                        self.relations[a][i].pair = RelationId {
                            model: ModelId(b),
                            index: j,
                        };
                    }
                    AssocKind::BelongsTo if rel.pair == RelationId::placeholder() => {
                        return Err(Error::invalid_schema(format!(
                            "`{}` belongs to `{}` but `{}` declares no `has_many` or `has_one` for it",
                            self.builder.models[a].name,
                            rel.name,
                            rel.name,
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn build_model(&self, id: ModelId, def: &ModelDef) -> Result<Arc<ModelType>> {
        let mut properties = IndexMap::new();

        for (name, prop) in &def.properties {
            let ty = self.builder.resolve_type(&prop.ty).ok_or_else(|| {
                Error::invalid_schema(format!(
                    "property `{}.{name}` has unknown type `{}`",
                    def.name, prop.ty
                ))
            })?;

            let checks = prop
                .checks
                .iter()
                .map(|(check, want)| {
                    let validator = self.builder.validators.get(check).ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "property `{}.{name}` uses unregistered validator `{check}`",
                            def.name
                        ))
                    })?;
                    Ok(Check {
                        name: check.clone(),
                        want: *want,
                        validator: validator.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            properties.insert(
                name.clone(),
                PropertyDef {
                    name: name.clone(),
                    ty,
                    required: prop.required,
                    unique: prop.unique,
                    checks,
                },
            );
        }

        let relations = self.relations[id.0].clone();

        // has_one parents and belongs_to children carry the other side's id.
        for rel in &relations {
            if !matches!(rel.kind, AssocKind::HasOne | AssocKind::BelongsTo) {
                continue;
            }
            let fk = key::foreign_key(&self.builder.models[rel.target.0].name);
            match properties.get(&fk) {
                Some(existing) if !existing.is_numeric() => {
                    return Err(Error::invalid_schema(format!(
                        "property `{}.{fk}` holds an association id and must be a number",
                        def.name
                    )));
                }
                Some(_) => {}
                None => {
                    properties.insert(fk.clone(), PropertyDef::foreign_key(fk));
                }
            }
        }

        let mut indexes = IndexSet::new();
        for index in &def.indexes {
            if !properties.contains_key(index) {
                return Err(Error::invalid_schema(format!(
                    "index on `{}.{index}` names an undeclared property",
                    def.name
                )));
            }
            indexes.insert(index.clone());
        }
        for prop in properties.values().filter(|prop| prop.unique) {
            indexes.insert(prop.name.clone());
        }

        if def.view_fn.is_some() && def.views.is_empty() {
            return Err(Error::invalid_schema(format!(
                "model `{}` has a view callback but declares no views",
                def.name
            )));
        }

        Ok(Arc::new(ModelType {
            id,
            name: def.name.clone(),
            plural: self.plurals[id.0].clone(),
            properties,
            indexes,
            views: def.views.clone(),
            view_fn: def.view_fn.clone(),
            relations,
        }))
    }
}

fn kind_name(kind: AssocKind) -> &'static str {
    match kind {
        AssocKind::HasMany => "has_many",
        AssocKind::HasOne => "has_one",
        AssocKind::BelongsTo => "belongs_to",
        AssocKind::ManyToMany => "many_to_many",
    }
}

fn unregistered(def: &ModelDef, kind: &str, name: &str) -> Error {
    Error::invalid_schema(format!(
        "`{}.{kind}({name})` references a model that was not registered; \
         did you forget to register it with `Db::builder()`?",
        def.name
    ))
}
