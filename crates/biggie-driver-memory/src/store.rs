use biggie_core::{
    driver::{Command, Reply, ScoreBound},
    Error, Result,
};

use indexmap::IndexMap;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
};

/// One key's value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Entry {
    Str(Vec<u8>),
    Hash(IndexMap<String, Vec<u8>>),
    Set(BTreeSet<u64>),
    ZSet(HashMap<u64, f64>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Str(_) => "string",
            Entry::Hash(_) => "hash",
            Entry::Set(_) => "set",
            Entry::ZSet(_) => "zset",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Entry::Str(_) => false,
            Entry::Hash(fields) => fields.is_empty(),
            Entry::Set(members) => members.is_empty(),
            Entry::ZSet(members) => members.is_empty(),
        }
    }
}

/// A command hit a key holding another kind of value.
#[derive(Debug)]
pub(crate) struct WrongType {
    command: &'static str,
    key: String,
    found: &'static str,
}

impl std::error::Error for WrongType {}

impl fmt::Display for WrongType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WRONGTYPE {} against `{}` holding a {}",
            self.command, self.key, self.found
        )
    }
}

/// A counter holds something that isn't an integer.
#[derive(Debug)]
pub(crate) struct NotAnInteger {
    key: String,
}

impl std::error::Error for NotAnInteger {}

impl fmt::Display for NotAnInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value at `{}` is not an integer", self.key)
    }
}

fn member(id: u64) -> Reply {
    Reply::Bytes(id.to_string().into_bytes())
}

fn members(ids: impl IntoIterator<Item = u64>) -> Reply {
    Reply::Array(ids.into_iter().map(member).collect())
}

/// Keys and values, ordered by key so dumps are stable.
#[derive(Debug, Default)]
pub(crate) struct Store {
    entries: BTreeMap<String, Entry>,
}

impl Store {
    pub(crate) fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn wrong_type(command: &Command, key: &str, entry: &Entry) -> Error {
        Error::driver(WrongType {
            command: command.name(),
            key: key.to_string(),
            found: entry.kind(),
        })
    }

    fn hash(&self, command: &Command, key: &str) -> Result<Option<&IndexMap<String, Vec<u8>>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Hash(fields)) => Ok(Some(fields)),
            Some(other) => Err(Store::wrong_type(command, key, other)),
        }
    }

    fn hash_mut(&mut self, command: &Command, key: &str) -> Result<&mut IndexMap<String, Vec<u8>>> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(IndexMap::new()));
        match entry {
            Entry::Hash(fields) => Ok(fields),
            other => Err(Store::wrong_type(command, key, other)),
        }
    }

    fn set(&self, command: &Command, key: &str) -> Result<Option<&BTreeSet<u64>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Set(members)) => Ok(Some(members)),
            Some(other) => Err(Store::wrong_type(command, key, other)),
        }
    }

    fn set_mut(&mut self, command: &Command, key: &str) -> Result<&mut BTreeSet<u64>> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        match entry {
            Entry::Set(members) => Ok(members),
            other => Err(Store::wrong_type(command, key, other)),
        }
    }

    fn zset(&self, command: &Command, key: &str) -> Result<Option<&HashMap<u64, f64>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::ZSet(members)) => Ok(Some(members)),
            Some(other) => Err(Store::wrong_type(command, key, other)),
        }
    }

    fn zset_mut(&mut self, command: &Command, key: &str) -> Result<&mut HashMap<u64, f64>> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::ZSet(HashMap::new()));
        match entry {
            Entry::ZSet(members) => Ok(members),
            other => Err(Store::wrong_type(command, key, other)),
        }
    }

    /// Drop the key when its container became empty.
    fn prune(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(Entry::is_empty) {
            self.entries.remove(key);
        }
    }

    /// Apply one command.
    pub(crate) fn apply(&mut self, command: &Command) -> Result<Reply> {
        let reply = match command {
            Command::Incr { key } => {
                let current = match self.entries.get(key) {
                    None => 0,
                    Some(Entry::Str(bytes)) => std::str::from_utf8(bytes)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or_else(|| Error::driver(NotAnInteger { key: key.clone() }))?,
                    Some(other) => return Err(Store::wrong_type(command, key, other)),
                };
                let next = current + 1;
                self.entries
                    .insert(key.clone(), Entry::Str(next.to_string().into_bytes()));
                Reply::Int(next)
            }
            Command::HSet { key, field, value } => {
                let fields = self.hash_mut(command, key)?;
                let added = fields.insert(field.clone(), value.clone()).is_none();
                Reply::Int(added as i64)
            }
            Command::HMSet { key, fields } => {
                let hash = self.hash_mut(command, key)?;
                for (field, value) in fields {
                    hash.insert(field.clone(), value.clone());
                }
                self.prune(key);
                Reply::Ok
            }
            Command::HMGet { key, fields } => {
                let hash = self.hash(command, key)?;
                Reply::Array(
                    fields
                        .iter()
                        .map(|field| match hash.and_then(|hash| hash.get(field)) {
                            Some(value) => Reply::Bytes(value.clone()),
                            None => Reply::Nil,
                        })
                        .collect(),
                )
            }
            Command::HDel { key, fields } => {
                let mut removed = 0;
                if self.hash(command, key)?.is_some() {
                    let hash = self.hash_mut(command, key)?;
                    removed = fields
                        .iter()
                        .filter(|field| hash.shift_remove(*field).is_some())
                        .count();
                }
                self.prune(key);
                Reply::Int(removed as i64)
            }
            Command::SAdd { key, member } => {
                let added = self.set_mut(command, key)?.insert(*member);
                Reply::Int(added as i64)
            }
            Command::SRem { key, member } => {
                let removed =
                    self.set(command, key)?.is_some() && self.set_mut(command, key)?.remove(member);
                self.prune(key);
                Reply::Int(removed as i64)
            }
            Command::SMembers { key } => {
                let ids = self.set(command, key)?.cloned().unwrap_or_default();
                members(ids)
            }
            Command::SUnion { keys } => {
                let mut union = BTreeSet::new();
                for key in keys {
                    if let Some(ids) = self.set(command, key)? {
                        union.extend(ids.iter().copied());
                    }
                }
                members(union)
            }
            Command::SCard { key } => {
                let len = self.set(command, key)?.map_or(0, BTreeSet::len);
                Reply::Int(len as i64)
            }
            Command::ZAdd { key, score, member } => {
                let added = self.zset_mut(command, key)?.insert(*member, *score).is_none();
                Reply::Int(added as i64)
            }
            Command::ZRem { key, member } => {
                let removed = self.zset(command, key)?.is_some()
                    && self.zset_mut(command, key)?.remove(member).is_some();
                self.prune(key);
                Reply::Int(removed as i64)
            }
            Command::ZRangeByScore { key, min, max } => {
                let mut hits: Vec<(u64, f64)> = self
                    .zset(command, key)?
                    .map(|zset| {
                        zset.iter()
                            .filter(|(_, score)| in_range(**score, min, max))
                            .map(|(member, score)| (*member, *score))
                            .collect()
                    })
                    .unwrap_or_default();
                hits.sort_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(Ordering::Equal)
                        .then(a.0.cmp(&b.0))
                });
                members(hits.into_iter().map(|(member, _)| member))
            }
            Command::Del { keys } => {
                let removed = keys
                    .iter()
                    .filter(|key| self.entries.remove(*key).is_some())
                    .count();
                Reply::Int(removed as i64)
            }
            Command::Sort {
                key,
                offset,
                count,
                desc,
            } => {
                let mut ids: Vec<u64> = match self.entries.get(key) {
                    None => vec![],
                    Some(Entry::Set(ids)) => ids.iter().copied().collect(),
                    Some(Entry::ZSet(ids)) => ids.keys().copied().collect(),
                    Some(other) => return Err(Store::wrong_type(command, key, other)),
                };
                ids.sort_unstable();
                if *desc {
                    ids.reverse();
                }
                let ids = ids.into_iter().skip(*offset);
                match count {
                    Some(count) => members(ids.take(*count)),
                    None => members(ids),
                }
            }
        };

        Ok(reply)
    }
}

fn in_range(score: f64, min: &ScoreBound, max: &ScoreBound) -> bool {
    min.admits_from_below(score) && max.admits_from_above(score)
}
