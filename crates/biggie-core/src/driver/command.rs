use std::fmt;

/// One store command.
///
/// Set and sorted-set members are always record ids.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Increment a counter and reply with the new value.
    Incr { key: String },

    HSet {
        key: String,
        field: String,
        value: Vec<u8>,
    },

    HMSet {
        key: String,
        fields: Vec<(String, Vec<u8>)>,
    },

    /// Reply with one entry per field, `Nil` for absent fields.
    HMGet { key: String, fields: Vec<String> },

    HDel { key: String, fields: Vec<String> },

    SAdd { key: String, member: u64 },

    SRem { key: String, member: u64 },

    SMembers { key: String },

    SUnion { keys: Vec<String> },

    SCard { key: String },

    ZAdd {
        key: String,
        score: f64,
        member: u64,
    },

    ZRem { key: String, member: u64 },

    ZRangeByScore {
        key: String,
        min: ScoreBound,
        max: ScoreBound,
    },

    Del { keys: Vec<String> },

    /// Numerically sort the members of a set, optionally paginated.
    Sort {
        key: String,
        offset: usize,
        count: Option<usize>,
        desc: bool,
    },
}

/// One end of a `ZRANGEBYSCORE` interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    NegInf,
    PosInf,
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    /// Whether `score` lies on the allowed side of this bound when it is
    /// used as the lower end of an interval.
    pub fn admits_from_below(&self, score: f64) -> bool {
        match *self {
            ScoreBound::NegInf => true,
            ScoreBound::PosInf => false,
            ScoreBound::Inclusive(min) => score >= min,
            ScoreBound::Exclusive(min) => score > min,
        }
    }

    /// Whether `score` lies on the allowed side of this bound when it is
    /// used as the upper end of an interval.
    pub fn admits_from_above(&self, score: f64) -> bool {
        match *self {
            ScoreBound::NegInf => false,
            ScoreBound::PosInf => true,
            ScoreBound::Inclusive(max) => score <= max,
            ScoreBound::Exclusive(max) => score < max,
        }
    }
}

impl fmt::Display for ScoreBound {
    /// Renders the bound in the store's native argument syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBound::NegInf => f.write_str("-inf"),
            ScoreBound::PosInf => f.write_str("+inf"),
            ScoreBound::Inclusive(v) => write!(f, "{v}"),
            ScoreBound::Exclusive(v) => write!(f, "({v}"),
        }
    }
}

impl Command {
    /// The command name as sent on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Incr { .. } => "INCR",
            Command::HSet { .. } => "HSET",
            Command::HMSet { .. } => "HMSET",
            Command::HMGet { .. } => "HMGET",
            Command::HDel { .. } => "HDEL",
            Command::SAdd { .. } => "SADD",
            Command::SRem { .. } => "SREM",
            Command::SMembers { .. } => "SMEMBERS",
            Command::SUnion { .. } => "SUNION",
            Command::SCard { .. } => "SCARD",
            Command::ZAdd { .. } => "ZADD",
            Command::ZRem { .. } => "ZREM",
            Command::ZRangeByScore { .. } => "ZRANGEBYSCORE",
            Command::Del { .. } => "DEL",
            Command::Sort { .. } => "SORT",
        }
    }

    /// Whether the command can modify the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Incr { .. }
                | Command::HSet { .. }
                | Command::HMSet { .. }
                | Command::HDel { .. }
                | Command::SAdd { .. }
                | Command::SRem { .. }
                | Command::ZAdd { .. }
                | Command::ZRem { .. }
                | Command::Del { .. }
        )
    }

    /// The first key the command touches.
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Incr { key }
            | Command::HSet { key, .. }
            | Command::HMSet { key, .. }
            | Command::HMGet { key, .. }
            | Command::HDel { key, .. }
            | Command::SAdd { key, .. }
            | Command::SRem { key, .. }
            | Command::SMembers { key }
            | Command::SCard { key }
            | Command::ZAdd { key, .. }
            | Command::ZRem { key, .. }
            | Command::ZRangeByScore { key, .. }
            | Command::Sort { key, .. } => Some(key),
            Command::SUnion { keys } | Command::Del { keys } => keys.first().map(String::as_str),
        }
    }
}

impl fmt::Display for Command {
    /// A redis-cli style rendering, used in logs and test assertions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;

        match self {
            Command::Incr { key }
            | Command::SMembers { key }
            | Command::SCard { key } => write!(f, " {key}"),
            Command::HSet { key, field, value } => {
                write!(f, " {key} {field} {}", String::from_utf8_lossy(value))
            }
            Command::HMSet { key, fields } => {
                write!(f, " {key}")?;
                for (field, value) in fields {
                    write!(f, " {field} {}", String::from_utf8_lossy(value))?;
                }
                Ok(())
            }
            Command::HMGet { key, fields } | Command::HDel { key, fields } => {
                write!(f, " {key}")?;
                for field in fields {
                    write!(f, " {field}")?;
                }
                Ok(())
            }
            Command::SAdd { key, member }
            | Command::SRem { key, member }
            | Command::ZRem { key, member } => write!(f, " {key} {member}"),
            Command::ZAdd { key, score, member } => write!(f, " {key} {score} {member}"),
            Command::ZRangeByScore { key, min, max } => write!(f, " {key} {min} {max}"),
            Command::SUnion { keys } | Command::Del { keys } => {
                for key in keys {
                    write!(f, " {key}")?;
                }
                Ok(())
            }
            Command::Sort {
                key,
                offset,
                count,
                desc,
            } => {
                write!(f, " {key}")?;
                if *offset > 0 || count.is_some() {
                    let count = count.map(|c| c as i64).unwrap_or(-1);
                    write!(f, " LIMIT {offset} {count}")?;
                }
                f.write_str(if *desc { " DESC" } else { " ASC" })
            }
        }
    }
}
