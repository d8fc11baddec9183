use crate::{Error, Result};

/// The reply to one command.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Reply {
    #[default]
    Nil,

    /// Status reply (`+OK`).
    Ok,

    Int(i64),

    Bytes(Vec<u8>),

    Array(Vec<Reply>),
}

impl Reply {
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Interprets an integer reply.
    pub fn into_int(self) -> Result<i64> {
        match self {
            Reply::Int(v) => Ok(v),
            Reply::Bytes(bytes) => parse_int(&bytes),
            other => Err(Error::invalid_result(format!(
                "expected integer reply, got {other:?}"
            ))),
        }
    }

    /// Interprets an integer reply as a non-negative id.
    pub fn into_id(self) -> Result<u64> {
        let v = self.into_int()?;
        u64::try_from(v).map_err(|_| Error::invalid_result(format!("negative id {v}")))
    }

    pub fn into_array(self) -> Result<Vec<Reply>> {
        match self {
            Reply::Array(items) => Ok(items),
            Reply::Nil => Ok(vec![]),
            other => Err(Error::invalid_result(format!(
                "expected array reply, got {other:?}"
            ))),
        }
    }

    /// Interprets a multi-bulk reply of set members as record ids.
    pub fn into_ids(self) -> Result<Vec<u64>> {
        self.into_array()?
            .into_iter()
            .map(Reply::into_id)
            .collect()
    }

    /// Interprets an `HMGET` reply, one optional payload per requested field.
    pub fn into_fields(self) -> Result<Vec<Option<Vec<u8>>>> {
        self.into_array()?
            .into_iter()
            .map(|item| match item {
                Reply::Nil => Ok(None),
                Reply::Bytes(bytes) => Ok(Some(bytes)),
                Reply::Int(v) => Ok(Some(v.to_string().into_bytes())),
                other => Err(Error::invalid_result(format!(
                    "expected bulk reply for hash field, got {other:?}"
                ))),
            })
            .collect()
    }
}

fn parse_int(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            Error::invalid_result(format!(
                "expected integer, got {:?}",
                String::from_utf8_lossy(bytes)
            ))
        })
}

impl From<i64> for Reply {
    fn from(src: i64) -> Reply {
        Reply::Int(src)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(src: Vec<u8>) -> Reply {
        Reply::Bytes(src)
    }
}
