use biggie_core::{
    async_trait,
    driver::{Command, Driver, Pipeline, Reply},
    Error, Result,
};

use redis::{aio::MultiplexedConnection, Client};
use tracing::{debug, warn};

/// A driver backed by a Redis server.
///
/// Each pipeline is sent as one `MULTI`/`EXEC` block.
#[derive(Clone)]
pub struct Redis {
    /// The multiplexed connection. Clones share the underlying socket.
    conn: MultiplexedConnection,
}

impl Redis {
    /// Initialize a driver using an established connection.
    pub fn new(conn: MultiplexedConnection) -> Redis {
        Redis { conn }
    }

    /// Connects to a Redis server using a `redis://` url.
    pub async fn connect(url: &str) -> Result<Redis> {
        let client = Client::open(url).map_err(Error::driver)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(Error::driver)?;
        debug!(%url, "connected");
        Ok(Redis::new(conn))
    }
}

impl std::fmt::Debug for Redis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redis").finish_non_exhaustive()
    }
}

#[async_trait]
impl Driver for Redis {
    async fn exec(&self, pipeline: Pipeline) -> Result<Vec<Reply>> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in pipeline.commands() {
            pipe.add_command(encode(command));
        }

        let mut conn = self.conn.clone();
        let values: Vec<redis::Value> = pipe.query_async(&mut conn).await.map_err(Error::driver)?;
        values.into_iter().map(decode).collect()
    }

    async fn reset(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(Error::driver)?;
        Ok(())
    }
}

fn encode(command: &Command) -> redis::Cmd {
    let mut cmd = redis::cmd(command.name());

    match command {
        Command::Incr { key }
        | Command::SMembers { key }
        | Command::SCard { key } => {
            cmd.arg(key);
        }
        Command::HSet { key, field, value } => {
            cmd.arg(key).arg(field).arg(value);
        }
        Command::HMSet { key, fields } => {
            cmd.arg(key);
            for (field, value) in fields {
                cmd.arg(field).arg(value);
            }
        }
        Command::HMGet { key, fields } | Command::HDel { key, fields } => {
            cmd.arg(key).arg(fields);
        }
        Command::SAdd { key, member }
        | Command::SRem { key, member }
        | Command::ZRem { key, member } => {
            cmd.arg(key).arg(*member);
        }
        Command::ZAdd { key, score, member } => {
            cmd.arg(key).arg(*score).arg(*member);
        }
        Command::ZRangeByScore { key, min, max } => {
            cmd.arg(key).arg(min.to_string()).arg(max.to_string());
        }
        Command::SUnion { keys } | Command::Del { keys } => {
            cmd.arg(keys);
        }
        Command::Sort {
            key,
            offset,
            count,
            desc,
        } => {
            cmd.arg(key);
            if *offset > 0 || count.is_some() {
                let count = count.map(|count| count as i64).unwrap_or(-1);
                cmd.arg("LIMIT").arg(*offset).arg(count);
            }
            cmd.arg(if *desc { "DESC" } else { "ASC" });
        }
    }

    cmd
}

fn decode(value: redis::Value) -> Result<Reply> {
    Ok(match value {
        redis::Value::Nil => Reply::Nil,
        redis::Value::Okay => Reply::Ok,
        redis::Value::Int(v) => Reply::Int(v),
        redis::Value::BulkString(bytes) => Reply::Bytes(bytes),
        redis::Value::SimpleString(s) if s == "OK" => Reply::Ok,
        redis::Value::SimpleString(s) => Reply::Bytes(s.into_bytes()),
        redis::Value::Array(items) | redis::Value::Set(items) => {
            Reply::Array(items.into_iter().map(decode).collect::<Result<_>>()?)
        }
        other => {
            warn!(reply = ?other, "unexpected reply shape");
            return Err(Error::invalid_result(format!(
                "unsupported redis reply {other:?}"
            )));
        }
    })
}
