use super::{Command, Reply};
use crate::{Error, Result};

/// An ordered batch of commands flushed to the store in one round trip.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pipeline {
    commands: Vec<Command>,
}

/// The position of a command in its pipeline, used to pick its reply back
/// out of the batch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(usize);

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// Queue a command and return the slot its reply will land in.
    pub fn push(&mut self, command: Command) -> Slot {
        self.commands.push(command);
        Slot(self.commands.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Whether any queued command writes to the store.
    pub fn has_writes(&self) -> bool {
        self.commands.iter().any(Command::is_write)
    }
}

impl IntoIterator for Pipeline {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl FromIterator<Command> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Pipeline {
        Pipeline {
            commands: iter.into_iter().collect(),
        }
    }
}

/// The replies of one flushed pipeline, addressable by [`Slot`].
#[derive(Debug)]
pub struct Replies {
    replies: Vec<Reply>,
}

impl Replies {
    /// Pair a driver's batch result with the pipeline that produced it.
    pub fn new(pipeline_len: usize, replies: Vec<Reply>) -> Result<Replies> {
        if replies.len() != pipeline_len {
            return Err(Error::invalid_result(format!(
                "pipeline of {pipeline_len} commands produced {} replies",
                replies.len()
            )));
        }
        Ok(Replies { replies })
    }

    /// Take the reply of one command. Each slot can be taken once; taking
    /// it again yields `Nil`.
    pub fn take(&mut self, slot: Slot) -> Reply {
        self.replies
            .get_mut(slot.0)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}
