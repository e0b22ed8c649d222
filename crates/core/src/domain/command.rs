// Command Domain Model

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Label under which a command's captured output is keyed in a snapshot
pub type CommandLabel = String;

/// A single diagnostic command invocation (program + argv)
///
/// The output format of the program is opaque to envsnap; whatever the
/// command prints to stdout is captured verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub label: CommandLabel,
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(
        label: impl Into<String>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered mapping of command label to invocation.
///
/// Labels must be unique: they become the JSON keys of the snapshot.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<CommandSpec>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command to the table.
    ///
    /// # Errors
    /// - `DomainError::DuplicateLabel` if the label is already present
    pub fn insert(&mut self, spec: CommandSpec) -> Result<()> {
        if self.commands.iter().any(|c| c.label == spec.label) {
            return Err(DomainError::DuplicateLabel(spec.label));
        }
        self.commands.push(spec);
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
