//! Key binding table.
//!
//! Maps an exact [`Trigger`] (key plus modifier set) to the command line run
//! on key-down and, optionally, the line run on key-up.  Lookups are exact:
//! `ctrl+k` does not match a plain `k` binding and vice versa.
//!
//! The table stores lines verbatim.  Deriving the implicit key-up line of a
//! `+command` binding needs to know which commands exist, so that happens in
//! [`CommandRegistry::bind`](super::CommandRegistry::bind).

use std::collections::BTreeMap;

use super::keys::Trigger;
use super::tokenizer::{parse_command, split_commands};
use super::RegistryError;

/// One bound trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub trigger: Trigger,
    pub key_down: String,
    pub key_up: Option<String>,
}

impl Binding {
    /// `true` if either line runs `command` in any of its `&&` segments.
    pub fn invokes(&self, command: &str) -> bool {
        std::iter::once(self.key_down.as_str())
            .chain(self.key_up.as_deref())
            .flat_map(command_names)
            .any(|name| name == command)
    }
}

/// Derives the key-up line for a `+command` key-down line (`+fire x` gives
/// `-fire x`).  Whether `-fire` exists is up to the caller.
pub fn opposite_line(key_down: &str) -> Option<String> {
    key_down.strip_prefix('+').map(|rest| format!("-{rest}"))
}

/// Names of the commands a line runs, one per `&&` segment.  Segments that do
/// not tokenize are skipped.
pub fn command_names(line: &str) -> Vec<String> {
    split_commands(line)
        .iter()
        .filter_map(|segment| parse_command(segment).ok())
        .map(|(name, _)| name)
        .collect()
}

/// Trigger → binding map, at most one binding per trigger.
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    bindings: BTreeMap<Trigger, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `trigger`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateBinding`] if the trigger is already
    /// bound; call [`unbind`](Self::unbind) first to replace it.
    pub fn bind(
        &mut self,
        trigger: Trigger,
        key_down: impl Into<String>,
        key_up: Option<String>,
    ) -> Result<(), RegistryError> {
        if self.bindings.contains_key(&trigger) {
            return Err(RegistryError::DuplicateBinding(trigger.to_string()));
        }
        let key_down = key_down.into();
        self.bindings.insert(
            trigger,
            Binding {
                trigger,
                key_down,
                key_up,
            },
        );
        Ok(())
    }

    pub fn find(&self, trigger: &Trigger) -> Option<&Binding> {
        self.bindings.get(trigger)
    }

    /// Removes the binding for `trigger`; returns `false` if none existed.
    pub fn unbind(&mut self, trigger: &Trigger) -> bool {
        self.bindings.remove(trigger).is_some()
    }

    pub fn unbind_all(&mut self) {
        self.bindings.clear();
    }

    /// Removes every binding whose key-down or key-up line invokes `command`.
    ///
    /// Returns the number of bindings removed.
    pub fn unbind_command(&mut self, command: &str) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|_, b| !b.invokes(command));
        before - self.bindings.len()
    }

    /// Bindings whose display name starts with `prefix`, sorted by display name.
    pub fn list(&self, prefix: &str) -> Vec<&Binding> {
        let mut list: Vec<(String, &Binding)> = self
            .bindings
            .values()
            .map(|b| (b.trigger.to_string(), b))
            .filter(|(name, _)| name.starts_with(prefix))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list.into_iter().map(|(_, b)| b).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
