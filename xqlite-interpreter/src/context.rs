use tracing::trace;

use crate::error::{Error, Result};
use crate::sequence::Sequence;

#[derive(Debug, Clone)]
enum Entry {
    Scope,
    Binding { name: String, value: Sequence },
}

/// Variable bindings, innermost last.
///
/// Scope markers delimit the bindings introduced by one `let`, `for` or
/// `some`; lookups see through them so inner scopes read outer bindings.
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    entries: Vec<Entry>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_scope(&mut self) {
        self.entries.push(Entry::Scope);
        trace!(depth = self.scopes(), "open scope");
    }

    /// Pop every binding of the innermost scope, and the scope itself.
    pub fn close_scope(&mut self) {
        trace!(depth = self.scopes(), "close scope");
        while let Some(entry) = self.entries.pop() {
            if let Entry::Scope = entry {
                return;
            }
        }
    }

    pub fn push_var(&mut self, name: impl Into<String>, value: Sequence) {
        let name = name.into();
        trace!(%name, len = value.len(), "bind");
        self.entries.push(Entry::Binding { name, value });
    }

    /// Pop the most recent binding. Returns `None` and leaves the stack
    /// alone if the innermost entry is a scope marker.
    pub fn pop_var(&mut self) -> Option<(String, Sequence)> {
        match self.entries.last() {
            Some(Entry::Binding { .. }) => match self.entries.pop() {
                Some(Entry::Binding { name, value }) => Some((name, value)),
                _ => None,
            },
            _ => None,
        }
    }

    /// The nearest binding for `name`.
    pub fn find_var(&self, name: &str) -> Result<&Sequence> {
        self.entries
            .iter()
            .rev()
            .find_map(|entry| match entry {
                Entry::Binding { name: n, value } if n == name => Some(value),
                _ => None,
            })
            .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
    }

    /// Number of open scopes.
    pub fn scopes(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, Entry::Scope))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
