//! Name → handler table for the interactive session.
//!
//! Each registered command carries a handler tag `K` (a plain enum, so
//! dispatch stays data-driven) and a list of completion candidates for
//! its first argument.

use std::collections::BTreeMap;

use crate::errors::{CaskError, Result};

#[derive(Debug, Clone)]
struct Registered<K> {
    kind: K,
    candidates: Vec<String>,
}

/// A parsed command line matched to a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<K> {
    pub name: String,
    pub kind: K,
    pub args: Vec<String>,
}

/// The command table.
#[derive(Debug, Clone)]
pub struct Registry<K> {
    commands: BTreeMap<String, Registered<K>>,
}

impl<K> Default for Registry<K> {
    fn default() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }
}

impl<K: Copy> Registry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a command.
    pub fn register(&mut self, name: &str, candidates: Vec<String>, kind: K) {
        self.commands
            .insert(name.to_string(), Registered { kind, candidates });
    }

    /// Replace the completion candidates of a registered command.
    ///
    /// Returns `false` if no command of that name exists.
    pub fn set_candidates(&mut self, name: &str, candidates: Vec<String>) -> bool {
        match self.commands.get_mut(name) {
            Some(registered) => {
                registered.candidates = candidates;
                true
            }
            None => false,
        }
    }

    /// Completion candidates of a command (empty if unknown).
    pub fn candidates(&self, name: &str) -> &[String] {
        self.commands
            .get(name)
            .map_or(&[][..], |r| r.candidates.as_slice())
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Match a command line against the table.
    ///
    /// Returns `Ok(None)` for a blank line and `UnknownCommand` for a
    /// first word nobody registered.
    pub fn resolve(&self, line: &str) -> Result<Option<Invocation<K>>> {
        let mut words = split_line(line)?;
        if words.is_empty() {
            return Ok(None);
        }
        let name = words.remove(0);

        let registered = self
            .commands
            .get(&name)
            .ok_or_else(|| CaskError::UnknownCommand(name.clone()))?;

        Ok(Some(Invocation {
            name,
            kind: registered.kind,
            args: words,
        }))
    }

    /// Completions for a partially typed line.
    ///
    /// While the first word is being typed, command names are offered;
    /// after it, that command's candidates matching the word in progress.
    pub fn complete(&self, line: &str) -> Vec<String> {
        let trailing_space = line.ends_with(char::is_whitespace);
        let words: Vec<&str> = line.split_whitespace().collect();

        match (words.as_slice(), trailing_space) {
            ([], _) => self.names().map(str::to_string).collect(),
            ([partial], false) => self
                .names()
                .filter(|n| n.starts_with(partial))
                .map(str::to_string)
                .collect(),
            ([name], true) => self.candidates(name).to_vec(),
            ([name, partial], false) => self
                .candidates(name)
                .iter()
                .filter(|c| c.starts_with(partial))
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Split a command line into words.
///
/// Words are separated by whitespace; single or double quotes group a
/// word containing spaces, and a backslash escapes the next character.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (c, quote) {
            ('\\', _) => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| CaskError::Usage("line ends with a dangling '\\'".into()))?;
                current.push(escaped);
                in_word = true;
            }
            (q, None) if q == '"' || q == '\'' => {
                quote = Some(q);
                in_word = true;
            }
            (q, Some(open)) if q == open => quote = None,
            (ws, None) if ws.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (other, _) => {
                current.push(other);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(CaskError::Usage("unterminated quote".into()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
