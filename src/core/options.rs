// src/core/options.rs

//! Commander-style option specs (`-p, --port <port>`) and the values parsed for them.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Long names owned by the CLI itself.
const RESERVED_LONG: &[&str] = &["help", "version", "cwd"];
/// Short names owned by the CLI itself.
const RESERVED_SHORT: &[char] = &['h', 'V'];

static FLAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn flag_pattern() -> &'static Regex {
    FLAG_PATTERN.get_or_init(|| {
        Regex::new(
            r"^\s*(?:-(?P<short>[A-Za-z0-9])\s*[,|]?\s*)?--(?P<long>[A-Za-z0-9][A-Za-z0-9-]*)(?:\s+(?P<open>[<\[])(?P<value>[A-Za-z0-9_-]+)[>\]])?\s*$",
        )
        .expect("flag pattern is a valid regex")
    })
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionSpecError {
    #[error("Option '{flag}' is not valid. Expected a form like '-p, --port <port>'.")]
    Malformed { flag: String },
    #[error("Option '{flag}' uses a name reserved by the CLI.")]
    Reserved { flag: String },
}

/// A parsed option declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Single-character alias (`-p`).
    pub short: Option<char>,
    /// Long name without dashes (`port`); also the key in [`ParsedOptions`].
    pub long: String,
    /// Placeholder name when the option takes a value.
    pub value_name: Option<String>,
    /// `<value>` requires a value, `[value]` makes it optional.
    pub value_required: bool,
}

impl OptionSpec {
    /// Parses a commander-style flag string.
    pub fn parse(flag: &str) -> Result<Self, OptionSpecError> {
        let caps = flag_pattern()
            .captures(flag)
            .ok_or_else(|| OptionSpecError::Malformed {
                flag: flag.to_string(),
            })?;

        let short = caps
            .name("short")
            .and_then(|m| m.as_str().chars().next());
        let long = caps
            .name("long")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| OptionSpecError::Malformed {
                flag: flag.to_string(),
            })?;

        if RESERVED_LONG.contains(&long.as_str())
            || short.is_some_and(|c| RESERVED_SHORT.contains(&c))
        {
            return Err(OptionSpecError::Reserved {
                flag: flag.to_string(),
            });
        }

        let value_name = caps.name("value").map(|m| m.as_str().to_string());
        let value_required = caps.name("open").is_some_and(|m| m.as_str() == "<");

        Ok(Self {
            short,
            long,
            value_name,
            value_required,
        })
    }

    /// Whether the option carries a value rather than being a plain switch.
    pub fn takes_value(&self) -> bool {
        self.value_name.is_some()
    }
}

/// Option values of one invocation, keyed by long name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    values: BTreeMap<String, String>,
    flags: BTreeSet<String>,
}

impl ParsedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value-carrying option.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Records a switch.
    pub fn with_flag(mut self, name: impl Into<String>) -> Self {
        self.flags.insert(name.into());
        self
    }

    /// The value given for `name`, if any.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether `name` was passed at all, as a switch or with a value.
    pub fn is_set(&self, name: &str) -> bool {
        self.flags.contains(name) || self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flags.is_empty()
    }
}
