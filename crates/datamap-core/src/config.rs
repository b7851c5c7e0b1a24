// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Data client options.
//!
//! ```rust
//! use datamap_core::ClientOptions;
//!
//! let options: ClientOptions =
//!     serde_json::from_str(r#"{ "default_row_limit": 500, "name_map": { "full_name": "Name" } }"#).unwrap();
//! assert_eq!(options.default_row_limit, Some(500));
//! assert_eq!(options.member_for("FULL_NAME"), Some("Name"));
//! assert!(options.trim_strings);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Behavior switches of a [`DataClient`](crate::DataClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Row cap applied to queries that do not set their own.
    pub default_row_limit: Option<usize>,
    /// Result column name to member name overrides.
    pub name_map:          BTreeMap<String, String>,
    /// Trim surrounding whitespace from text cells.
    pub trim_strings:      bool,
    /// Emit a `debug!` event with the rendered text of every command.
    pub log_commands:      bool
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_row_limit: None,
            name_map:          BTreeMap::new(),
            trim_strings:      true,
            log_commands:      true
        }
    }
}

impl ClientOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every query at `limit` rows unless it sets its own.
    #[must_use]
    pub const fn row_limit(mut self, limit: usize) -> Self {
        self.default_row_limit = Some(limit);
        self
    }

    /// Read result column `column` into member `member`.
    #[must_use]
    pub fn map_column(mut self, column: impl Into<String>, member: impl Into<String>) -> Self {
        self.name_map.insert(column.into(), member.into());
        self
    }

    /// Enable or disable text trimming.
    #[must_use]
    pub const fn trim_strings(mut self, trim: bool) -> Self {
        self.trim_strings = trim;
        self
    }

    /// Enable or disable command logging.
    #[must_use]
    pub const fn log_commands(mut self, log: bool) -> Self {
        self.log_commands = log;
        self
    }

    /// Member override for result column `column`, ignoring ASCII case.
    pub fn member_for(&self, column: &str) -> Option<&str> {
        self.name_map
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, m)| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.default_row_limit, None);
        assert!(options.trim_strings);
        assert!(options.log_commands);
        assert!(options.name_map.is_empty());
    }

    #[test]
    fn builder_methods() {
        let options = ClientOptions::new()
            .row_limit(10)
            .map_column("full_name", "Name")
            .trim_strings(false)
            .log_commands(false);
        assert_eq!(options.default_row_limit, Some(10));
        assert_eq!(options.member_for("Full_Name"), Some("Name"));
        assert_eq!(options.member_for("age"), None);
        assert!(!options.trim_strings);
        assert!(!options.log_commands);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let options: ClientOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ClientOptions::default());
    }
}
