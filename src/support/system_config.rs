//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Crymap.
//
// Crymap is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Crymap is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Crymap. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// Tunables for the message semantics layer.
///
/// This is normally embedded as a table in the server's own TOML
/// configuration. Every section is optional; an empty document yields the
/// defaults.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Limits applied when parsing a raw message into an `Entity` tree.
    #[serde(default)]
    pub parse: ParseConfig,

    /// Options for evaluating `SEARCH` criteria.
    #[serde(default)]
    pub search: SearchConfig,
}

impl SystemConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ParseConfig {
    /// The maximum nesting depth of multipart entities.
    ///
    /// Anything nested more deeply is treated as an opaque leaf.
    pub max_recursion: u32,

    /// The maximum number of parts, across all levels, that will be split out
    /// of a single message.
    pub max_parts: u32,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            max_recursion: 20,
            max_parts: 1000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// The maximum number of body bytes examined by `BODY` and `TEXT`
    /// predicates.
    ///
    /// This does not affect `LARGER` and `SMALLER`, which always use the
    /// exact size of the body.
    pub content_read_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            content_read_limit: 131072,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = SystemConfig::from_toml("").unwrap();
        assert_eq!(20, config.parse.max_recursion);
        assert_eq!(1000, config.parse.max_parts);
        assert_eq!(131072, config.search.content_read_limit);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SystemConfig::from_toml(
            "\
[parse]
max_recursion = 4

[search]
content_read_limit = 1024
",
        )
        .unwrap();
        assert_eq!(4, config.parse.max_recursion);
        assert_eq!(1000, config.parse.max_parts);
        assert_eq!(1024, config.search.content_read_limit);
    }

    #[test]
    fn bad_config_is_reported() {
        assert_matches!(
            Err(Error::Config(..)),
            SystemConfig::from_toml("[parse]\nmax_recursion = \"deep\"\n")
        );
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = SystemConfig::default();
        config.parse.max_parts = 12;
        let text = toml::to_string(&config).unwrap();
        let reparsed = SystemConfig::from_toml(&text).unwrap();
        assert_eq!(12, reparsed.parse.max_parts);
        assert_eq!(20, reparsed.parse.max_recursion);
    }
}
