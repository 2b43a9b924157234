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

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::mime::fetch::search::OptionalSearchParts;
use crate::support::error::Error;

/// A message flag.
///
/// System flags are represented as top-level enum values. Keywords are in the
/// `Keyword` case.
///
/// The `Display` format of this type is the exact string value that would be
/// sent over the wire. `FromStr` does the reverse conversion, and also
/// understands non-standard casing of the system flags.
///
/// Keywords compare case-sensitively.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    Answered,
    Deleted,
    Draft,
    Flagged,
    Seen,
    /// `\Recent`. This is never stored by clients, but the command layer
    /// reports it alongside the real flags of a message.
    Recent,
    Keyword(String),
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Flag::Answered => write!(f, "\\Answered"),
            &Flag::Deleted => write!(f, "\\Deleted"),
            &Flag::Draft => write!(f, "\\Draft"),
            &Flag::Flagged => write!(f, "\\Flagged"),
            &Flag::Seen => write!(f, "\\Seen"),
            &Flag::Recent => write!(f, "\\Recent"),
            &Flag::Keyword(ref kw) => write!(f, "{}", kw),
        }
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <Flag as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.eq_ignore_ascii_case("\\answered") {
            Ok(Flag::Answered)
        } else if s.eq_ignore_ascii_case("\\deleted") {
            Ok(Flag::Deleted)
        } else if s.eq_ignore_ascii_case("\\draft") {
            Ok(Flag::Draft)
        } else if s.eq_ignore_ascii_case("\\flagged") {
            Ok(Flag::Flagged)
        } else if s.eq_ignore_ascii_case("\\seen") {
            Ok(Flag::Seen)
        } else if s.eq_ignore_ascii_case("\\recent") {
            Ok(Flag::Recent)
        } else if s.starts_with('\\') {
            Err(Error::NxFlag)
        } else if !s.is_empty() && s.bytes().all(is_atom_char) {
            Ok(Flag::Keyword(s.to_owned()))
        } else {
            Err(Error::UnsafeName)
        }
    }
}

fn is_atom_char(ch: u8) -> bool {
    match ch {
        0..=b' ' => false,
        127..=255 => false,
        b'(' | b')' | b'{' | b'*' | b'%' | b'\\' | b'"' | b']' => false,
        _ => true,
    }
}

/// How a `STORE` command changes the flags of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreOp {
    /// `FLAGS`: replace the flags outright.
    Set,
    /// `+FLAGS`
    Add,
    /// `-FLAGS`
    Remove,
}

/// The data item name of a `STORE` command, e.g., `+FLAGS.SILENT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreItem {
    pub op: StoreOp,
    /// Whether the untagged `FETCH` responses are suppressed.
    pub silent: bool,
}

impl FromStr for StoreItem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let (base, silent) = match s.len().checked_sub(7) {
            Some(split)
                if s.is_char_boundary(split)
                    && s[split..].eq_ignore_ascii_case(".silent") =>
            {
                (&s[..split], true)
            },
            _ => (s, false),
        };

        let op = if base.eq_ignore_ascii_case("flags") {
            StoreOp::Set
        } else if base.eq_ignore_ascii_case("+flags") {
            StoreOp::Add
        } else if base.eq_ignore_ascii_case("-flags") {
            StoreOp::Remove
        } else {
            return Err(Error::BadStoreOperation);
        };

        Ok(StoreItem { op, silent })
    }
}

bitflags! {
    /// The flag-presence predicates of a `SearchCriteria` node.
    ///
    /// Every set bit is a separate condition; all of them must hold.
    #[derive(Default)]
    pub struct FlagCriteria: u32 {
        const ANSWERED = 1 << 0;
        const DELETED = 1 << 1;
        const DRAFT = 1 << 2;
        const FLAGGED = 1 << 3;
        const SEEN = 1 << 4;
        const RECENT = 1 << 5;
        /// `\Recent` and not `\Seen`.
        const NEW = 1 << 6;
        /// Not `\Recent`. (Not "not `NEW`".)
        const OLD = 1 << 7;
        const UNANSWERED = 1 << 8;
        const UNDELETED = 1 << 9;
        const UNDRAFT = 1 << 10;
        const UNFLAGGED = 1 << 11;
        const UNSEEN = 1 << 12;
    }
}

/// The criteria of the `SEARCH` command, as a boolean tree.
///
/// Every predicate present on a node must hold for the node to match; an
/// absent predicate does not constrain anything, so the default value matches
/// every message.
///
/// String predicates are case-insensitive substring matches. Date predicates
/// refer to the `Date` header, taken in its own time zone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchCriteria {
    /// Sent strictly before this day.
    pub before: Option<NaiveDate>,
    /// Sent strictly after the start of this day.
    pub since: Option<NaiveDate>,
    /// Sent on this day.
    pub on: Option<NaiveDate>,

    pub bcc: Option<String>,
    pub cc: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    /// Matched against the text parts of the message.
    pub body: Option<String>,
    /// Matched against the header and the text parts of the message.
    pub text: Option<String>,
    /// `(name, value)` pairs; the named header must exist and contain the
    /// value. An empty value matches any message that has the header.
    pub headers: Vec<(String, String)>,

    /// The body is larger than this many bytes.
    pub larger: Option<u64>,
    /// The body is smaller than this many bytes.
    pub smaller: Option<u64>,

    pub flags: FlagCriteria,
    pub keyword: Option<String>,
    pub unkeyword: Option<String>,

    pub not: Option<Box<SearchCriteria>>,
    pub or: Option<Box<(SearchCriteria, SearchCriteria)>>,
}

impl SearchCriteria {
    /// Determine what parts of the message need to be extracted to evaluate
    /// this criteria tree.
    pub fn search_parts(&self) -> OptionalSearchParts {
        let mut want = OptionalSearchParts::empty();

        if self.before.is_some() || self.since.is_some() || self.on.is_some()
        {
            want |= OptionalSearchParts::DATE;
        }
        if self.bcc.is_some() {
            want |= OptionalSearchParts::BCC;
        }
        if self.cc.is_some() {
            want |= OptionalSearchParts::CC;
        }
        if self.from.is_some() {
            want |= OptionalSearchParts::FROM;
        }
        if self.to.is_some() {
            want |= OptionalSearchParts::TO;
        }
        if self.subject.is_some() {
            want |= OptionalSearchParts::SUBJECT;
        }
        if self.body.is_some() {
            want |= OptionalSearchParts::CONTENT;
        }
        if self.text.is_some() {
            want |= OptionalSearchParts::HEADER_MAP
                | OptionalSearchParts::CONTENT;
        }
        if !self.headers.is_empty() {
            want |= OptionalSearchParts::HEADER_MAP;
        }
        if self.larger.is_some() || self.smaller.is_some() {
            want |= OptionalSearchParts::SIZE;
        }

        if let Some(ref not) = self.not {
            want |= not.search_parts();
        }
        if let Some(ref or) = self.or {
            want |= or.0.search_parts() | or.1.search_parts();
        }

        want
    }

    /// Whether evaluating this criteria needs the message itself, as opposed
    /// to just its flags.
    pub fn requires_content(&self) -> bool {
        !self.search_parts().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flag_parsing() {
        assert_eq!(Flag::Seen, "\\Seen".parse::<Flag>().unwrap());
        assert_eq!(Flag::Answered, "\\ANSWERED".parse::<Flag>().unwrap());
        assert_eq!(Flag::Recent, "\\recent".parse::<Flag>().unwrap());
        assert_eq!(
            Flag::Keyword("$Forwarded".to_owned()),
            "$Forwarded".parse::<Flag>().unwrap()
        );

        assert_matches!(Err(Error::NxFlag), "\\Important".parse::<Flag>());
        assert_matches!(Err(Error::UnsafeName), "two words".parse::<Flag>());
        assert_matches!(Err(Error::UnsafeName), "".parse::<Flag>());
        assert_matches!(Err(Error::UnsafeName), "brace{".parse::<Flag>());
    }

    #[test]
    fn flag_display_round_trips() {
        for flag in &[
            Flag::Answered,
            Flag::Deleted,
            Flag::Draft,
            Flag::Flagged,
            Flag::Seen,
            Flag::Recent,
            Flag::Keyword("Junk".to_owned()),
        ] {
            assert_eq!(*flag, flag.to_string().parse::<Flag>().unwrap());
        }
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_ne!(
            Flag::Keyword("junk".to_owned()),
            Flag::Keyword("Junk".to_owned())
        );
    }

    #[test]
    fn store_item_parsing() {
        assert_eq!(
            StoreItem {
                op: StoreOp::Set,
                silent: false,
            },
            "FLAGS".parse::<StoreItem>().unwrap()
        );
        assert_eq!(
            StoreItem {
                op: StoreOp::Add,
                silent: true,
            },
            "+flags.silent".parse::<StoreItem>().unwrap()
        );
        assert_eq!(
            StoreItem {
                op: StoreOp::Remove,
                silent: false,
            },
            "-Flags".parse::<StoreItem>().unwrap()
        );

        assert_matches!(
            Err(Error::BadStoreOperation),
            "*FLAGS".parse::<StoreItem>()
        );
        assert_matches!(
            Err(Error::BadStoreOperation),
            ".SILENT".parse::<StoreItem>()
        );
        assert_matches!(
            Err(Error::BadStoreOperation),
            "FLAGS.LOUD".parse::<StoreItem>()
        );
        assert_matches!(
            Err(Error::BadStoreOperation),
            "ÆFLAGS".parse::<StoreItem>()
        );
    }

    #[test]
    fn search_parts_follow_the_tree() {
        assert!(SearchCriteria::default().search_parts().is_empty());

        let flags_only = SearchCriteria {
            flags: FlagCriteria::SEEN | FlagCriteria::UNFLAGGED,
            keyword: Some("Junk".to_owned()),
            ..SearchCriteria::default()
        };
        assert!(!flags_only.requires_content());

        let text = SearchCriteria {
            text: Some("foo".to_owned()),
            ..SearchCriteria::default()
        };
        assert_eq!(
            OptionalSearchParts::HEADER_MAP | OptionalSearchParts::CONTENT,
            text.search_parts()
        );

        let nested = SearchCriteria {
            not: Some(Box::new(SearchCriteria {
                before: Some(NaiveDate::from_ymd(2020, 1, 1)),
                ..SearchCriteria::default()
            })),
            or: Some(Box::new((
                flags_only.clone(),
                SearchCriteria {
                    smaller: Some(100),
                    ..SearchCriteria::default()
                },
            ))),
            ..SearchCriteria::default()
        };
        assert_eq!(
            OptionalSearchParts::DATE | OptionalSearchParts::SIZE,
            nested.search_parts()
        );
        assert!(nested.requires_content());
    }
}
