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

//! Evaluation of `SEARCH` criteria against a message and its flags.
//!
//! Evaluation is three-valued: every predicate is true, false, or unknown,
//! the latter when the data it refers to was not loaded into the
//! `SearchData`. This lets the same walk serve a caller which only has the
//! flags of a message, one which only has its content, and one which has
//! both. A predicate outside the loaded domain does not constrain the
//! result, even underneath `NOT` or `OR`.

use log::warn;
use regex::{self, Regex};

use super::model::*;
use crate::mime::entity::Entity;
use crate::mime::fetch::search::SearchData;
use crate::support::system_config::SearchConfig;

/// Determine whether `message` satisfies the content predicates of
/// `criteria`, using the default configuration.
///
/// Flag predicates are not constrained.
pub fn matches(message: &Entity, criteria: &SearchCriteria) -> bool {
    matches_with(message, criteria, &SearchConfig::default())
}

/// Like `matches`, but with an explicit configuration.
pub fn matches_with(
    message: &Entity,
    criteria: &SearchCriteria,
    config: &SearchConfig,
) -> bool {
    let mut data = SearchData::default();
    data.load_message(message, criteria.search_parts(), config);
    evaluate(criteria, &data).unwrap_or(true)
}

/// Determine whether a message with the given flags satisfies the flag
/// predicates of `criteria`.
///
/// Content predicates are not constrained.
pub fn matches_flags(flags: &[Flag], criteria: &SearchCriteria) -> bool {
    let mut data = SearchData::default();
    data.load_flags(flags);
    evaluate(criteria, &data).unwrap_or(true)
}

/// Determine whether a message satisfies `criteria` in full.
pub fn matches_message(
    message: &Entity,
    flags: &[Flag],
    criteria: &SearchCriteria,
) -> bool {
    let mut data = SearchData::default();
    data.load_flags(flags);
    data.load_message(
        message,
        criteria.search_parts(),
        &SearchConfig::default(),
    );
    evaluate(criteria, &data).unwrap_or(true)
}

/// Evaluate `criteria` against whatever is known in `data`.
///
/// Returns `None` if the result depends on data which has not been loaded.
pub fn evaluate(criteria: &SearchCriteria, data: &SearchData) -> Option<bool> {
    let mut result = Some(true);
    let mut push = |value: Option<bool>| result = and(result, value);

    // Dates are compared in the sender's own zone
    let local = data.date.map(|date| date.naive_local());
    let day = local.map(|local| local.date());
    if let Some(before) = criteria.before {
        push(day.map(|day| day < before));
    }
    if let Some(since) = criteria.since {
        push(local.map(|local| local > since.and_hms(0, 0, 0)));
    }
    if let Some(on) = criteria.on {
        push(day.map(|day| day == on));
    }

    if let Some(ref pat) = criteria.bcc {
        push(string_match(pat, data.bcc.as_deref()));
    }
    if let Some(ref pat) = criteria.cc {
        push(string_match(pat, data.cc.as_deref()));
    }
    if let Some(ref pat) = criteria.from {
        push(string_match(pat, data.from.as_deref()));
    }
    if let Some(ref pat) = criteria.to {
        push(string_match(pat, data.to.as_deref()));
    }
    if let Some(ref pat) = criteria.subject {
        push(string_match(pat, data.subject.as_deref()));
    }
    if let Some(ref pat) = criteria.body {
        push(string_match(pat, data.content.as_deref()));
    }
    if let Some(ref pat) = criteria.text {
        let in_header = data.headers.as_ref().map(|headers| {
            to_regex(pat).map_or(false, |r| {
                headers.iter().any(|(name, value)| {
                    r.is_match(&format!("{}: {}", name, value))
                })
            })
        });
        push(or(in_header, string_match(pat, data.content.as_deref())));
    }
    for &(ref name, ref pat) in &criteria.headers {
        push(data.headers.as_ref().map(|headers| {
            let value = headers.get(&name.to_ascii_lowercase());
            string_match(pat, value.map(|v| v.as_str())).unwrap_or(false)
        }));
    }

    if let Some(larger) = criteria.larger {
        push(data.size.map(|size| size > larger));
    }
    if let Some(smaller) = criteria.smaller {
        push(data.size.map(|size| size < smaller));
    }

    let has = |flag: &Flag| data.flags.as_ref().map(|f| f.contains(flag));
    for &(bit, ref flag, expected) in &[
        (FlagCriteria::ANSWERED, Flag::Answered, true),
        (FlagCriteria::DELETED, Flag::Deleted, true),
        (FlagCriteria::DRAFT, Flag::Draft, true),
        (FlagCriteria::FLAGGED, Flag::Flagged, true),
        (FlagCriteria::SEEN, Flag::Seen, true),
        (FlagCriteria::RECENT, Flag::Recent, true),
        (FlagCriteria::OLD, Flag::Recent, false),
        (FlagCriteria::UNANSWERED, Flag::Answered, false),
        (FlagCriteria::UNDELETED, Flag::Deleted, false),
        (FlagCriteria::UNDRAFT, Flag::Draft, false),
        (FlagCriteria::UNFLAGGED, Flag::Flagged, false),
        (FlagCriteria::UNSEEN, Flag::Seen, false),
    ] {
        if criteria.flags.contains(bit) {
            push(has(flag).map(|present| present == expected));
        }
    }
    if criteria.flags.contains(FlagCriteria::NEW) {
        push(and(has(&Flag::Recent), not(has(&Flag::Seen))));
    }

    if let Some(ref kw) = criteria.keyword {
        push(has_keyword(data, kw));
    }
    if let Some(ref kw) = criteria.unkeyword {
        push(not(has_keyword(data, kw)));
    }

    if let Some(ref child) = criteria.not {
        push(not(evaluate(child, data)));
    }
    if let Some(ref pair) = criteria.or {
        push(or(evaluate(&pair.0, data), evaluate(&pair.1, data)));
    }

    result
}

fn and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn not(a: Option<bool>) -> Option<bool> {
    a.map(|v| !v)
}

fn string_match(pat: &str, value: Option<&str>) -> Option<bool> {
    let value = value?;
    Some(to_regex(pat).map_or(false, |r| r.is_match(value)))
}

/// A keyword which cannot be a flag at all is simply never set.
fn has_keyword(data: &SearchData, kw: &str) -> Option<bool> {
    data.flags.as_ref().map(|flags| {
        kw.parse::<Flag>()
            .map_or(false, |flag| flags.contains(&flag))
    })
}

/// Convert a search pattern into a regex.
///
/// We use the regex library for substring matching both for its excellent
/// substring search and for its case-insensitivity. Whitespace in the
/// pattern matches any run of whitespace, since header values retain their
/// folding.
///
/// Returns `None` if the pattern is too large to compile.
fn to_regex(pat: &str) -> Option<Regex> {
    let mut regex_str = String::new();
    for (ix, chunk) in pat.split_whitespace().enumerate() {
        if 0 != ix {
            regex_str.push_str("[ \r\n\t]+");
        }
        regex_str.push_str(&regex::escape(chunk));
    }

    match regex::RegexBuilder::new(&regex_str)
        .case_insensitive(true)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Search pattern rejected: {}", e);
            None
        },
    }
}
