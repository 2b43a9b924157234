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

//! Support for retrieving data from a message needed for search.
//!
//! This does not implement searching itself; that lives in
//! `account::search`.
//!
//! Everything a search could look at is gathered into the `SearchData`
//! structure up front, but only the parts the criteria actually refer to. A
//! field which was not gathered is `None`, which the evaluator treats as
//! "unknown". This is also how the flags-only and message-only search paths
//! are told apart.

use std::collections::HashMap;

use bitflags::bitflags;
use chrono::prelude::*;

use super::strings::*;
use crate::account::model::Flag;
use crate::mime::content_encoding::decode_text_body;
use crate::mime::entity::{Entity, Header};
use crate::mime::header;
use crate::mime::model::{Address, MailboxSpec};
use crate::support::system_config::SearchConfig;

bitflags! {
    /// Message properties that are only extracted when a search needs them.
    pub struct OptionalSearchParts: u32 {
        const HEADER_MAP = 1 << 0;
        const FROM = 1 << 1;
        const CC = 1 << 2;
        const BCC = 1 << 3;
        const TO = 1 << 4;
        const DATE = 1 << 5;
        const SUBJECT = 1 << 6;
        const CONTENT = 1 << 7;
        const SIZE = 1 << 8;
    }
}

/// Data which can be fetched as part of the search process.
///
/// A field is `None` if its value is unknown. If the value is known to be
/// absent, it is set to `Some("")`.
#[derive(Debug, Clone, Default)]
pub struct SearchData {
    pub flags: Option<Vec<Flag>>,

    /// All top-level headers on the message, with encoded words decoded.
    ///
    /// Header names are lowercase.
    ///
    /// Encoded word decoding is done irrespective of per-header syntax; in
    /// essence, every header is treated as an unstructured string. This also
    /// means that comments remain in this text.
    ///
    /// If multiple values of the same header are found, they are
    /// concatenated, separated with a NUL character.
    pub headers: Option<HashMap<String, String>>,
    /// The From header, in "normalised" format.
    ///
    /// RFC 3501 does not define what it means to search for a substring in
    /// any of the addressing fields. We put the address list into a sort of
    /// naïve normalised format so that a query like `<foo@bar.com>` can be
    /// used to match an address exactly: display names are wrapped in double
    /// quotes (but not escaped), emails are surrounded by angle brackets, and
    /// groups are more or less in RFC 5322 syntax.
    ///
    /// If the field cannot be parsed as an address list at all, this is the
    /// decoded raw text instead.
    pub from: Option<String>,
    /// The CC header, in "normalised" format (see `from`).
    pub cc: Option<String>,
    /// The BCC header, in "normalised" format (see `from`).
    pub bcc: Option<String>,
    /// The To header, in "normalised" format (see `from`).
    pub to: Option<String>,
    /// The Date header.
    ///
    /// A message without a usable date is considered to have been sent at
    /// the UNIX epoch.
    pub date: Option<DateTime<FixedOffset>>,
    /// The Subject header, decoded.
    pub subject: Option<String>,
    /// The exact length of the message body, in bytes.
    pub size: Option<u64>,

    /// A concatenation of all `text/*` leaf parts, with their transfer
    /// encoding removed and converted to UTF-8. Each part is terminated with
    /// a NUL character.
    pub content: Option<String>,
}

impl SearchData {
    /// Record the flags currently set on the message.
    pub fn load_flags(&mut self, flags: &[Flag]) {
        self.flags = Some(flags.to_vec());
    }

    /// Extract the parts given by `want` from `message`.
    ///
    /// At most `config.content_read_limit` bytes of raw body text are
    /// examined to produce `content`.
    pub fn load_message(
        &mut self,
        message: &Entity,
        want: OptionalSearchParts,
        config: &SearchConfig,
    ) {
        let fields = message.header();

        if want.contains(OptionalSearchParts::HEADER_MAP) {
            self.headers = Some(header_map(fields));
        }
        if want.contains(OptionalSearchParts::FROM) {
            self.from = Some(normalised_addresses(fields, "From"));
        }
        if want.contains(OptionalSearchParts::CC) {
            self.cc = Some(normalised_addresses(fields, "Cc"));
        }
        if want.contains(OptionalSearchParts::BCC) {
            self.bcc = Some(normalised_addresses(fields, "Bcc"));
        }
        if want.contains(OptionalSearchParts::TO) {
            self.to = Some(normalised_addresses(fields, "To"));
        }
        if want.contains(OptionalSearchParts::DATE) {
            self.date = Some(
                fields
                    .get("Date")
                    .and_then(header::parse_datetime)
                    .unwrap_or_else(|| FixedOffset::east(0).timestamp(0, 0)),
            );
        }
        if want.contains(OptionalSearchParts::SUBJECT) {
            self.subject = Some(
                fields
                    .get("Subject")
                    .map(decode_unstructured)
                    .unwrap_or_default(),
            );
        }
        if want.contains(OptionalSearchParts::SIZE) {
            self.size = Some(message.body().len() as u64);
        }
        if want.contains(OptionalSearchParts::CONTENT) {
            let mut content = String::new();
            let mut remaining = config.content_read_limit;
            accumulate_content(message, &mut remaining, &mut content);
            self.content = Some(content);
        }
    }
}

fn header_map(fields: &Header) -> HashMap<String, String> {
    let mut headers = HashMap::<String, String>::new();
    for (name, value) in fields.iter() {
        let value = decode_unstructured(value);
        headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|v| {
                v.push('\0');
                v.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

fn normalised_addresses(fields: &Header, name: &str) -> String {
    fn push_mailbox(dst: &mut String, mailbox: &MailboxSpec) {
        dst.push('"');
        dst.push_str(&decode_phrase(&mailbox.name));
        dst.push_str("\" <");
        dst.push_str(&decode_dotted(&mailbox.addr.local));
        if !mailbox.addr.domain.is_empty() {
            dst.push('@');
            dst.push_str(&decode_dotted(&mailbox.addr.domain));
        }
        dst.push_str(">, ");
    }

    let mut result = String::new();
    for value in fields.get_all(name) {
        let parsed = match header::parse_address_list(value) {
            Some(parsed) => parsed,
            None => {
                result.push_str(&decode_unstructured(value));
                result.push_str(", ");
                continue;
            },
        };

        for address in &parsed {
            match *address {
                Address::Mailbox(ref mailbox) => {
                    push_mailbox(&mut result, mailbox);
                },
                Address::Group(ref group) => {
                    result.push('"');
                    result.push_str(&decode_phrase(&group.name));
                    result.push_str("\": ");
                    for mailbox in &group.boxes {
                        push_mailbox(&mut result, mailbox);
                    }
                    result.push_str("; ");
                },
            }
        }
    }
    result
}

fn accumulate_content(
    entity: &Entity,
    remaining: &mut usize,
    dst: &mut String,
) {
    if 0 == *remaining {
        return;
    }

    if let Some(parts) = entity.parts() {
        for part in parts {
            accumulate_content(part, remaining, dst);
        }
    } else if let Some(text) = decode_text_body(entity, *remaining) {
        *remaining -= entity.body().len().min(*remaining);
        dst.push_str(&text);
        dst.push('\0');
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::*;

    fn load(message: &str, want: OptionalSearchParts) -> SearchData {
        let mut data = SearchData::default();
        data.load_message(
            &parse_sample(message),
            want,
            &SearchConfig::default(),
        );
        data
    }

    #[test]
    fn only_wanted_parts_are_loaded() {
        let data = load(
            MULTIPART_MIXED,
            OptionalSearchParts::SUBJECT | OptionalSearchParts::SIZE,
        );
        assert!(data.flags.is_none());
        assert!(data.headers.is_none());
        assert!(data.from.is_none());
        assert!(data.cc.is_none());
        assert!(data.bcc.is_none());
        assert!(data.to.is_none());
        assert!(data.date.is_none());
        assert!(data.content.is_none());
        assert!(data.subject.is_some());
        assert!(data.size.is_some());
    }

    #[test]
    fn addresses_are_normalised() {
        let data = load(MULTIPART_MIXED, OptionalSearchParts::all());
        assert_eq!(
            Some("\"Ada Lovelace\" <ada@analytical.example>, "),
            data.from.as_deref()
        );
        assert_eq!(
            Some(
                "\"\" <charles@engine.example>, \
                 \"Jörg\" <joerg@example.de>, "
            ),
            data.to.as_deref()
        );
        assert_eq!(
            Some("\"Reviewers\": \"\" <menabrea@turin.example>, ; "),
            data.cc.as_deref()
        );
        assert_eq!(Some(""), data.bcc.as_deref());
    }

    #[test]
    fn simple_fields_are_decoded() {
        let data = load(MULTIPART_MIXED, OptionalSearchParts::all());
        assert_eq!(Some("Notes on the Engine § 1"), data.subject.as_deref());
        assert_eq!(
            "2020-04-14T09:30:00+01:00",
            data.date.unwrap().to_rfc3339()
        );

        let headers = data.headers.unwrap();
        assert_eq!(Some("3"), headers.get("x-priority").map(|s| &s[..]));
        assert_eq!(
            Some("Notes on the Engine § 1"),
            headers.get("subject").map(|s| &s[..])
        );
        assert!(!headers.contains_key("content-transfer-encoding"));
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut data = SearchData::default();
        data.load_message(
            &Entity::parse(b"X-Tag: one\r\nx-tag: two\r\n\r\n"),
            OptionalSearchParts::HEADER_MAP,
            &SearchConfig::default(),
        );
        assert_eq!(
            Some("one\0two"),
            data.headers.unwrap().get("x-tag").map(|s| &s[..])
        );
    }

    #[test]
    fn missing_fields_are_known_empty() {
        let mut data = SearchData::default();
        data.load_message(
            &Entity::parse(b"X-Nothing: here\r\n\r\nbody"),
            OptionalSearchParts::all(),
            &SearchConfig::default(),
        );
        assert_eq!(Some(""), data.from.as_deref());
        assert_eq!(Some(""), data.subject.as_deref());
        assert_eq!(0, data.date.unwrap().timestamp());
        assert_eq!(Some(4), data.size);
        assert_eq!(Some("body\0"), data.content.as_deref());
    }

    #[test]
    fn content_covers_all_text_parts() {
        let data = load(MULTIPART_MIXED, OptionalSearchParts::CONTENT);
        assert_eq!(
            Some(
                "The engine may act upon other things besides number.\0\
                 <p>The engine may act upon other things besides \
                 number.</p>\0\
                 B1 = 1/6\r\nB2 = -1/30\0"
            ),
            data.content.as_deref()
        );
    }

    #[test]
    fn content_skips_non_text_parts() {
        let data = load(DEEPLY_NESTED, OptionalSearchParts::CONTENT);
        let content = data.content.unwrap();
        assert!(content.contains("Part 1"));
        assert!(content.contains("Part 4.2.1"));
        assert!(content.contains("Part 4.2.2.1"));
        assert!(!content.contains("Part 2"));
        assert!(!content.contains("Part 3"));
        assert!(!content.contains("Part 4.1"));
        assert!(!content.contains("Part 4.2.2.2"));
    }

    #[test]
    fn content_respects_read_limit() {
        let mut data = SearchData::default();
        data.load_message(
            &parse_sample(MULTIPART_MIXED),
            OptionalSearchParts::CONTENT | OptionalSearchParts::SIZE,
            &SearchConfig {
                content_read_limit: 10,
            },
        );
        assert_eq!(Some("The engine\0"), data.content.as_deref());
        assert!(data.size.unwrap() > 10);
    }

    #[test]
    fn size_is_exact_body_length() {
        let message = parse_sample(MULTIPART_MIXED);
        let mut data = SearchData::default();
        data.load_message(
            &message,
            OptionalSearchParts::SIZE,
            &SearchConfig::default(),
        );
        assert_eq!(Some(message.body().len() as u64), data.size);
    }
}
