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

use chrono::prelude::*;
use log::debug;

use super::strings::*;
use crate::mime::entity::{Entity, Header};
use crate::mime::header::{parse_address_list, parse_datetime};
use crate::mime::model::MailboxSpec;

/// The `ENVELOPE` structure defined by RFC 3501, in the order the fields are
/// to be sent.
///
/// Every field is populated on a best-effort basis. A missing or
/// unintelligible header leaves the corresponding field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// The `Date` header.
    ///
    /// RFC 3501 forbids this from being empty since it is a required field in
    /// RFC 2822, but such messages exist nonetheless.
    pub date: Option<DateTime<FixedOffset>>,
    /// The `Subject` header, decoded.
    pub subject: String,
    /// The `From` header, decoded.
    pub from: Vec<EnvelopeAddress>,
    /// The `Sender` header, decoded.
    ///
    /// This is not defaulted from `from`; that is left to the response
    /// layer.
    pub sender: Vec<EnvelopeAddress>,
    /// The `Reply-To` header, decoded.
    pub reply_to: Vec<EnvelopeAddress>,
    /// The `To` header, decoded.
    pub to: Vec<EnvelopeAddress>,
    /// The `CC` header, decoded.
    pub cc: Vec<EnvelopeAddress>,
    /// The `BCC` header, decoded.
    pub bcc: Vec<EnvelopeAddress>,
    /// The `In-Reply-To` header, unfolded and trimmed.
    pub in_reply_to: String,
    /// The `Message-ID` header, unfolded and trimmed.
    pub message_id: String,
}

/// Representation of an email address in an RFC 3501 `ENVELOPE`.
///
/// Groups are flattened into their members, so there are no group
/// delimiters. Source routes are discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeAddress {
    /// The display name, decoded, or empty.
    pub name: String,
    /// The local part of the address (RFC 3501 calls it "mailbox name").
    pub local: String,
    /// The domain of the address (RFC 3501 calls it "host"). Empty if the
    /// address had no `@`.
    pub domain: String,
}

/// Extract the envelope of `message`.
///
/// Only the top-level header is consulted. Where a field occurs more than
/// once, the first occurrence wins.
pub fn envelope(message: &Entity) -> Envelope {
    let header = message.header();

    Envelope {
        date: header.get("Date").and_then(date),
        subject: header
            .get("Subject")
            .map(decode_unstructured)
            .unwrap_or_default(),
        from: addr_list(header, "From"),
        sender: addr_list(header, "Sender"),
        reply_to: addr_list(header, "Reply-To"),
        to: addr_list(header, "To"),
        cc: addr_list(header, "Cc"),
        bcc: addr_list(header, "Bcc"),
        in_reply_to: unfolded(header, "In-Reply-To"),
        message_id: unfolded(header, "Message-ID"),
    }
}

fn date(value: &[u8]) -> Option<DateTime<FixedOffset>> {
    let parsed = parse_datetime(value);
    if parsed.is_none() {
        debug!(
            "Ignoring unparsable date: {:?}",
            String::from_utf8_lossy(value)
        );
    }
    parsed
}

fn addr_list(header: &Header, name: &str) -> Vec<EnvelopeAddress> {
    let addresses = header
        .get(name)
        .and_then(parse_address_list)
        .unwrap_or_default();

    addresses
        .iter()
        .flat_map(|address| address.mailboxes())
        .map(to_envelope_address)
        .collect()
}

fn unfolded(header: &Header, name: &str) -> String {
    header
        .get(name)
        .map(|value| {
            String::from_utf8_lossy(value)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn to_envelope_address(mbox: &MailboxSpec) -> EnvelopeAddress {
    EnvelopeAddress {
        name: decode_phrase(&mbox.name),
        local: decode_dotted(&mbox.addr.local),
        domain: decode_dotted(&mbox.addr.domain),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::*;

    fn addr(name: &str, local: &str, domain: &str) -> EnvelopeAddress {
        EnvelopeAddress {
            name: name.to_owned(),
            local: local.to_owned(),
            domain: domain.to_owned(),
        }
    }

    #[test]
    fn envelope_of_sample() {
        let envelope = envelope(&parse_sample(MULTIPART_MIXED));

        assert_eq!(
            FixedOffset::east(3600).ymd(2020, 4, 14).and_hms(9, 30, 0),
            envelope.date.unwrap()
        );
        assert_eq!("Notes on the Engine \u{a7} 1", envelope.subject);
        assert_eq!(
            vec![addr("Ada Lovelace", "ada", "analytical.example")],
            envelope.from
        );
        assert_eq!(
            vec![addr("", "secretary", "analytical.example")],
            envelope.sender
        );
        assert!(envelope.reply_to.is_empty());
        assert_eq!(
            vec![
                addr("", "charles", "engine.example"),
                addr("Jörg", "joerg", "example.de"),
            ],
            envelope.to
        );
        // Group members are flattened
        assert_eq!(vec![addr("", "menabrea", "turin.example")], envelope.cc);
        assert!(envelope.bcc.is_empty());
        assert_eq!("<q.7@engine.example>", envelope.in_reply_to);
        assert_eq!("<notes.1@analytical.example>", envelope.message_id);
    }

    #[test]
    fn missing_fields_are_empty() {
        let envelope = envelope(&parse_sample(MINIMAL));
        assert_eq!(None, envelope.date);
        assert_eq!("plain", envelope.subject);
        // No @ means no domain
        assert_eq!(vec![addr("", "nobody", "")], envelope.from);
        assert!(envelope.sender.is_empty());
        assert!(envelope.cc.is_empty());
        assert_eq!("", envelope.message_id);
        assert_eq!("", envelope.in_reply_to);
    }

    #[test]
    fn bad_fields_are_isolated() {
        let envelope = envelope(&parse_sample(
            "\
Date: the day before yesterday
From: Someone <someone@example.com>
To: <<<
Subject: Still here
Message-ID:
 <folded@example.com>

",
        ));
        assert_eq!(None, envelope.date);
        assert!(envelope.to.is_empty());
        assert_eq!(
            vec![addr("Someone", "someone", "example.com")],
            envelope.from
        );
        assert_eq!("Still here", envelope.subject);
        assert_eq!("<folded@example.com>", envelope.message_id);
    }

    #[test]
    fn only_top_level_and_first_occurrence() {
        let envelope = envelope(&parse_sample(
            "\
Subject: first
Subject: second
Content-Type: multipart/mixed; boundary=b

--b
Cc: inner@example.com
Subject: inner

--b--
",
        ));
        assert_eq!("first", envelope.subject);
        assert!(envelope.cc.is_empty());
    }

    #[test]
    fn folded_subject() {
        let envelope = envelope(&parse_sample(
            "\
Subject: Request for meeting -- Subject: short speech to the Royal Commit
\ttee on Engines

",
        ));
        assert_eq!(
            // The whitespace used for folding is retained, per RFC 5322
            // 2.2.3, even where the sender evidently intended otherwise.
            "Request for meeting -- Subject: short speech to the Royal \
             Commit tee on Engines",
            envelope.subject
        );
    }

    #[test]
    fn quoted_local_part_keeps_at() {
        let envelope = envelope(&parse_sample(
            "From: \"odd@name\" <\"a@b\"@example.com>\n\n",
        ));
        assert_eq!(vec![addr("odd@name", "a@b", "example.com")], envelope.from);
    }
}
