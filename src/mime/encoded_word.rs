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

//! RFC 2047 "encoded words" in header values.

use std::borrow::Cow;

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENCODED_WORD: Regex =
        Regex::new(r"^=\?([!->@-~]*)\?([!->@-~]*)\?([!->@-~]*)\?=$")
            .unwrap();
}

/// Test if `word` (in its entirety) is an RFC 2047 encoded word, and if so,
/// decode it.
///
/// Returns `None` if `word` is not an encoded word or if it could not be
/// decoded. The distinction from "unchanged" matters since whitespace
/// between adjacent encoded words is deleted, but is kept everywhere else.
///
/// Encoded words longer than the 75 characters RFC 2047 allows are accepted,
/// since agents produce them and other readers decode them.
pub fn ew_decode(word: &str) -> Option<String> {
    let captures = ENCODED_WORD.captures(word)?;
    let charset = captures.get(1)?.as_str();
    let transfer_encoding = captures.get(2)?.as_str();
    let content = captures.get(3)?.as_str().as_bytes();

    // RFC 2231 allows a language suffix on the charset, which we don't need
    let charset = charset.split('*').next().unwrap_or(charset);

    let raw = match transfer_encoding {
        "q" | "Q" => q_decode(content),
        "b" | "B" => base64::decode(content).ok()?,
        _ => return None,
    };

    let encoding = Encoding::for_label_no_replacement(charset.as_bytes())?;
    let (decoded, _) = encoding.decode_with_bom_removal(&raw);
    Some(decoded.into_owned())
}

/// The "Q" encoding of RFC 2047 4.2.
///
/// `_` always stands for ASCII space regardless of charset. Malformed `=`
/// escapes are passed through literally.
fn q_decode(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut ix = 0;
    while ix < content.len() {
        match content[ix] {
            b'_' => out.push(b' '),
            b'=' => {
                if let Some(b) = content
                    .get(ix + 1..ix + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    out.push(b);
                    ix += 3;
                    continue;
                }
                out.push(b'=');
            },
            b => out.push(b),
        }
        ix += 1;
    }
    out
}

/// Decode all encoded words in an "unstructured" header value, such as a
/// subject.
///
/// Whitespace between two adjacent encoded words is removed; all other
/// whitespace is kept as-is.
pub fn ew_decode_unstructured(text: &str) -> Cow<'_, str> {
    if !text.contains("=?") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_space = "";
    let mut prev_was_ew = false;
    let mut rest = text;

    while !rest.is_empty() {
        let space_len = rest
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or_else(|| rest.len());
        let (space, after_space) = rest.split_at(space_len);
        let word_len = after_space
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or_else(|| after_space.len());
        let (word, after_word) = after_space.split_at(word_len);
        rest = after_word;

        if word.is_empty() {
            pending_space = space;
            break;
        }

        match ew_decode(word) {
            Some(decoded) => {
                if !prev_was_ew {
                    out.push_str(space);
                }
                out.push_str(&decoded);
                prev_was_ew = true;
            },
            None => {
                out.push_str(space);
                out.push_str(word);
                prev_was_ew = false;
            },
        }
    }

    out.push_str(pending_space);
    Cow::Owned(out)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_ew_decode() {
        assert_eq!(None, ew_decode("hello world"));
        assert_eq!(None, ew_decode("=?utf-8?x?abc?="));
        assert_eq!(None, ew_decode("=?no-such-charset?q?abc?="));

        // Examples from RFC 2047
        assert_eq!(
            "Keith Moore",
            ew_decode("=?US-ASCII?Q?Keith_Moore?=").unwrap()
        );
        assert_eq!(
            "Keld Jørn Simonsen",
            ew_decode("=?ISO-8859-1?Q?Keld_J=F8rn_Simonsen?=").unwrap()
        );
        assert_eq!("André", ew_decode("=?ISO-8859-1?Q?Andr=E9?=").unwrap());
        assert_eq!(
            "If you can read this yo",
            ew_decode("=?ISO-8859-1?B?SWYgeW91IGNhbiByZWFkIHRoaXMgeW8=?=")
                .unwrap()
        );
        assert_eq!(
            "u understand the example.",
            ew_decode("=?ISO-8859-2?B?dSB1bmRlcnN0YW5kIHRoZSBleGFtcGxlLg==?=")
                .unwrap()
        );

        // RFC 2231 language suffix
        assert_eq!("Hi", ew_decode("=?US-ASCII*EN?Q?Hi?=").unwrap());
        // Malformed escape passes through
        assert_eq!("100=%", ew_decode("=?utf-8?q?100=%?=").unwrap());
    }

    #[test]
    fn test_ew_decode_unstructured() {
        assert_eq!("plain  text", ew_decode_unstructured("plain  text"));
        // Not delimited by whitespace, so not an encoded word
        assert_eq!(
            "(=?ISO-8859-1?Q?a?=)",
            ew_decode_unstructured("(=?ISO-8859-1?Q?a?=)")
        );
        assert_eq!(
            "ab",
            ew_decode_unstructured("=?ISO-8859-1?Q?a?=\r\n =?ISO-8859-1?Q?b?=")
        );
        assert_eq!(
            "Re: Grüße from here ",
            ew_decode_unstructured(
                "Re: =?utf-8?q?Gr=C3=BC?= =?utf-8?b?w59l?= from here "
            )
        );
        assert_eq!(
            "a b",
            ew_decode_unstructured("=?ISO-8859-1?Q?a?= b")
        );
    }

    proptest! {
        #[test]
        fn ew_decode_never_panics(s in r"=\?.*\?.*\?.*\?=") {
            ew_decode(&s);
        }

        #[test]
        fn ew_decode_unstructured_never_panics(s in r"[ a=?]*") {
            ew_decode_unstructured(&s);
        }
    }
}
