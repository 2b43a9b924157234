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

//! Conversion of raw header tokens into display strings.

use std::borrow::Cow;

use memchr::memchr;

use crate::mime::encoded_word::{ew_decode, ew_decode_unstructured};

fn to_utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Join the words of an RFC 2822 phrase (e.g., a display name) with spaces,
/// decoding any that are encoded words.
///
/// Whitespace between adjacent encoded words is dropped, and the bare `.`
/// tokens of the obsolete phrase syntax are attached to the preceding word.
pub fn decode_phrase(phrase: &[Vec<u8>]) -> String {
    let mut out = String::new();
    let mut prev_was_ew = false;

    for word in phrase {
        let text = to_utf8(word);
        let decoded = ew_decode(&text);
        let is_ew = decoded.is_some();

        if !out.is_empty() && !(is_ew && prev_was_ew) && "." != text {
            out.push(' ');
        }

        match decoded {
            Some(decoded) => out.push_str(&decoded),
            None => out.push_str(&text),
        }
        prev_was_ew = is_ew;
    }

    out
}

/// Join the parts of a dot-separated local part or domain.
pub fn decode_dotted(parts: &[Vec<u8>]) -> String {
    let mut out = Vec::new();
    for (ix, part) in parts.iter().enumerate() {
        if ix > 0 {
            out.push(b'.');
        }
        out.extend_from_slice(part);
    }
    to_utf8(&out).into_owned()
}

/// Decode an "unstructured" header value, such as a subject.
///
/// Folding is removed, the result is trimmed, and encoded words are decoded.
pub fn decode_unstructured(raw: &[u8]) -> String {
    let unfolded = if memchr(b'\n', raw).is_some() {
        let mut unfolded = Vec::with_capacity(raw.len());
        let mut is_unfolding = false;
        for &ch in raw {
            let is_line_break = b'\r' == ch || b'\n' == ch;
            if is_unfolding {
                if is_line_break || b' ' == ch || b'\t' == ch {
                    continue;
                }
                is_unfolding = false;
                unfolded.push(ch);
            } else if is_line_break {
                unfolded.push(b' ');
                is_unfolding = true;
            } else {
                unfolded.push(ch);
            }
        }
        Cow::Owned(unfolded)
    } else {
        Cow::Borrowed(raw)
    };

    let text = to_utf8(&unfolded);
    ew_decode_unstructured(text.trim()).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    fn words(ws: &[&str]) -> Vec<Vec<u8>> {
        ws.iter().map(|w| w.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_decode_phrase() {
        assert_eq!("", decode_phrase(&[]));
        assert_eq!("Fred Smith", decode_phrase(&words(&["Fred Smith"])));
        assert_eq!(
            "Joe Q. Public",
            decode_phrase(&words(&["Joe", "Q", ".", "Public"]))
        );
        assert_eq!(
            "Jörg M Müller x",
            decode_phrase(&words(&[
                "=?utf-8?q?J=C3=B6rg?=",
                "M",
                "=?utf-8?q?M=C3=BCller?=",
                "x"
            ]))
        );
        assert_eq!(
            "Keith Moore",
            decode_phrase(&words(&[
                "=?US-ASCII?Q?Keith_?=",
                "=?US-ASCII?Q?Moore?="
            ]))
        );
    }

    #[test]
    fn test_decode_dotted() {
        assert_eq!("example.com", decode_dotted(&words(&["example", "com"])));
        assert_eq!("[10.0.0.1]", decode_dotted(&words(&["[10.0.0.1]"])));
        assert_eq!("", decode_dotted(&[]));
    }

    #[test]
    fn test_decode_unstructured() {
        assert_eq!("hello world", decode_unstructured(b"  hello world "));
        assert_eq!(
            "folded subject line",
            decode_unstructured(b"folded\r\n subject\r\n\tline")
        );
        assert_eq!(
            "Notes on the Engine \u{a7} 1",
            decode_unstructured(b"=?utf-8?q?Notes_on_the_Engine_=C2=A7?= 1")
        );
        assert_eq!(
            "ab",
            decode_unstructured(b"=?utf-8?q?a?=\r\n =?utf-8?q?b?=")
        );
        assert_eq!("caf\u{fffd}", decode_unstructured(b"caf\xe9"));
    }
}
