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

//! Removal of content transfer encodings and conversion of text bodies to
//! UTF-8.

use std::borrow::Cow;

use memchr::memchr;

use super::entity::Entity;

/// The content transfer encodings which need to be undone before a body can
/// be treated as text.
///
/// Everything which is not base64 or quoted-printable (including `7bit`,
/// `8bit`, `binary`, and things we've never heard of) is passed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferEncoding {
    Identity,
    QuotedPrintable,
    Base64,
}

impl TransferEncoding {
    pub fn of(entity: &Entity) -> Self {
        let value = match entity.header().get("Content-Transfer-Encoding") {
            Some(v) => String::from_utf8_lossy(v),
            None => return TransferEncoding::Identity,
        };
        let value = value.trim();

        if value.eq_ignore_ascii_case("base64") {
            TransferEncoding::Base64
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            TransferEncoding::QuotedPrintable
        } else {
            TransferEncoding::Identity
        }
    }

    /// Decode `data` according to this encoding.
    ///
    /// This never fails. Base64 which cannot be decoded is returned as-is.
    pub fn decode<'a>(self, data: &'a [u8]) -> Cow<'a, [u8]> {
        match self {
            TransferEncoding::Identity => Cow::Borrowed(data),
            TransferEncoding::QuotedPrintable => qp_decode(data),
            TransferEncoding::Base64 => {
                let compact: Vec<u8> = data
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                match base64::decode(&compact) {
                    Ok(decoded) => Cow::Owned(decoded),
                    Err(_) => Cow::Borrowed(data),
                }
            },
        }
    }
}

/// Decodes quoted-printable encoding, as described by RFC 2045.
///
/// Soft line breaks are discarded, with either DOS or UNIX line endings.
/// Invalid escapes are passed through untransformed, as are 8-bit bytes.
pub fn qp_decode(data: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'=', data).is_none() {
        return Cow::Borrowed(data);
    }

    let mut out = Vec::with_capacity(data.len());
    let mut ix = 0;
    while ix < data.len() {
        let ch = data[ix];
        ix += 1;
        if b'=' != ch {
            out.push(ch);
            continue;
        }

        let rest = &data[ix..];
        if rest.starts_with(b"\r\n") {
            ix += 2;
        } else if rest.starts_with(b"\n") {
            ix += 1;
        } else if let Some(byte) = rest.get(..2).and_then(hex_byte) {
            out.push(byte);
            ix += 2;
        } else {
            out.push(b'=');
        }
    }

    Cow::Owned(out)
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    fn nybble(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }

    Some(nybble(pair[0])? << 4 | nybble(pair[1])?)
}

/// Convert `data` in the given charset into UTF-8.
///
/// An absent charset means US-ASCII. Unknown charsets, and invalid sequences
/// in known ones, degrade to lossy UTF-8 decoding.
pub fn decode_charset<'a>(
    data: &'a [u8],
    charset: Option<&str>,
) -> Cow<'a, str> {
    let encoding = encoding_rs::Encoding::for_label_no_replacement(
        charset.unwrap_or("us-ascii").as_bytes(),
    );
    match encoding {
        Some(encoding) => encoding.decode_without_bom_handling(data).0,
        None => String::from_utf8_lossy(data),
    }
}

/// Decode at most the first `limit` bytes of the body of a leaf `text/*`
/// entity to a UTF-8 string.
///
/// Returns `None` for entities that are not text leaves.
pub fn decode_text_body(entity: &Entity, limit: usize) -> Option<String> {
    let content_type = entity.content_type();
    if entity.is_multipart() || !content_type.is_type("text") {
        return None;
    }

    let body = entity.body();
    let raw = &body[..limit.min(body.len())];
    let decoded = TransferEncoding::of(entity).decode(raw);
    Some(decode_charset(&decoded, content_type.parm("charset")).into_owned())
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::mime::entity::Header;

    fn leaf(fields: &[(&str, &str)], body: &[u8]) -> Entity {
        let header = fields
            .iter()
            .map(|&(n, v)| (n.to_owned(), v.as_bytes().to_vec()))
            .collect::<Header>();
        Entity::new(header, body)
    }

    #[test]
    fn test_qp_decode() {
        assert_eq!(b"hello world", &qp_decode(b"hello world")[..]);
        assert_eq!(b"\xabfoo", &qp_decode(b"=ABfoo")[..]);
        assert_eq!(b"fo\xabo", &qp_decode(b"fo=abo")[..]);
        assert_eq!(b"foo\xab\xcd", &qp_decode(b"foo=AB=CD")[..]);

        assert_eq!(b"foobar", &qp_decode(b"foo=\nbar")[..]);
        assert_eq!(b"foobar", &qp_decode(b"foo=\r\nbar")[..]);

        assert_eq!(b"foo=()bar", &qp_decode(b"foo=()bar")[..]);
        assert_eq!(b"foo=\xabbar", &qp_decode(b"foo==ABbar")[..]);
        assert_eq!(b"foo=+1", &qp_decode(b"foo=+1")[..]);
        assert_eq!(b"foo=", &qp_decode(b"foo=")[..]);
        assert_eq!(b"foo=A", &qp_decode(b"foo=A")[..]);
    }

    #[test]
    fn transfer_encoding_from_header() {
        assert_eq!(
            TransferEncoding::Identity,
            TransferEncoding::of(&leaf(&[], b""))
        );
        assert_eq!(
            TransferEncoding::Base64,
            TransferEncoding::of(&leaf(
                &[("Content-Transfer-Encoding", " BASE64 ")],
                b""
            ))
        );
        assert_eq!(
            TransferEncoding::QuotedPrintable,
            TransferEncoding::of(&leaf(
                &[("content-transfer-encoding", "Quoted-Printable")],
                b""
            ))
        );
        assert_eq!(
            TransferEncoding::Identity,
            TransferEncoding::of(&leaf(
                &[("Content-Transfer-Encoding", "x-uuencode")],
                b""
            ))
        );
    }

    #[test]
    fn base64_bodies_are_decoded() {
        assert_eq!(
            b"hello world",
            &TransferEncoding::Base64.decode(b"aGVsbG8g\r\nd29ybGQ=\r\n")[..]
        );
        assert_eq!(
            b"not base64!",
            &TransferEncoding::Base64.decode(b"not base64!")[..]
        );
    }

    #[test]
    fn text_bodies_are_converted_to_utf8() {
        let entity = leaf(
            &[
                ("Content-Type", "text/plain; charset=iso-8859-1"),
                ("Content-Transfer-Encoding", "quoted-printable"),
            ],
            b"caf=E9",
        );
        assert_eq!(
            Some("café".to_owned()),
            decode_text_body(&entity, usize::MAX)
        );

        let entity =
            leaf(&[("Content-Type", "text/plain; charset=x-bogus")], b"plain");
        assert_eq!(Some("pla".to_owned()), decode_text_body(&entity, 3));

        let entity = leaf(&[("Content-Type", "image/png")], b"\x89PNG");
        assert_eq!(None, decode_text_body(&entity, usize::MAX));
    }

    proptest! {
        #[test]
        fn qp_decode_never_fails(
            s in prop::collection::vec(prop::num::u8::ANY, 0..40)
        ) {
            qp_decode(&s);
        }
    }
}
