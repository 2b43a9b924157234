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

//! IMAP's "modified UTF-7", as set by RFC 3501 section 5.1.3.
//!
//! Printable ASCII other than `&` represents itself. `&` is written as `&-`.
//! Everything else is written as UTF-16BE, base64-encoded with `,` in place
//! of `/` and no padding, between `&` and `-`.
//!
//! Unlike the permissive decoders usually found in mail clients, `decode`
//! rejects every input that a conforming encoder could not have produced.

use std::borrow::Cow;
use std::char;

use thiserror::Error;

const SHIFT_IN: u8 = b'&';
const SHIFT_OUT: u8 = b'-';

/// The reason a modified UTF-7 string was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("character outside printable ASCII")]
    IllegalCharacter,
    #[error("invalid character in shift sequence")]
    InvalidShiftCharacter,
    #[error("line break in shift sequence")]
    LineBreakInShift,
    #[error("base64 padding in shift sequence")]
    Padding,
    #[error("shift sequence encodes directly representable text")]
    RedundantShift,
    #[error("unterminated shift sequence")]
    UnterminatedShift,
    #[error("truncated UTF-16 code unit")]
    PartialCodeUnit,
    #[error("unpaired UTF-16 surrogate")]
    UnpairedSurrogate,
    #[error("malformed base64 in shift sequence")]
    BadBase64,
    #[error("shift sequence immediately follows another")]
    NullShift,
}

/// Error returned by `decode`.
///
/// `decoded` holds whatever was decoded before the offending sequence, for
/// callers that want to show the user something.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid modified UTF-7 at byte {offset}: {kind}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub offset: usize,
    pub decoded: String,
}

/// Encode the given string into modified UTF-7.
///
/// The encoded string is minimal: each run of non-direct characters becomes
/// exactly one shift sequence, and only `&` uses the escape form.
pub fn encode(s: &str) -> Cow<'_, str> {
    if s.bytes().all(|b| is_direct(b) && SHIFT_IN != b) {
        return Cow::Borrowed(s);
    }

    let mut transformed = String::with_capacity(s.len() + 8);
    let mut indirect_start = None;
    for (ix, ch) in s.char_indices() {
        let direct = ch.is_ascii() && is_direct(ch as u8);
        if !direct {
            indirect_start.get_or_insert(ix);
            continue;
        }

        if let Some(start) = indirect_start.take() {
            push_shifted(&mut transformed, &s[start..ix]);
        }

        if '&' == ch {
            transformed.push_str("&-");
        } else {
            transformed.push(ch);
        }
    }

    if let Some(start) = indirect_start {
        push_shifted(&mut transformed, &s[start..]);
    }

    Cow::Owned(transformed)
}

fn push_shifted(dst: &mut String, run: &str) {
    let mut buf = Vec::<u8>::with_capacity(run.len() * 2);
    for unit in run.encode_utf16() {
        buf.extend_from_slice(&unit.to_be_bytes());
    }

    dst.push(SHIFT_IN as char);
    dst.push_str(&base64::encode_config(&buf, base64::IMAP_MUTF7));
    dst.push(SHIFT_OUT as char);
}

/// Decode the given modified UTF-7 string.
///
/// Fails on anything a minimal encoder would not produce: bare control or
/// 8-bit characters, base64 padding or foreign characters inside a shift,
/// shifts that are never closed, half code units, lone surrogates, shifts
/// that encode characters which could have been written directly, and
/// adjacent shifts which should have been a single one.
pub fn decode(s: &str) -> Result<Cow<'_, str>, DecodeError> {
    let bytes = s.as_bytes();
    if bytes.iter().all(|&b| is_direct(b) && SHIFT_IN != b) {
        return Ok(Cow::Borrowed(s));
    }

    let mut decoded = String::with_capacity(s.len());
    let mut ix = 0;
    // End of the last base64 shift, not counting the `&-` escape
    let mut shift_end = None;
    while ix < bytes.len() {
        let b = bytes[ix];
        if SHIFT_IN == b {
            let is_escape = Some(&SHIFT_OUT) == bytes.get(ix + 1);
            if !is_escape && Some(ix) == shift_end {
                return Err(DecodeError {
                    kind: DecodeErrorKind::NullShift,
                    offset: ix,
                    decoded,
                });
            }

            let end = decode_shift(bytes, ix, &mut decoded)?;
            if !is_escape {
                shift_end = Some(end);
            }
            ix = end;
        } else if is_direct(b) {
            decoded.push(b as char);
            ix += 1;
        } else {
            return Err(DecodeError {
                kind: DecodeErrorKind::IllegalCharacter,
                offset: ix,
                decoded,
            });
        }
    }

    Ok(Cow::Owned(decoded))
}

/// Decode the shift sequence starting at `start` (which is the `&`) into
/// `dst`, returning the offset just past the closing `-`.
fn decode_shift(
    bytes: &[u8],
    start: usize,
    dst: &mut String,
) -> Result<usize, DecodeError> {
    let fail = |kind, offset, dst: &mut String| {
        Err(DecodeError {
            kind,
            offset,
            decoded: std::mem::take(dst),
        })
    };

    let b64_start = start + 1;
    let b64_end = bytes[b64_start..]
        .iter()
        .position(|&b| !is_base64_char(b))
        .map_or(bytes.len(), |p| b64_start + p);

    match bytes.get(b64_end).copied() {
        Some(SHIFT_OUT) => (),
        None => {
            return fail(DecodeErrorKind::UnterminatedShift, start, dst)
        },
        Some(b'=') => return fail(DecodeErrorKind::Padding, b64_end, dst),
        Some(b'\r') | Some(b'\n') => {
            return fail(DecodeErrorKind::LineBreakInShift, b64_end, dst)
        },
        Some(_) => {
            return fail(DecodeErrorKind::InvalidShiftCharacter, b64_end, dst)
        },
    }

    if b64_start == b64_end {
        // The `&-` escape
        dst.push('&');
        return Ok(b64_end + 1);
    }

    let raw = match base64::decode_config(
        &bytes[b64_start..b64_end],
        base64::IMAP_MUTF7,
    ) {
        Ok(raw) => raw,
        Err(_) => return fail(DecodeErrorKind::BadBase64, b64_start, dst),
    };

    if 0 != raw.len() % 2 {
        return fail(DecodeErrorKind::PartialCodeUnit, b64_start, dst);
    }

    let units = raw.chunks(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
    for ch in char::decode_utf16(units) {
        let ch = match ch {
            Ok(ch) => ch,
            Err(_) => {
                return fail(DecodeErrorKind::UnpairedSurrogate, b64_start, dst)
            },
        };

        if ch.is_ascii() && is_direct(ch as u8) {
            return fail(DecodeErrorKind::RedundantShift, b64_start, dst);
        }

        dst.push(ch);
    }

    Ok(b64_end + 1)
}

fn is_direct(byte: u8) -> bool {
    byte >= b' ' && byte < 0x7F
}

fn is_base64_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || b'+' == ch || b',' == ch
}
