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

//! The in-memory MIME entity tree everything else operates on.

use std::io::{self, Cursor, Write};
use std::iter::FromIterator;
use std::str;

use log::{debug, warn};
use memchr::memchr;

use super::header::{self, ContentDisposition, ContentType};
use crate::support::system_config::ParseConfig;

/// The header block of an entity.
///
/// Fields are kept in their original order. Names are matched
/// case-insensitively. Values are raw bytes with the leading whitespace
/// after the colon removed; folded values keep their internal line breaks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    fields: Vec<(String, Vec<u8>)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field to the end of the header.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Return the value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
    }

    /// Return the values of every field called `name`, in order.
    pub fn get_all<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.fields
            .iter()
            .filter(move |&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.fields.iter().map(|&(ref n, ref v)| (n.as_str(), &v[..]))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Write every field as `Name: value\r\n`.
    ///
    /// The blank line that terminates a header block is not written.
    pub fn write_to(&self, mut w: impl Write) -> io::Result<()> {
        for (name, value) in self.iter() {
            write_field(&mut w, name, value)?;
        }
        Ok(())
    }

    /// The parsed `Content-Type`, if present and valid.
    pub fn content_type(&self) -> Option<ContentType> {
        self.get("Content-Type").and_then(header::parse_content_type)
    }

    /// The parsed `Content-Disposition`, if present and valid.
    pub fn content_disposition(&self) -> Option<ContentDisposition> {
        self.get("Content-Disposition")
            .and_then(header::parse_content_disposition)
    }

    /// Parse a raw header field (everything but the final line ending) and
    /// add it, or discard it with a debug log if it can't be split into a
    /// name and value.
    fn push_raw(&mut self, raw: &[u8]) {
        let colon = match memchr(b':', raw) {
            Some(colon) => colon,
            None => {
                debug!(
                    "Skipping header line without colon: {:?}",
                    String::from_utf8_lossy(raw)
                );
                return;
            },
        };

        let name = match str::from_utf8(&raw[..colon]) {
            Ok(name) => name.trim(),
            Err(_) => "",
        };
        if name.is_empty() || name.contains(|c: char| c.is_ascii_whitespace())
        {
            debug!(
                "Skipping header line with bad name: {:?}",
                String::from_utf8_lossy(raw)
            );
            return;
        }

        let value = &raw[colon + 1..];
        let leading_ws = value
            .iter()
            .take_while(|&&b| b' ' == b || b'\t' == b)
            .count();
        self.push(name, &value[leading_ws..]);
    }
}

impl<N: Into<String>, V: Into<Vec<u8>>> FromIterator<(N, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (name, value) in iter {
            header.push(name, value);
        }
        header
    }
}

pub(crate) fn write_field(
    mut w: impl Write,
    name: &str,
    value: &[u8],
) -> io::Result<()> {
    write!(w, "{}: ", name)?;
    w.write_all(value)?;
    w.write_all(b"\r\n")
}

/// A node in a MIME message tree.
///
/// Every entity has a header and its raw body bytes. A multipart entity
/// whose body could be split additionally has its children. The raw body of
/// a multipart is kept since it is what `TEXT` of such an entity refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    header: Header,
    content_type: ContentType,
    body: Vec<u8>,
    parts: Option<Vec<Entity>>,
}

impl Entity {
    /// Create a leaf entity.
    pub fn new(header: Header, body: impl Into<Vec<u8>>) -> Self {
        let content_type = header
            .content_type()
            .unwrap_or_else(ContentType::default_text);
        Entity {
            header,
            content_type,
            body: body.into(),
            parts: None,
        }
    }

    /// Create a multipart entity from its raw body and already-split
    /// children.
    pub fn with_parts(
        header: Header,
        body: impl Into<Vec<u8>>,
        parts: Vec<Entity>,
    ) -> Self {
        Entity {
            parts: Some(parts),
            ..Entity::new(header, body)
        }
    }

    /// Parse a complete message with the default limits.
    pub fn parse(data: &[u8]) -> Self {
        Self::parse_with(data, &ParseConfig::default())
    }

    /// Parse a complete message.
    ///
    /// This never fails. Anything which isn't valid MIME ends up somewhere as
    /// opaque bytes.
    pub fn parse_with(data: &[u8], config: &ParseConfig) -> Self {
        let mut parser = Parser {
            config,
            part_count: 0,
        };
        parser.parse(data, 0, ContentType::default_text())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The content type of this entity, which is the implied default if the
    /// header does not declare a valid one.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Return a reader over the body, positioned at its start.
    ///
    /// Every call produces an independent reader.
    pub fn body_reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.body[..])
    }

    /// The children of this entity, if it is a multipart.
    pub fn parts(&self) -> Option<&[Entity]> {
        self.parts.as_ref().map(|p| &p[..])
    }

    pub fn is_multipart(&self) -> bool {
        self.parts.is_some()
    }
}

struct Parser<'a> {
    config: &'a ParseConfig,
    part_count: u32,
}

impl Parser<'_> {
    fn parse(
        &mut self,
        data: &[u8],
        depth: u32,
        default_content_type: ContentType,
    ) -> Entity {
        let (header, body) = split_header(data);
        let content_type =
            header.content_type().unwrap_or(default_content_type);
        let parts = self.parse_parts(&content_type, body, depth);

        Entity {
            header,
            content_type,
            body: body.to_vec(),
            parts,
        }
    }

    fn parse_parts(
        &mut self,
        content_type: &ContentType,
        body: &[u8],
        depth: u32,
    ) -> Option<Vec<Entity>> {
        if !content_type.is_type("multipart") {
            return None;
        }

        let boundary = content_type.parm("boundary")?;
        if depth >= self.config.max_recursion {
            warn!(
                "Multipart nested more than {} levels deep, \
                 treating as a leaf",
                self.config.max_recursion
            );
            return None;
        }

        let child_default = if content_type.is_subtype("digest") {
            ContentType {
                typ: "message".to_owned(),
                subtype: "rfc822".to_owned(),
                parms: vec![],
            }
        } else {
            ContentType::default_text()
        };

        let mut parts = Vec::new();
        for raw in split_multipart(body, boundary.as_bytes()) {
            if self.part_count >= self.config.max_parts {
                warn!(
                    "Message has more than {} parts, ignoring the rest",
                    self.config.max_parts
                );
                break;
            }

            self.part_count += 1;
            parts.push(self.parse(raw, depth + 1, child_default.clone()));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts)
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Iterate the lines of `data`, each including its line ending (if any), in
/// the form `(offset, line)`.
fn lines(data: &[u8]) -> impl Iterator<Item = (usize, &[u8])> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= data.len() {
            return None;
        }

        let start = pos;
        pos = memchr(b'\n', &data[start..])
            .map_or(data.len(), |e| start + e + 1);
        Some((start, &data[start..pos]))
    })
}

/// Split `data` into its header and body.
///
/// The header ends at the first empty line. If there is none, the whole
/// input is header and the body is empty.
fn split_header(data: &[u8]) -> (Header, &[u8]) {
    let mut header = Header::new();
    let mut current: Option<Vec<u8>> = None;
    let mut body_start = data.len();

    for (start, line) in lines(data) {
        let content = strip_line_ending(line);
        if content.is_empty() {
            body_start = start + line.len();
            break;
        }

        if content.starts_with(b" ") || content.starts_with(b"\t") {
            match current {
                Some(ref mut field) => {
                    field.extend_from_slice(b"\r\n");
                    field.extend_from_slice(content);
                },
                None => debug!(
                    "Skipping continuation line at start of header: {:?}",
                    String::from_utf8_lossy(content)
                ),
            }
            continue;
        }

        if let Some(field) = current.take() {
            header.push_raw(&field);
        }
        current = Some(content.to_vec());
    }

    if let Some(field) = current {
        header.push_raw(&field);
    }

    (header, &data[body_start..])
}

/// If `line` is a delimiter line for the multipart with the given delimiter
/// (`--` + boundary), return whether it is the close delimiter.
fn delimiter_kind(line: &[u8], delimiter: &[u8]) -> Option<bool> {
    if !line.starts_with(delimiter) {
        return None;
    }

    let rest = &line[delimiter.len()..];
    let (is_close, padding) = match rest.strip_prefix(b"--") {
        Some(padding) => (true, padding),
        None => (false, rest),
    };

    // Transport padding (RFC 2046 5.1.1)
    if padding.iter().all(|&b| b" \t\r\n".contains(&b)) {
        Some(is_close)
    } else {
        None
    }
}

/// Split a multipart body into the raw bytes of its parts.
///
/// The line ending before each delimiter is part of the delimiter. The
/// preamble and the epilogue are discarded. If the close delimiter is
/// missing, the last part runs to the end of the body.
fn split_multipart<'a>(body: &'a [u8], boundary: &[u8]) -> Vec<&'a [u8]> {
    let mut delimiter = Vec::with_capacity(boundary.len() + 2);
    delimiter.extend_from_slice(b"--");
    delimiter.extend_from_slice(boundary);

    let mut parts = Vec::new();
    let mut part_start = None;
    for (start, line) in lines(body) {
        let is_close = match delimiter_kind(line, &delimiter) {
            Some(is_close) => is_close,
            None => continue,
        };

        if let Some(part_start) = part_start {
            let content = &body[part_start..start];
            let content = content
                .strip_suffix(b"\n")
                .map(|c| c.strip_suffix(b"\r").unwrap_or(c))
                .unwrap_or(content);
            parts.push(content);
        }

        if is_close {
            return parts;
        }

        part_start = Some(start + line.len());
    }

    if let Some(part_start) = part_start {
        parts.push(&body[part_start..]);
    }

    parts
}
