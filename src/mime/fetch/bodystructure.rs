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

use memchr::memchr_iter;

use super::strings::decode_unstructured;
use crate::mime::entity::{Entity, Header};

/// The RFC 3501 `BODYSTRUCTURE` structure, sort of.
///
/// The actual `BODYSTRUCTURE` syntax depends on the content type of each
/// part and on whether the client asked for `BODY` or `BODYSTRUCTURE`. This
/// is simply the union of the fields the response layer may need, with the
/// `BODYSTRUCTURE`-only fields split out into `extension`.
///
/// Absent header fields are represented by empty strings.
///
/// The MD5 of the content and the envelope and structure of embedded
/// `message/rfc822` parts are not computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyStructure {
    /// The content type and subtype of this part, lower-case.
    pub content_type: (String, String),
    /// Any parameters on the content type.
    pub content_type_parms: Vec<(String, String)>,
    /// The `Content-ID` header.
    pub content_id: String,
    /// The `Content-Description` header, decoded.
    pub content_description: String,
    /// The `Content-Transfer-Encoding` header.
    pub content_transfer_encoding: String,
    /// The exact length of the content of this part, in encoded form.
    pub size_octets: u64,
    /// The number of lines of the content of this part, in encoded form.
    pub size_lines: u64,
    /// If this is a multipart, the parts it contains.
    pub children: Vec<BodyStructure>,
    /// The extension data, if requested.
    pub extension: Option<BodyExtension>,
}

/// The extension data of a `BODYSTRUCTURE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyExtension {
    /// The `Content-Disposition` of this part, lower-case.
    pub content_disposition: String,
    /// Any parameters on the `Content-Disposition` header.
    pub content_disposition_parms: Vec<(String, String)>,
    /// The `Content-Language` header.
    pub content_language: String,
    /// The `Content-Location` header.
    pub content_location: String,
}

/// Build the body structure of `entity`, mirroring its tree exactly.
///
/// If `extended` is set, every node additionally gets its extension data.
pub fn body_structure(entity: &Entity, extended: bool) -> BodyStructure {
    let header = entity.header();
    let content_type = entity.content_type();
    let body = entity.body();

    BodyStructure {
        content_type: (content_type.typ.clone(), content_type.subtype.clone()),
        content_type_parms: content_type.parms.clone(),
        content_id: trimmed(header, "Content-ID"),
        content_description: header
            .get("Content-Description")
            .map(decode_unstructured)
            .unwrap_or_default(),
        content_transfer_encoding: trimmed(
            header,
            "Content-Transfer-Encoding",
        ),
        size_octets: body.len() as u64,
        // Naïvely counting line endings is sufficient to count lines.
        // Line-oriented formats are generally required to end with a
        // properly-terminated line, so we only compute an arguably incorrect
        // value for things that aren't line-oriented.
        size_lines: memchr_iter(b'\n', body).count() as u64,
        children: entity
            .parts()
            .unwrap_or(&[])
            .iter()
            .map(|part| body_structure(part, extended))
            .collect(),
        extension: if extended {
            Some(extension(header))
        } else {
            None
        },
    }
}

fn extension(header: &Header) -> BodyExtension {
    let (content_disposition, content_disposition_parms) = header
        .content_disposition()
        .map(|cd| (cd.disposition, cd.parms))
        .unwrap_or_default();

    BodyExtension {
        content_disposition,
        content_disposition_parms,
        content_language: trimmed(header, "Content-Language"),
        content_location: trimmed(header, "Content-Location"),
    }
}

fn trimmed(header: &Header, name: &str) -> String {
    header
        .get(name)
        .map(|v| String::from_utf8_lossy(v).trim().to_owned())
        .unwrap_or_default()
}
