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

//! Locating parts of a message and extracting `BODY[...]` sections.
//!
//! Each part of a multipart is assigned a number, starting at 1. Parts can be
//! addressed by multiple subscripts, such that, e.g., `2.3` is the third
//! sub-part of the second part. Only multiparts have numbered children; a
//! subscript applied to anything else does not exist.
//!
//! After zero or more subscripts comes a subsection specifier:
//!
//! - Nothing. At top level, this fetches the whole message. For any other
//!   part, it fetches the part content, as RFC 3501 requires.
//!
//! - `HEADER`. Fetches the header of the addressed entity, optionally
//!   filtered by a list of field names.
//!
//! - `MIME`. Fetches the header of the addressed entity. Only meaningful for
//!   nested parts, but not rejected at top level.
//!
//! - `TEXT`. Fetches the content of the addressed entity.
//!
//! `message/rfc822` parts are opaque leaves here; they are not transparently
//! descended into.

use std::fmt;
use std::io;

use log::debug;
use memchr::memchr;

use crate::mime::entity::{write_field, Entity};
use crate::support::error::Error;

/// Which portion of the addressed entity to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionSpecifier {
    /// The whole message at top level, the content for nested parts.
    Entire,
    /// The header block.
    Header,
    /// The header block of a nested part.
    Mime,
    /// The content, without the header.
    Text,
}

impl SectionSpecifier {
    fn include_header(self, top_level: bool) -> bool {
        match self {
            Self::Entire => top_level,
            Self::Header | Self::Mime => true,
            Self::Text => false,
        }
    }

    fn include_body(self) -> bool {
        match self {
            Self::Entire | Self::Text => true,
            Self::Header | Self::Mime => false,
        }
    }
}

/// A byte range restriction on a fetched section.
///
/// Both ends are clamped to the actual data; a `start` beyond the end yields
/// an empty result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Partial {
    pub start: u64,
    /// The maximum number of bytes to return, or `None` to return
    /// everything after `start`.
    pub length: Option<u64>,
}

/// Identifies a particular portion of the body to fetch.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BodySection {
    /// Which subscripts to traverse to find the part in question.
    pub subscripts: Vec<u32>,
    /// Which subsection of the part to read.
    pub specifier: SectionSpecifier,
    /// Apply filtering to these header names.
    pub header_filter: Vec<String>,
    /// If true, discard headers matching `header_filter`.
    ///
    /// If false, keep only headers matching that filter.
    pub discard_matching_headers: bool,
    /// If set, slice the data produced by the above to this range.
    pub partial: Option<Partial>,
}

impl Default for BodySection {
    fn default() -> Self {
        BodySection {
            subscripts: vec![],
            specifier: SectionSpecifier::Entire,
            header_filter: vec![],
            discard_matching_headers: false,
            partial: None,
        }
    }
}

/// Formats the section the way it is reported in a `FETCH` response, e.g.,
/// `BODY[1.2.HEADER.FIELDS (FROM TO)]<0>`.
impl fmt::Display for BodySection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BODY[")?;
        for (ix, subscript) in self.subscripts.iter().enumerate() {
            if ix > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", subscript)?;
        }

        let specifier = match self.specifier {
            SectionSpecifier::Entire => "",
            SectionSpecifier::Header if self.header_filter.is_empty() => {
                "HEADER"
            },
            SectionSpecifier::Header if self.discard_matching_headers => {
                "HEADER.FIELDS.NOT"
            },
            SectionSpecifier::Header => "HEADER.FIELDS",
            SectionSpecifier::Mime => "MIME",
            SectionSpecifier::Text => "TEXT",
        };

        if !specifier.is_empty() {
            if !self.subscripts.is_empty() {
                write!(f, ".")?;
            }
            write!(f, "{}", specifier)?;
        }

        if SectionSpecifier::Header == self.specifier
            && !self.header_filter.is_empty()
        {
            write!(f, " (")?;
            for (ix, name) in self.header_filter.iter().enumerate() {
                if ix > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", name.to_ascii_uppercase())?;
            }
            write!(f, ")")?;
        }

        write!(f, "]")?;

        if let Some(partial) = self.partial {
            write!(f, "<{}>", partial.start)?;
        }

        Ok(())
    }
}

/// A section which was successfully fetched.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchedBodySection {
    /// The data from this section.
    pub data: Vec<u8>,
    /// Whether this section contains a NUL byte.
    ///
    /// RFC 3516 recommends only using the literal8 syntax when there is at
    /// least one NUL byte.
    pub contains_nul: bool,
}

impl fmt::Debug for FetchedBodySection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FetchedBodySection")
            .field("data", &String::from_utf8_lossy(&self.data))
            .field("contains_nul", &self.contains_nul)
            .finish()
    }
}

/// Find the entity addressed by `subscripts` within `root`.
///
/// An empty subscript list addresses `root` itself. Fails with
/// `Error::NoSuchPart` if any subscript is 0, is applied to a non-multipart,
/// or exceeds the number of children.
pub fn locate<'a>(
    root: &'a Entity,
    subscripts: &[u32],
) -> Result<&'a Entity, Error> {
    subscripts.iter().try_fold(root, |entity, &subscript| {
        let parts = entity.parts().ok_or(Error::NoSuchPart)?;
        subscript
            .checked_sub(1)
            .and_then(|ix| parts.get(ix as usize))
            .ok_or(Error::NoSuchPart)
    })
}

impl BodySection {
    /// Extract this section from the message `root`.
    ///
    /// Every call produces a fresh buffer.
    pub fn fetch(&self, root: &Entity) -> Result<FetchedBodySection, Error> {
        let entity = locate(root, &self.subscripts).map_err(|e| {
            debug!("Nonexistent section {} requested", self);
            e
        })?;

        let mut data = Vec::new();
        if self.specifier.include_header(self.subscripts.is_empty()) {
            for (name, value) in entity.header().iter() {
                if self.keep_header(name) {
                    write_field(&mut data, name, value)?;
                }
            }
            data.extend_from_slice(b"\r\n");
        }

        if self.specifier.include_body() {
            io::copy(&mut entity.body_reader(), &mut data)?;
        }

        if let Some(partial) = self.partial {
            slice_partial(&mut data, partial);
        }

        Ok(FetchedBodySection {
            contains_nul: memchr(0, &data).is_some(),
            data,
        })
    }

    fn keep_header(&self, name: &str) -> bool {
        if self.header_filter.is_empty() {
            return true;
        }

        let matches_filter = self
            .header_filter
            .iter()
            .any(|h| name.eq_ignore_ascii_case(h));
        matches_filter != self.discard_matching_headers
    }
}

fn slice_partial(data: &mut Vec<u8>, partial: Partial) {
    let len = data.len() as u64;
    let start = partial.start.min(len);
    let end = partial
        .length
        .map_or(len, |length| start.saturating_add(length).min(len));

    data.truncate(end as usize);
    data.drain(..start as usize);
}
