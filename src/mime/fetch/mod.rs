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

//! Everything needed to answer the data items of the IMAP `FETCH` command,
//! plus the data source for `SEARCH`.
//!
//! ## Regarding message layout
//!
//! IMAP defines a mechanism to access parts of a message based on its
//! multipart hierarchy. Each part of a multipart is assigned a number,
//! starting at 1. Parts can be addressed by multiple subscripts, such that,
//! e.g., `2.3` is the third sub-part of the second part.
//!
//! After zero or more subscripts, we get a final section specifier:
//!
//! - Nothing. At top level, this fetches the whole message. For any other
//!   part, it fetches the part content.
//!
//! - `HEADER`, optionally filtered with `.FIELDS` or `.FIELDS.NOT`. This
//!   fetches the header of the addressed entity.
//!
//! - `MIME`. This also fetches the header of the addressed entity; it is
//!   only meaningful below the top level.
//!
//! - `TEXT`. This fetches the raw body of the addressed entity.
//!
//! Unlike a full RFC 3501 server, we do not descend into `message/rfc822`
//! parts; they are leaves like any other non-multipart entity, and a
//! subscript applied to a leaf names a part which does not exist.

pub mod bodystructure;
pub mod envelope;
pub mod search;
pub mod section;
pub mod strings;
