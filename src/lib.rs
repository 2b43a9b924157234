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

//! The protocol-visible semantics of RFC 3501 over an already-parsed message.
//!
//! Nothing in here does any I/O of its own. Given a MIME `Entity` and
//! whatever flag or criteria state the command layer has at hand, the
//! functions in this crate compute body sections, body structures,
//! envelopes, flag-set updates and search matches, and convert mailbox names
//! to and from modified UTF-7.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod account;
pub mod mime;
pub mod support;

#[cfg(test)]
mod test_data;

pub use crate::account::flags::apply_store;
pub use crate::account::model::{
    Flag, FlagCriteria, SearchCriteria, StoreItem, StoreOp,
};
pub use crate::account::search::{
    matches, matches_flags, matches_message, matches_with,
};
pub use crate::mime::entity::{Entity, Header};
pub use crate::support::error::Error;
