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

//! Owned representations of RFC 2822 address syntax.
//!
//! Words and atoms are kept as raw bytes, split the way they appeared on the
//! wire; joining and RFC 2047 decoding happen in `fetch::strings`.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddrSpec {
    /// The dot-separated words of the local part.
    pub local: Vec<Vec<u8>>,
    /// The dot-separated atoms of the domain, or a single domain literal.
    /// Empty if the address had no `@`.
    pub domain: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailboxSpec {
    pub addr: AddrSpec,
    /// The words of the display name, if any.
    pub name: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: Vec<Vec<u8>>,
    pub boxes: Vec<MailboxSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    Mailbox(MailboxSpec),
    Group(GroupSpec),
}

impl Address {
    /// Iterate the mailboxes this address designates.
    ///
    /// A mailbox designates itself; a group designates its members.
    pub fn mailboxes(&self) -> impl Iterator<Item = &MailboxSpec> + '_ {
        let slice = match *self {
            Address::Mailbox(ref m) => std::slice::from_ref(m),
            Address::Group(ref g) => &g.boxes[..],
        };
        slice.iter()
    }
}
