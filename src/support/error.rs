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

use std::io;

use thiserror::Error;

use crate::mime::utf7;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No such message part")]
    NoSuchPart,
    #[error("Non-existent flag")]
    NxFlag,
    #[error("Unsafe flag or keyword name")]
    UnsafeName,
    #[error("Unknown STORE operation")]
    BadStoreOperation,
    #[error(transparent)]
    Utf7(#[from] utf7::DecodeError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
