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

//! Sample messages shared by the unit tests.
//!
//! They are written with bare LF line endings for legibility; `crlf()`
//! converts them to what actually goes over the wire.

use crate::mime::entity::Entity;

/// Body of part 1.1 of `MULTIPART_MIXED`.
pub const PLAIN_TEXT: &str =
    "The engine may act upon other things besides number.";

/// A multipart/mixed message whose first part is a multipart/alternative
/// and whose second part is an attachment.
pub const MULTIPART_MIXED: &str = "\
From: \"Ada Lovelace\" <ada@analytical.example>
Sender: secretary@analytical.example
To: charles@engine.example, =?utf-8?q?J=C3=B6rg?= <joerg@example.de>
Cc: Reviewers: menabrea@turin.example;
Subject: =?utf-8?q?Notes_on_the_Engine_=C2=A7?= 1
Date: Tue, 14 Apr 2020 09:30:00 +0100
Message-ID: <notes.1@analytical.example>
In-Reply-To: <q.7@engine.example>
X-Priority: 3
MIME-Version: 1.0
Content-Type: multipart/mixed; boundary=\"outer\"

This is a multi-part message in MIME format.
--outer
Content-Type: multipart/alternative; boundary=inner

--inner
Content-Type: text/plain; charset=utf-8
Content-Transfer-Encoding: 7bit

The engine may act upon other things besides number.
--inner
Content-Type: text/html; charset=utf-8

<p>The engine may act upon other things besides number.</p>
--inner--
--outer
Content-Type: text/plain; name=table.txt
Content-Disposition: attachment; filename=table.txt
Content-ID: <table@analytical.example>
Content-Description: Table of =?utf-8?q?B=C3=A9rnoulli?= numbers
Content-Language: en
Content-Location: http://analytical.example/table.txt
Content-Transfer-Encoding: quoted-printable

B1 =3D 1/6
B2 =3D -1/30
--outer--
Epilogue is ignored.
";

/// A message with a deeper tree, in the spirit of the example on page 56 of
/// RFC 3501:
///
/// ```text
/// multipart/mixed
///   1 text/plain
///   2 application/octet-stream
///   3 message/rfc822
///   4 multipart/mixed
///     4.1 image/gif
///     4.2 multipart/alternative
///       4.2.1 text/plain
///       4.2.2 multipart/related
///         4.2.2.1 text/html
///         4.2.2.2 image/png
/// ```
pub const DEEPLY_NESTED: &str = "\
Subject: Nesting
Content-Type: multipart/mixed; boundary=top

--top

Part 1
--top
Content-Type: application/octet-stream

Part 2
--top
Content-Type: message/rfc822

Subject: Part 3

Part 3 body
--top
Content-Type: multipart/mixed; boundary=p4

--p4
Content-Type: image/gif
Content-ID: <4.1>

Part 4.1
--p4
Content-Type: multipart/alternative; boundary=p42

--p42
Content-Type: text/plain

Part 4.2.1
--p42
Content-Type: multipart/related; boundary=p422

--p422
Content-Type: text/html

Part 4.2.2.1
--p422
Content-Type: image/png

Part 4.2.2.2
--p422--
--p42--
--p4--
--top--
";

/// A message with hardly any headers at all.
pub const MINIMAL: &str = "\
From: nobody
Subject: plain

Nothing to see here.
";

/// Convert LF line endings to CRLF.
pub fn crlf(message: &str) -> Vec<u8> {
    message.replace('\n', "\r\n").into_bytes()
}

/// Parse one of the sample messages after converting it to CRLF.
pub fn parse_sample(message: &str) -> Entity {
    Entity::parse(&crlf(message))
}
