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

//! Parsers for the structured RFC 2822 and RFC 2045 header fields.
//!
//! Everything here operates on raw header values, folding included. The
//! grammars accept the "obsolete" syntax of RFC 2822 section 4 and the 8-bit
//! extensions of RFC 6532, since real mail uses both.

use chrono::prelude::*;
use nom::{
    branch::alt,
    bytes::complete::{
        is_a, is_not, tag_no_case, take, take_while1, take_while_m_n,
    },
    character::complete::char,
    combinator::{map, opt},
    multi::{
        fold_many0, many0, many0_count, many1_count, separated_nonempty_list,
    },
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::model::*;

type PResult<'a, T> = IResult<&'a [u8], T>;

fn ascii_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

// Only ever called on strings already known to be short runs of digits.
fn digits_value(s: &[u8]) -> u32 {
    s.iter()
        .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'))
}

fn lossy(s: &[u8]) -> String {
    String::from_utf8_lossy(s).into_owned()
}

// RFC 2822 3.2.2 "quoted-pair", including the 8-bit "obsolete" syntax
fn quoted_pair(i: &[u8]) -> PResult<'_, &[u8]> {
    preceded(char('\\'), take(1usize))(i)
}

// RFC 2822 3.2.3 "Folding white space". Line endings are just whitespace
// here since the values still carry their folding.
fn fws(i: &[u8]) -> PResult<'_, &[u8]> {
    let (i, _) = is_a(" \t\r\n")(i)?;
    Ok((i, &b" "[..]))
}

// RFC 2822 3.2.3 "Comment text"
fn ctext(i: &[u8]) -> PResult<'_, &[u8]> {
    is_not("()\\ \t\r\n")(i)
}

// RFC 2822 3.2.3 "Comment content", with FWS moved in from "comment"
fn ccontent(i: &[u8]) -> PResult<'_, ()> {
    alt((
        map(ctext, |_| ()),
        map(quoted_pair, |_| ()),
        map(fws, |_| ()),
        comment,
    ))(i)
}

// RFC 2822 3.2.3 "Comment". Recursive.
fn comment(i: &[u8]) -> PResult<'_, ()> {
    map(
        delimited(char('('), many0_count(ccontent), char(')')),
        |_| (),
    )(i)
}

// RFC 2822 3.2.3 "Comment or folding white space". Always succeeds.
fn cfws(i: &[u8]) -> PResult<'_, ()> {
    map(many0_count(alt((map(fws, |_| ()), comment))), |_| ())(i)
}

// RFC 2822 3.2.4 "Atom text", amended by RFC 6532 to include all non-ASCII
fn is_atext(ch: u8) -> bool {
    ch.is_ascii_alphanumeric()
        || b"!#$%&'*+-/=?^_`{|}~".contains(&ch)
        || ch >= 0x80
}

fn atext(i: &[u8]) -> PResult<'_, &[u8]> {
    take_while1(is_atext)(i)
}

// RFC 2822 3.2.4 "Atom"
fn atom(i: &[u8]) -> PResult<'_, &[u8]> {
    delimited(cfws, atext, cfws)(i)
}

// RFC 2822 3.2.5 "Quoted [string] text", amended by RFC 6532
fn qtext(i: &[u8]) -> PResult<'_, &[u8]> {
    is_not(" \t\r\n\\\"")(i)
}

// RFC 2822 3.2.5 "Quoted [string] content", with FWS moved in
fn qcontent(i: &[u8]) -> PResult<'_, &[u8]> {
    alt((qtext, quoted_pair, fws))(i)
}

// RFC 2822 3.2.5 "Quoted string"
fn quoted_string(i: &[u8]) -> PResult<'_, Vec<u8>> {
    delimited(
        pair(cfws, char('"')),
        fold_many0(qcontent, Vec::new(), |mut acc: Vec<u8>, item| {
            acc.extend_from_slice(item);
            acc
        }),
        pair(char('"'), cfws),
    )(i)
}

// RFC 2822 3.2.6 "word"
fn word(i: &[u8]) -> PResult<'_, Vec<u8>> {
    alt((map(atom, |a: &[u8]| a.to_vec()), quoted_string))(i)
}

// The unquoted '.' that RFC 2822 4.1 "obs-phrase" allows in display names.
// There is always a preceding word to absorb leading CFWS.
fn obs_dot(i: &[u8]) -> PResult<'_, Vec<u8>> {
    terminated(map(char('.'), |_| b".".to_vec()), cfws)(i)
}

// RFC 2822 3.2.6 "phrase", plus "obs-phrase"
fn phrase(i: &[u8]) -> PResult<'_, Vec<Vec<u8>>> {
    map(
        pair(word, many0(alt((word, obs_dot)))),
        |(head, mut tail)| {
            tail.insert(0, head);
            tail
        },
    )(i)
}

// RFC 2822 3.3 date and time, including the obsolete forms, which allow CFWS
// between any two tokens.
fn year(i: &[u8]) -> PResult<'_, i32> {
    map(take_while_m_n(2, 4, ascii_digit), |s: &[u8]| {
        let y = digits_value(s) as i32;
        // RFC 2822 4.3
        match s.len() {
            2 if y < 50 => y + 2000,
            2 | 3 => y + 1900,
            _ => y,
        }
    })(i)
}

fn month(i: &[u8]) -> PResult<'_, u32> {
    alt((
        map(tag_no_case("jan"), |_| 1),
        map(tag_no_case("feb"), |_| 2),
        map(tag_no_case("mar"), |_| 3),
        map(tag_no_case("apr"), |_| 4),
        map(tag_no_case("may"), |_| 5),
        map(tag_no_case("jun"), |_| 6),
        map(tag_no_case("jul"), |_| 7),
        map(tag_no_case("aug"), |_| 8),
        map(tag_no_case("sep"), |_| 9),
        map(tag_no_case("oct"), |_| 10),
        map(tag_no_case("nov"), |_| 11),
        map(tag_no_case("dec"), |_| 12),
    ))(i)
}

fn day(i: &[u8]) -> PResult<'_, u32> {
    map(take_while_m_n(1, 2, ascii_digit), digits_value)(i)
}

fn date(i: &[u8]) -> PResult<'_, (i32, u32, u32)> {
    map(
        tuple((
            terminated(day, cfws),
            terminated(month, cfws),
            terminated(year, cfws),
        )),
        |(d, m, y)| (y, m, d),
    )(i)
}

fn two_digit(i: &[u8]) -> PResult<'_, u32> {
    map(take_while_m_n(2, 2, ascii_digit), digits_value)(i)
}

fn colon(i: &[u8]) -> PResult<'_, ()> {
    map(tuple((cfws, char(':'), cfws)), |_| ())(i)
}

// Seconds are optional in RFC 2822 3.3
fn time_of_day(i: &[u8]) -> PResult<'_, (u32, u32, u32)> {
    map(
        terminated(
            tuple((
                two_digit,
                preceded(colon, two_digit),
                opt(preceded(colon, two_digit)),
            )),
            cfws,
        ),
        |(h, m, s)| (h, m, s.unwrap_or(0)),
    )(i)
}

// Zone offsets are in seconds east of UTC
fn numeric_zone(i: &[u8]) -> PResult<'_, i32> {
    map(
        pair(alt((char('+'), char('-'))), take_while_m_n(4, 4, ascii_digit)),
        |(sign, s): (char, &[u8])| {
            let hhmm = digits_value(s) as i32;
            let secs = hhmm / 100 * 3600 + hhmm % 100 * 60;
            if '-' == sign {
                -secs
            } else {
                secs
            }
        },
    )(i)
}

fn zone(i: &[u8]) -> PResult<'_, i32> {
    const HOUR: i32 = 3600;
    alt((
        numeric_zone,
        map(alt((tag_no_case("ut"), tag_no_case("gmt"))), |_| 0),
        // US zones from RFC 822
        map(tag_no_case("edt"), |_| -4 * HOUR),
        map(alt((tag_no_case("est"), tag_no_case("cdt"))), |_| -5 * HOUR),
        map(alt((tag_no_case("cst"), tag_no_case("mdt"))), |_| -6 * HOUR),
        map(alt((tag_no_case("mst"), tag_no_case("pdt"))), |_| -7 * HOUR),
        map(tag_no_case("pst"), |_| -8 * HOUR),
        // Military and unknown zones must be treated as UTC (RFC 2822 4.3)
        map(atext, |_| 0),
    ))(i)
}

fn date_time(
    i: &[u8],
) -> PResult<'_, ((i32, u32, u32), (u32, u32, u32), i32)> {
    preceded(
        // Day of week is optional and ignored
        opt(tuple((atom, char(','), cfws))),
        tuple((preceded(cfws, date), time_of_day, terminated(zone, cfws))),
    )(i)
}

// RFC 2822 3.4.1 local part. `obs-local-part` is a superset of the other
// forms.
fn local_part(i: &[u8]) -> PResult<'_, Vec<Vec<u8>>> {
    separated_nonempty_list(char('.'), word)(i)
}

// RFC 2822 4.4 obsolete domain, which is a superset of dot-atom
fn obs_domain(i: &[u8]) -> PResult<'_, Vec<Vec<u8>>> {
    separated_nonempty_list(char('.'), map(atom, |a: &[u8]| a.to_vec()))(i)
}

// RFC 2822 3.4.1 domain literal, with FWS moved into the content
fn dcontent(i: &[u8]) -> PResult<'_, &[u8]> {
    alt((is_not("[]\\ \t\r\n"), quoted_pair, fws))(i)
}

fn domain_literal(i: &[u8]) -> PResult<'_, Vec<u8>> {
    map(
        delimited(
            pair(cfws, char('[')),
            fold_many0(dcontent, vec![b'['], |mut acc: Vec<u8>, item| {
                acc.extend_from_slice(item);
                acc
            }),
            pair(char(']'), cfws),
        ),
        |mut literal: Vec<u8>| {
            literal.push(b']');
            literal
        },
    )(i)
}

fn domain(i: &[u8]) -> PResult<'_, Vec<Vec<u8>>> {
    alt((obs_domain, map(domain_literal, |d| vec![d])))(i)
}

// RFC 2822 3.4.1 address specification. The domain is optional so that
// bare local names, which some agents still emit, come through with an
// empty domain.
fn addr_spec(i: &[u8]) -> PResult<'_, AddrSpec> {
    map(
        pair(local_part, opt(preceded(char('@'), domain))),
        |(local, domain)| AddrSpec {
            local,
            domain: domain.unwrap_or_default(),
        },
    )(i)
}

// Used in the obsolete list syntax, which allows empty list elements
fn list_delim(i: &[u8]) -> PResult<'_, ()> {
    map(many1_count(tuple((cfws, char(','), cfws))), |_| ())(i)
}

// RFC 2822 4.4 obsolete source route. It is discarded.
fn obs_route(i: &[u8]) -> PResult<'_, ()> {
    map(
        terminated(
            separated_nonempty_list(
                list_delim,
                preceded(pair(cfws, char('@')), domain),
            ),
            char(':'),
        ),
        |_| (),
    )(i)
}

// RFC 2822 3.4 angle-delimited address
fn angle_addr(i: &[u8]) -> PResult<'_, AddrSpec> {
    delimited(
        tuple((cfws, char('<'), opt(obs_route))),
        addr_spec,
        pair(char('>'), cfws),
    )(i)
}

// RFC 2822 3.4 mailbox
fn mailbox(i: &[u8]) -> PResult<'_, MailboxSpec> {
    map(
        alt((
            pair(opt(phrase), angle_addr),
            map(addr_spec, |a| (None::<Vec<Vec<u8>>>, a)),
        )),
        |(name, addr)| MailboxSpec {
            name: name.unwrap_or_default(),
            addr,
        },
    )(i)
}

fn mailbox_list(i: &[u8]) -> PResult<'_, Vec<MailboxSpec>> {
    delimited(
        opt(list_delim),
        separated_nonempty_list(list_delim, mailbox),
        opt(list_delim),
    )(i)
}

// RFC 2822 3.4 group. The terminating ';' is frequently missing in the wild.
fn group(i: &[u8]) -> PResult<'_, GroupSpec> {
    map(
        pair(
            terminated(phrase, char(':')),
            terminated(opt(mailbox_list), tuple((cfws, opt(char(';')), cfws))),
        ),
        |(name, boxes)| GroupSpec {
            name,
            boxes: boxes.unwrap_or_default(),
        },
    )(i)
}

// RFC 2822 3.4 address. A group must be tried first since its display name
// is also a valid bare local part.
fn address(i: &[u8]) -> PResult<'_, Address> {
    alt((map(group, Address::Group), map(mailbox, Address::Mailbox)))(i)
}

fn address_list(i: &[u8]) -> PResult<'_, Vec<Address>> {
    delimited(
        opt(list_delim),
        separated_nonempty_list(list_delim, address),
        opt(list_delim),
    )(i)
}

// RFC 2045 5.1 "token"
fn is_token_char(ch: u8) -> bool {
    ch > b' ' && ch < 0x7F && !b"()<>@,;:\\\"/[]?=".contains(&ch)
}

fn token(i: &[u8]) -> PResult<'_, &[u8]> {
    delimited(cfws, take_while1(is_token_char), cfws)(i)
}

// RFC 2045 5.1 "value". Unquoted values are accepted even when they contain
// tspecials other than ';', since many agents fail to quote them.
fn parm_value(i: &[u8]) -> PResult<'_, String> {
    alt((
        map(quoted_string, |v| lossy(&v)),
        map(terminated(is_not("; \t\r\n\"()"), cfws), lossy),
    ))(i)
}

fn parm(i: &[u8]) -> PResult<'_, (String, String)> {
    preceded(
        pair(char(';'), cfws),
        map(
            separated_pair(token, char('='), parm_value),
            |(name, value)| (lossy(name).to_ascii_lowercase(), value),
        ),
    )(i)
}

fn content_type(i: &[u8]) -> PResult<'_, ContentType> {
    map(
        tuple((token, char('/'), token, many0(parm))),
        |(typ, _, subtype, parms)| ContentType {
            typ: lossy(typ).to_ascii_lowercase(),
            subtype: lossy(subtype).to_ascii_lowercase(),
            parms,
        },
    )(i)
}

fn content_disposition(i: &[u8]) -> PResult<'_, ContentDisposition> {
    map(pair(token, many0(parm)), |(disposition, parms)| {
        ContentDisposition {
            disposition: lossy(disposition).to_ascii_lowercase(),
            parms,
        }
    })(i)
}

/// A parsed `Content-Type` header.
///
/// The type, subtype and parameter names are lower-cased. Parameter values
/// are kept as written, minus quoting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    pub typ: String,
    pub subtype: String,
    pub parms: Vec<(String, String)>,
}

impl ContentType {
    /// The implied content type of an entity without a valid `Content-Type`
    /// header (RFC 2045 5.2).
    pub fn default_text() -> Self {
        ContentType {
            typ: "text".to_owned(),
            subtype: "plain".to_owned(),
            parms: vec![("charset".to_owned(), "us-ascii".to_owned())],
        }
    }

    pub fn is_type(&self, typ: &str) -> bool {
        self.typ.eq_ignore_ascii_case(typ)
    }

    pub fn is_subtype(&self, subtype: &str) -> bool {
        self.subtype.eq_ignore_ascii_case(subtype)
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn parm(&self, name: &str) -> Option<&str> {
        find_parm(&self.parms, name)
    }
}

/// A parsed `Content-Disposition` header (RFC 2183).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDisposition {
    pub disposition: String,
    pub parms: Vec<(String, String)>,
}

impl ContentDisposition {
    pub fn parm(&self, name: &str) -> Option<&str> {
        find_parm(&self.parms, name)
    }
}

fn find_parm<'a>(parms: &'a [(String, String)], name: &str) -> Option<&'a str> {
    parms
        .iter()
        .find(|&&(ref k, _)| k.eq_ignore_ascii_case(name))
        .map(|&(_, ref v)| v.as_str())
}

/// Parse a `Content-Type` header value.
pub fn parse_content_type(value: &[u8]) -> Option<ContentType> {
    content_type(value).ok().map(|(_, ct)| ct)
}

/// Parse a `Content-Disposition` header value.
pub fn parse_content_disposition(value: &[u8]) -> Option<ContentDisposition> {
    content_disposition(value).ok().map(|(_, cd)| cd)
}

/// Parse an RFC 2822 date-time, as found in the `Date` header.
///
/// Returns `None` if the value is not a date-time or names an instant which
/// does not exist.
pub fn parse_datetime(value: &[u8]) -> Option<DateTime<FixedOffset>> {
    let (_, ((year, month, day), (hour, minute, second), zone)) =
        date_time(value).ok()?;
    let offset = FixedOffset::east_opt(zone)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, second)?;
    offset.from_local_datetime(&naive).single()
}

/// Parse an RFC 2822 address list, as found in `From`, `To`, etc.
///
/// Parsing is best-effort: if something unparsable follows a valid prefix,
/// the addresses in the prefix are returned. `None` is returned only if not
/// even one address could be parsed.
pub fn parse_address_list(value: &[u8]) -> Option<Vec<Address>> {
    address_list(value).ok().map(|(_, addrs)| addrs)
}
