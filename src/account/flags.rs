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

use super::model::{Flag, StoreOp};

/// Compute the flags of a message after applying a `STORE` operation.
///
/// - `Set` returns `operand` exactly.
///
/// - `Add` appends each member of `operand` not already present, keeping the
///   existing flags in order.
///
/// - `Remove` drops every flag equal to any member of `operand`, keeping the
///   rest in order.
///
/// Flags which were duplicated in `current` are left alone by `Add`; no edit
/// introduces a new duplicate.
///
/// `Set` replaces `\Recent` along with everything else; the command layer is
/// responsible for keeping it if it tracks it in the same list.
pub fn apply_store(
    current: &[Flag],
    op: StoreOp,
    operand: &[Flag],
) -> Vec<Flag> {
    match op {
        StoreOp::Set => operand.to_vec(),
        StoreOp::Add => {
            let mut result = current.to_vec();
            for flag in operand {
                if !result.contains(flag) {
                    result.push(flag.clone());
                }
            }
            result
        },
        StoreOp::Remove => {
            let mut result = current.to_vec();
            result.retain(|flag| !operand.contains(flag));
            result
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kws(names: &[&str]) -> Vec<Flag> {
        names.iter().map(|n| n.parse::<Flag>().unwrap()).collect()
    }

    #[test]
    fn add_never_duplicates() {
        assert_eq!(
            kws(&["a", "b", "c", "d"]),
            apply_store(
                &kws(&["a", "b", "c"]),
                StoreOp::Add,
                &kws(&["a", "d", "b"])
            )
        );
        assert_eq!(
            kws(&["a", "d"]),
            apply_store(&kws(&["a"]), StoreOp::Add, &kws(&["d", "d", "a"]))
        );
    }

    #[test]
    fn remove_deletes_all_matches_in_order() {
        assert_eq!(
            kws(&["c"]),
            apply_store(
                &kws(&["a", "b", "c"]),
                StoreOp::Remove,
                &kws(&["b", "v", "e", "a"])
            )
        );
        assert_eq!(
            kws(&["x", "z"]),
            apply_store(
                &kws(&["y", "x", "y", "z"]),
                StoreOp::Remove,
                &kws(&["y"])
            )
        );
    }

    #[test]
    fn set_returns_operand() {
        assert_eq!(
            kws(&["a", "d", "e"]),
            apply_store(
                &kws(&["a", "b", "c"]),
                StoreOp::Set,
                &kws(&["a", "d", "e"])
            )
        );
    }

    #[test]
    fn system_flags_and_keywords_mix() {
        assert_eq!(
            kws(&["\\Seen", "$Junk", "\\Flagged"]),
            apply_store(
                &kws(&["\\Seen", "$Junk"]),
                StoreOp::Add,
                &kws(&["\\seen", "\\FLAGGED"])
            )
        );
        assert_eq!(
            kws(&["$junk"]),
            apply_store(
                &kws(&["$junk", "\\Seen"]),
                StoreOp::Remove,
                &kws(&["$Junk", "\\Seen"])
            )
        );
    }

    #[test]
    fn operand_is_untouched() {
        let current = kws(&["a", "b", "c"]);
        let operand = kws(&["c", "d"]);
        let before = operand.clone();
        for &op in &[StoreOp::Set, StoreOp::Add, StoreOp::Remove] {
            apply_store(&current, op, &operand);
            assert_eq!(before, operand);
        }
        assert_eq!(kws(&["a", "b", "c"]), current);
    }
}
