use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Conflict, Error, Result};
use crate::object::TransformOptions;

/// Insert or delete a single element at a position.
///
/// `Nop` is produced by `transform` when two concurrent deletes of the same
/// element cancel out; it is never constructed by editing logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayOperation {
    Insert { pos: usize, val: Value },
    Delete { pos: usize, val: Value },
    Nop,
}

impl ArrayOperation {
    pub fn insert(pos: usize, val: Value) -> Self {
        Self::Insert { pos, val }
    }

    pub fn delete(pos: usize, val: Value) -> Self {
        Self::Delete { pos, val }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, Self::Nop)
    }

    /// Apply to an array. Deletion requires the live element to structurally
    /// equal the stored value; a mismatch signals a diverged document.
    pub fn apply(&self, array: &[Value]) -> Result<Vec<Value>> {
        match self {
            Self::Insert { pos, val } => {
                if array.len() < *pos {
                    return Err(Error::ApplyMismatch(format!(
                        "array is too short for insert at {pos} (length {})",
                        array.len()
                    )));
                }
                let mut out = array.to_vec();
                out.insert(*pos, val.clone());
                Ok(out)
            }
            Self::Delete { pos, val } => {
                match array.get(*pos) {
                    None => {
                        return Err(Error::ApplyMismatch(format!(
                            "array is too short for delete at {pos} (length {})",
                            array.len()
                        )))
                    }
                    Some(live) if live != val => {
                        return Err(Error::ApplyMismatch(format!(
                            "unexpected value at position {pos}: {live}"
                        )))
                    }
                    Some(_) => {}
                }
                let mut out = array.to_vec();
                out.remove(*pos);
                Ok(out)
            }
            Self::Nop => Ok(array.to_vec()),
        }
    }

    pub fn invert(&self) -> Self {
        match self {
            Self::Insert { pos, val } => Self::Delete {
                pos: *pos,
                val: val.clone(),
            },
            Self::Delete { pos, val } => Self::Insert {
                pos: *pos,
                val: val.clone(),
            },
            Self::Nop => Self::Nop,
        }
    }

    /// Only two concurrent inserts at the same position need a policy
    /// decision; same-position deletes have a defined result (both cancel).
    pub fn has_conflict(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Insert { pos: a, .. }, Self::Insert { pos: b, .. }) if a == b
        )
    }

    /// Adjust two concurrent single-element edits so either application order
    /// converges. Same-position inserts treat the left argument as applied
    /// first.
    pub fn transform(a: &Self, b: &Self, options: TransformOptions) -> Result<(Self, Self)> {
        if options.no_conflict && a.has_conflict(b) {
            return Err(Error::Conflict(Conflict::new(a, b)));
        }
        use ArrayOperation::*;
        let pair = match (a, b) {
            (Nop, _) | (_, Nop) => (a.clone(), b.clone()),
            (Insert { pos: ap, .. }, Insert { pos: bp, .. }) => {
                if ap <= bp {
                    (a.clone(), b.shifted(bp + 1))
                } else {
                    (a.shifted(ap + 1), b.clone())
                }
            }
            (Delete { pos: ap, .. }, Delete { pos: bp, .. }) => {
                if ap == bp {
                    // a rebase replays pending history and must keep the
                    // pending delete intact
                    if options.rebase {
                        (a.clone(), b.clone())
                    } else {
                        (Nop, Nop)
                    }
                } else if ap < bp {
                    (a.clone(), b.shifted(bp - 1))
                } else {
                    (a.shifted(ap - 1), b.clone())
                }
            }
            (Insert { pos: ip, .. }, Delete { pos: dp, .. }) => {
                if ip <= dp {
                    (a.clone(), b.shifted(dp + 1))
                } else {
                    (a.shifted(ip - 1), b.clone())
                }
            }
            (Delete { pos: dp, .. }, Insert { pos: ip, .. }) => {
                if ip <= dp {
                    (a.shifted(dp + 1), b.clone())
                } else {
                    (a.clone(), b.shifted(ip - 1))
                }
            }
        };
        Ok(pair)
    }

    fn shifted(&self, pos: usize) -> Self {
        match self {
            Self::Insert { val, .. } => Self::Insert {
                pos,
                val: val.clone(),
            },
            Self::Delete { val, .. } => Self::Delete {
                pos,
                val: val.clone(),
            },
            Self::Nop => Self::Nop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn converges(a: &ArrayOperation, b: &ArrayOperation, input: &[Value]) -> Vec<Value> {
        let (a2, b2) = ArrayOperation::transform(a, b, TransformOptions::default()).unwrap();
        let ab = b2.apply(&a.apply(input).unwrap()).unwrap();
        let ba = a2.apply(&b.apply(input).unwrap()).unwrap();
        assert_eq!(ab, ba);
        ab
    }

    #[test]
    fn applies_insert() {
        let op = ArrayOperation::insert(2, json!(3));
        let out = op.apply(&[json!(1), json!(2), json!(4)]).unwrap();
        assert_eq!(out, vec![json!(1), json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn delete_verifies_value() {
        let arr = [json!(1), json!(2), json!(4)];
        let ok = ArrayOperation::delete(1, json!(2));
        assert_eq!(ok.apply(&arr).unwrap(), vec![json!(1), json!(4)]);
        let stale = ArrayOperation::delete(1, json!(9));
        assert!(matches!(stale.apply(&arr), Err(Error::ApplyMismatch(_))));
        let oob = ArrayOperation::delete(5, json!(1));
        assert!(matches!(oob.apply(&arr), Err(Error::ApplyMismatch(_))));
    }

    #[test]
    fn inverts() {
        let arr = [json!(1), json!(2)];
        let op = ArrayOperation::insert(1, json!(9));
        let applied = op.apply(&arr).unwrap();
        assert_eq!(op.invert().apply(&applied).unwrap(), arr.to_vec());
    }

    #[test]
    fn same_position_inserts_conflict_and_keep_left_first() {
        let a = ArrayOperation::insert(2, json!("a"));
        let b = ArrayOperation::insert(2, json!("b"));
        assert!(a.has_conflict(&b));
        let input = [json!(1), json!(2), json!(3)];
        assert_eq!(
            converges(&a, &b, &input),
            vec![json!(1), json!(2), json!("a"), json!("b"), json!(3)]
        );
    }

    #[test]
    fn same_position_deletes_cancel_without_conflict() {
        let a = ArrayOperation::delete(1, json!(2));
        let b = ArrayOperation::delete(1, json!(2));
        assert!(!a.has_conflict(&b));
        let (a2, b2) = ArrayOperation::transform(&a, &b, TransformOptions::default()).unwrap();
        assert!(a2.is_nop());
        assert!(b2.is_nop());
        assert_eq!(converges(&a, &b, &[json!(1), json!(2), json!(3)]), vec![
            json!(1),
            json!(3)
        ]);
    }

    #[test]
    fn rebase_keeps_same_position_deletes() {
        let a = ArrayOperation::delete(1, json!(2));
        let b = ArrayOperation::delete(1, json!(2));
        let rebase = TransformOptions {
            rebase: true,
            ..Default::default()
        };
        let (a2, b2) = ArrayOperation::transform(&a, &b, rebase).unwrap();
        assert_eq!(a2, a);
        assert_eq!(b2, b);
    }

    #[test]
    fn insert_delete_shift() {
        let input = [json!("a"), json!("b"), json!("c")];
        let ins = ArrayOperation::insert(1, json!("X"));
        let del = ArrayOperation::delete(2, json!("c"));
        assert_eq!(
            converges(&ins, &del, &input),
            vec![json!("a"), json!("X"), json!("b")]
        );
        let del_front = ArrayOperation::delete(0, json!("a"));
        assert_eq!(
            converges(&ins, &del_front, &input),
            vec![json!("X"), json!("b"), json!("c")]
        );
    }

    #[test]
    fn distinct_deletes_shift() {
        let input = [json!("a"), json!("b"), json!("c")];
        let a = ArrayOperation::delete(0, json!("a"));
        let b = ArrayOperation::delete(2, json!("c"));
        assert_eq!(converges(&a, &b, &input), vec![json!("b")]);
    }

    #[test]
    fn strict_mode_raises_conflict() {
        let a = ArrayOperation::insert(2, json!("a"));
        let b = ArrayOperation::insert(2, json!("b"));
        let strict = TransformOptions {
            no_conflict: true,
            ..Default::default()
        };
        assert!(matches!(
            ArrayOperation::transform(&a, &b, strict),
            Err(Error::Conflict(_))
        ));
    }
}
