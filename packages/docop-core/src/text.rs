use serde::{Deserialize, Serialize};

use crate::error::{Conflict, Error, Result};
use crate::object::TransformOptions;

/// Insert or delete a contiguous substring at a character position.
///
/// Positions count characters, not bytes, so operations computed against one
/// copy of a text apply cleanly to any other copy regardless of encoding
/// width.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOperation {
    Insert { pos: usize, text: String },
    Delete { pos: usize, text: String },
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of character position `pos`, or `None` when `pos` exceeds the
/// character count.
fn byte_index(s: &str, pos: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(pos)
}

/// Character-range slice with clamping at both ends.
fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let n = char_len(s);
    let start = start.min(n);
    let end = end.max(start).min(n);
    let a = byte_index(s, start).unwrap_or(s.len());
    let b = byte_index(s, end).unwrap_or(s.len());
    &s[a..b]
}

impl TextOperation {
    pub fn insert(pos: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            pos,
            text: text.into(),
        }
    }

    pub fn delete(pos: usize, text: impl Into<String>) -> Self {
        Self::Delete {
            pos,
            text: text.into(),
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            Self::Insert { pos, .. } | Self::Delete { pos, .. } => *pos,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Insert { text, .. } | Self::Delete { text, .. } => text,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }

    pub fn is_nop(&self) -> bool {
        self.text().is_empty()
    }

    /// Splice this edit into `subject`. Deletion removes by length only; the
    /// stored text is kept for inversion and callers may verify it themselves.
    pub fn apply(&self, subject: &str) -> Result<String> {
        match self {
            Self::Insert { pos, text } => {
                let Some(at) = byte_index(subject, *pos) else {
                    return Err(Error::ApplyMismatch(format!(
                        "text is too short for insert at {pos} (length {})",
                        char_len(subject)
                    )));
                };
                let mut out = String::with_capacity(subject.len() + text.len());
                out.push_str(&subject[..at]);
                out.push_str(text);
                out.push_str(&subject[at..]);
                Ok(out)
            }
            Self::Delete { pos, text } => {
                let end = pos + char_len(text);
                let (Some(a), Some(b)) = (byte_index(subject, *pos), byte_index(subject, end))
                else {
                    return Err(Error::ApplyMismatch(format!(
                        "text is too short for delete of {pos}..{end} (length {})",
                        char_len(subject)
                    )));
                };
                let mut out = String::with_capacity(subject.len());
                out.push_str(&subject[..a]);
                out.push_str(&subject[b..]);
                Ok(out)
            }
        }
    }

    pub fn invert(&self) -> Self {
        match self {
            Self::Insert { pos, text } => Self::Delete {
                pos: *pos,
                text: text.clone(),
            },
            Self::Delete { pos, text } => Self::Insert {
                pos: *pos,
                text: text.clone(),
            },
        }
    }

    pub fn has_conflict(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Insert { pos: a, .. }, Self::Insert { pos: b, .. }) => a == b,
            (Self::Delete { pos: ap, text: at }, Self::Delete { pos: bp, text: bt }) => {
                !(*ap >= bp + char_len(bt) || *bp >= ap + char_len(at))
            }
            (Self::Insert { pos: ip, .. }, Self::Delete { pos: dp, text: dt })
            | (Self::Delete { pos: dp, text: dt }, Self::Insert { pos: ip, .. }) => {
                *ip >= *dp && *ip < dp + char_len(dt)
            }
        }
    }

    /// Adjust two concurrent edits so either application order converges.
    ///
    /// `(a', b')` is returned such that `a'` applies on top of `b`'s document
    /// and `b'` on top of `a`'s. Same-position inserts treat the left
    /// argument as applied first.
    pub fn transform(a: &Self, b: &Self, options: TransformOptions) -> Result<(Self, Self)> {
        if options.no_conflict && a.has_conflict(b) {
            return Err(Error::Conflict(Conflict::new(a, b)));
        }
        use TextOperation::*;
        let pair = match (a, b) {
            (Insert { pos: ap, text: at }, Insert { pos: bp, text: bt }) => {
                if ap <= bp {
                    (
                        a.clone(),
                        Insert {
                            pos: bp + char_len(at),
                            text: bt.clone(),
                        },
                    )
                } else {
                    (
                        Insert {
                            pos: ap + char_len(bt),
                            text: at.clone(),
                        },
                        b.clone(),
                    )
                }
            }
            (Delete { pos: ap, text: at }, Delete { pos: bp, text: bt }) => {
                let ((ap2, at2), (bp2, bt2)) =
                    transform_delete_delete((*ap, at), (*bp, bt), options);
                (
                    Delete {
                        pos: ap2,
                        text: at2,
                    },
                    Delete {
                        pos: bp2,
                        text: bt2,
                    },
                )
            }
            (Insert { pos: ip, text: it }, Delete { pos: dp, text: dt }) => {
                let ((ip2, it2), (dp2, dt2)) = transform_insert_delete((*ip, it), (*dp, dt));
                (
                    Insert {
                        pos: ip2,
                        text: it2,
                    },
                    Delete {
                        pos: dp2,
                        text: dt2,
                    },
                )
            }
            (Delete { pos: dp, text: dt }, Insert { pos: ip, text: it }) => {
                let ((ip2, it2), (dp2, dt2)) = transform_insert_delete((*ip, it), (*dp, dt));
                (
                    Delete {
                        pos: dp2,
                        text: dt2,
                    },
                    Insert {
                        pos: ip2,
                        text: it2,
                    },
                )
            }
        };
        Ok(pair)
    }
}

type Span = (usize, String);

fn transform_delete_delete(a: (usize, &str), b: (usize, &str), options: TransformOptions) -> (Span, Span) {
    let (ap, at) = a;
    let (bp, bt) = b;
    let alen = char_len(at);
    let blen = char_len(bt);
    // normalize: a starts first and is the shorter side on equal positions
    if ap > bp || (ap == bp && alen > blen) {
        let (b2, a2) = transform_delete_delete(b, a, options);
        return (a2, b2);
    }
    if ap == bp && alen == blen {
        // identical ranges cancel each other out; a rebase replays history
        // and must keep the pending delete intact
        if options.rebase {
            return ((ap, at.to_string()), (bp, bt.to_string()));
        }
        return ((ap, String::new()), (bp, String::new()));
    }
    if bp < ap + alen {
        // overlapping ranges are mutually clipped
        let s = bp - ap;
        let kept = format!("{}{}", char_slice(at, 0, s), char_slice(at, s + blen, alen));
        let tail = char_slice(bt, alen - s, blen).to_string();
        ((ap, kept), (ap, tail))
    } else {
        ((ap, at.to_string()), (bp - alen, bt.to_string()))
    }
}

/// Returns `(insert', delete')` regardless of the caller's argument order.
fn transform_insert_delete(ins: (usize, &str), del: (usize, &str)) -> (Span, Span) {
    let (ip, it) = ins;
    let (dp, dt) = del;
    let ilen = char_len(it);
    let dlen = char_len(dt);
    if ip <= dp {
        ((ip, it.to_string()), (dp + ilen, dt.to_string()))
    } else if ip >= dp + dlen {
        ((ip - dlen, it.to_string()), (dp, dt.to_string()))
    } else {
        // the insert falls inside the deleted range: the deleted text absorbs
        // it and the insert is zeroed out
        let s = ip - dp;
        let spliced = format!("{}{}{}", char_slice(dt, 0, s), it, char_slice(dt, s, dlen));
        ((ip, String::new()), (dp, spliced))
    }
}
