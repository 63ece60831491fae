use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::DocumentAdapter;
use crate::array::ArrayOperation;
use crate::coordinate::CoordinateOperation;
use crate::error::{Conflict, Error, Result};
use crate::path::Path;
use crate::text::TextOperation;

/// Per-call flags for `transform`. Never process-wide configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Replaying pending local history atop a newly confirmed state, as
    /// opposed to a live peer exchange. Destructive collapses (e.g. two
    /// deletes cancelling) are skipped so the pending side survives.
    pub rebase: bool,
    /// Fail with `Error::Conflict` instead of resolving conflicting pairs.
    pub no_conflict: bool,
}

impl TransformOptions {
    pub fn rebase() -> Self {
        Self {
            rebase: true,
            no_conflict: false,
        }
    }

    pub fn strict() -> Self {
        Self {
            rebase: false,
            no_conflict: true,
        }
    }
}

/// Value families an `Update` can address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Array,
    Coordinate,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Array => "array",
            Self::Coordinate => "coordinate",
        }
    }
}

/// A primitive operation tagged with the value family it addresses. This is
/// the `diff` payload of `ObjectOperation::Update`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyDiff {
    Text(TextOperation),
    Array(ArrayOperation),
    Coordinate(CoordinateOperation),
}

impl From<TextOperation> for PropertyDiff {
    fn from(op: TextOperation) -> Self {
        Self::Text(op)
    }
}

impl From<ArrayOperation> for PropertyDiff {
    fn from(op: ArrayOperation) -> Self {
        Self::Array(op)
    }
}

impl From<CoordinateOperation> for PropertyDiff {
    fn from(op: CoordinateOperation) -> Self {
        Self::Coordinate(op)
    }
}

impl PropertyDiff {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Text(_) => PropertyType::String,
            Self::Array(_) => PropertyType::Array,
            Self::Coordinate(_) => PropertyType::Coordinate,
        }
    }

    pub fn is_nop(&self) -> bool {
        match self {
            Self::Text(op) => op.is_nop(),
            Self::Array(op) => op.is_nop(),
            Self::Coordinate(op) => op.is_nop(),
        }
    }

    pub fn invert(&self) -> Self {
        match self {
            Self::Text(op) => Self::Text(op.invert()),
            Self::Array(op) => Self::Array(op.invert()),
            Self::Coordinate(op) => Self::Coordinate(op.invert()),
        }
    }

    /// Updates of different value families on the same property always need
    /// a policy decision.
    pub fn has_conflict(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.has_conflict(b),
            (Self::Array(a), Self::Array(b)) => a.has_conflict(b),
            (Self::Coordinate(a), Self::Coordinate(b)) => a.has_conflict(b),
            _ => true,
        }
    }

    /// Apply this diff to the JSON value currently stored at the property.
    /// Coordinates are stored as objects carrying an `"offset"` number.
    pub fn apply_to_value(&self, current: &Value) -> Result<Value> {
        match self {
            Self::Text(op) => {
                let Some(text) = current.as_str() else {
                    return Err(Error::ApplyMismatch(format!(
                        "expected a string value, got {current}"
                    )));
                };
                Ok(Value::String(op.apply(text)?))
            }
            Self::Array(op) => {
                let Some(array) = current.as_array() else {
                    return Err(Error::ApplyMismatch(format!(
                        "expected an array value, got {current}"
                    )));
                };
                Ok(Value::Array(op.apply(array)?))
            }
            Self::Coordinate(op) => {
                let Some(map) = current.as_object() else {
                    return Err(Error::ApplyMismatch(format!(
                        "expected a coordinate object, got {current}"
                    )));
                };
                let Some(offset) = map.get("offset").and_then(Value::as_u64) else {
                    return Err(Error::ApplyMismatch(format!(
                        "coordinate object is missing a numeric offset: {current}"
                    )));
                };
                let shifted = op.shift_offset(offset as usize)?;
                let mut out = map.clone();
                out.insert("offset".into(), Value::from(shifted as u64));
                Ok(Value::Object(out))
            }
        }
    }

    pub fn transform(a: &Self, b: &Self, options: TransformOptions) -> Result<(Self, Self)> {
        match (a, b) {
            (Self::Text(ta), Self::Text(tb)) => {
                let (ta2, tb2) = TextOperation::transform(ta, tb, options)?;
                Ok((Self::Text(ta2), Self::Text(tb2)))
            }
            (Self::Array(aa), Self::Array(ab)) => {
                let (aa2, ab2) = ArrayOperation::transform(aa, ab, options)?;
                Ok((Self::Array(aa2), Self::Array(ab2)))
            }
            (Self::Coordinate(ca), Self::Coordinate(cb)) => {
                let (ca2, cb2) = CoordinateOperation::transform(ca, cb, options)?;
                Ok((Self::Coordinate(ca2), Self::Coordinate(cb2)))
            }
            _ => Err(Error::InvalidOperation(format!(
                "cannot transform updates of different property types ({} vs {})",
                a.property_type().as_str(),
                b.property_type().as_str()
            ))),
        }
    }
}

/// Composite, path-addressed operation. One-shot immutable value: construct,
/// optionally invert or transform, apply exactly once, discard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectOperation {
    /// Write `val` at a previously empty `path`.
    Create { path: Path, val: Value },
    /// Remove the value at `path`; `val` is a full snapshot for inversion
    /// and divergence checks.
    Delete { path: Path, val: Value },
    /// Apply a primitive diff to the value at `path`.
    Update { path: Path, diff: PropertyDiff },
    /// Replace the value at `path`; `original` is kept for inversion.
    Set {
        path: Path,
        val: Value,
        original: Value,
    },
    /// No effect; produced when a transform cancels an operation out.
    Nop,
}

/// How two operation paths relate for transform purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PathRelation {
    Disjoint,
    Same,
    /// The left path strictly contains the right one.
    LeftOuter,
    RightOuter,
}

fn relate(a: &Path, b: &Path) -> PathRelation {
    if a == b {
        PathRelation::Same
    } else if b.starts_with(a) {
        PathRelation::LeftOuter
    } else if a.starts_with(b) {
        PathRelation::RightOuter
    } else {
        PathRelation::Disjoint
    }
}

fn checked(path: Path) -> Result<Path> {
    if path.is_empty() {
        return Err(Error::InvalidOperation(
            "operation path must not be empty".into(),
        ));
    }
    Ok(path)
}

fn unresolvable(a: &str, b: &str) -> Error {
    Error::InvalidOperation(format!(
        "cannot transform concurrent {a} and {b} of the same property"
    ))
}

impl ObjectOperation {
    pub fn create(path: impl Into<Path>, val: Value) -> Result<Self> {
        Ok(Self::Create {
            path: checked(path.into())?,
            val,
        })
    }

    pub fn delete(path: impl Into<Path>, val: Value) -> Result<Self> {
        Ok(Self::Delete {
            path: checked(path.into())?,
            val,
        })
    }

    pub fn update(path: impl Into<Path>, diff: impl Into<PropertyDiff>) -> Result<Self> {
        Ok(Self::Update {
            path: checked(path.into())?,
            diff: diff.into(),
        })
    }

    pub fn set(path: impl Into<Path>, original: Value, val: Value) -> Result<Self> {
        Ok(Self::Set {
            path: checked(path.into())?,
            val,
            original,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Create { path, .. }
            | Self::Delete { path, .. }
            | Self::Update { path, .. }
            | Self::Set { path, .. } => Some(path),
            Self::Nop => None,
        }
    }

    pub fn is_nop(&self) -> bool {
        match self {
            Self::Nop => true,
            Self::Update { diff, .. } => diff.is_nop(),
            _ => false,
        }
    }

    /// Dispatch onto a path-addressable document. Create assumes the caller
    /// verified the path was empty; Delete verifies the removed value against
    /// the stored snapshot.
    pub fn apply<D: DocumentAdapter + ?Sized>(&self, doc: &mut D) -> Result<()> {
        match self {
            Self::Nop => Ok(()),
            Self::Create { path, val } => doc.set(path, val.clone()),
            Self::Delete { path, val } => {
                let removed = doc.delete(path)?;
                if removed != *val {
                    return Err(Error::ApplyMismatch(format!(
                        "unexpected value at path `{path}`: {removed}"
                    )));
                }
                Ok(())
            }
            Self::Update { path, diff } => {
                let current = doc.get(path)?;
                let next = diff.apply_to_value(&current)?;
                doc.set(path, next)
            }
            Self::Set { path, val, .. } => doc.set(path, val.clone()),
        }
    }

    pub fn invert(&self) -> Self {
        match self {
            Self::Nop => Self::Nop,
            Self::Create { path, val } => Self::Delete {
                path: path.clone(),
                val: val.clone(),
            },
            Self::Delete { path, val } => Self::Create {
                path: path.clone(),
                val: val.clone(),
            },
            Self::Update { path, diff } => Self::Update {
                path: path.clone(),
                diff: diff.invert(),
            },
            Self::Set {
                path,
                val,
                original,
            } => Self::Set {
                path: path.clone(),
                val: original.clone(),
                original: val.clone(),
            },
        }
    }

    /// True when the pair cannot be merged without a policy decision.
    ///
    /// Exactly these pairs fail with `Error::Conflict` under
    /// `TransformOptions::strict()`.
    pub fn has_conflict(&self, other: &Self) -> bool {
        if self.is_nop() || other.is_nop() {
            return false;
        }
        let (Some(pa), Some(pb)) = (self.path(), other.path()) else {
            return false;
        };
        match relate(pa, pb) {
            PathRelation::Disjoint => false,
            PathRelation::Same => match (self, other) {
                (Self::Update { diff: da, .. }, Self::Update { diff: db, .. }) => {
                    da.has_conflict(db)
                }
                _ => true,
            },
            PathRelation::LeftOuter => matches!(self, Self::Delete { .. }),
            PathRelation::RightOuter => matches!(other, Self::Delete { .. }),
        }
    }

    /// The central transform algebra. Returns `(a', b')` such that `a'`
    /// applies on top of `b`'s document and `b'` on top of `a`'s; either
    /// application order converges. Pure: the inputs are never mutated.
    ///
    /// Operations interact when their paths are equal, and also when a
    /// Delete's path strictly contains the other operation's path (removing
    /// a value vs. editing a property nested inside it).
    pub fn transform(a: &Self, b: &Self, options: TransformOptions) -> Result<(Self, Self)> {
        if options.no_conflict && a.has_conflict(b) {
            return Err(Error::Conflict(Conflict::new(a, b)));
        }
        if a.is_nop() || b.is_nop() {
            return Ok((a.clone(), b.clone()));
        }
        let (Some(pa), Some(pb)) = (a.path(), b.path()) else {
            return Ok((a.clone(), b.clone()));
        };
        match relate(pa, pb) {
            PathRelation::Disjoint => Ok((a.clone(), b.clone())),
            PathRelation::Same => transform_same_path(a, b, options),
            PathRelation::LeftOuter => match a {
                Self::Delete { .. } => transform_delete_inner(a, b, false, options),
                _ => Ok((a.clone(), b.clone())),
            },
            PathRelation::RightOuter => match b {
                Self::Delete { .. } => {
                    transform_delete_inner(b, a, true, options).map(|(d, o)| (o, d))
                }
                _ => Ok((a.clone(), b.clone())),
            },
        }
    }
}

/// Exhaustive dispatch over same-path kind pairs. Forbidden combinations are
/// spelled out here rather than hidden behind a lookup table.
fn transform_same_path(
    a: &ObjectOperation,
    b: &ObjectOperation,
    options: TransformOptions,
) -> Result<(ObjectOperation, ObjectOperation)> {
    use ObjectOperation::*;
    match (a, b) {
        (Nop, _) | (_, Nop) => Ok((a.clone(), b.clone())),

        (Create { .. }, Create { .. }) => Err(unresolvable("create", "create")),
        (Create { .. }, Delete { .. }) | (Delete { .. }, Create { .. }) => {
            Err(unresolvable("create", "delete"))
        }
        (Create { .. }, Update { .. }) | (Update { .. }, Create { .. }) => {
            Err(unresolvable("create", "update"))
        }

        // A rebase replays a pending set over a confirmed create; its
        // `original` is rewired to what the create wrote.
        (Create { val: cval, .. }, Set { path, val, .. }) => {
            if options.rebase {
                Ok((
                    a.clone(),
                    Set {
                        path: path.clone(),
                        val: val.clone(),
                        original: cval.clone(),
                    },
                ))
            } else {
                Err(unresolvable("create", "set"))
            }
        }
        (Set { path, val, .. }, Create { val: cval, .. }) => {
            if options.rebase {
                Ok((
                    Set {
                        path: path.clone(),
                        val: val.clone(),
                        original: cval.clone(),
                    },
                    b.clone(),
                ))
            } else {
                Err(unresolvable("create", "set"))
            }
        }

        (Delete { .. }, Delete { .. }) => {
            if options.rebase {
                Ok((a.clone(), b.clone()))
            } else {
                Ok((Nop, Nop))
            }
        }

        (Delete { .. }, Update { .. } | Set { .. }) => transform_delete_inner(a, b, false, options),
        (Update { .. } | Set { .. }, Delete { .. }) => {
            transform_delete_inner(b, a, true, options).map(|(d, o)| (o, d))
        }

        (
            Update {
                path, diff: da, ..
            },
            Update { diff: db, .. },
        ) => {
            let (da2, db2) = PropertyDiff::transform(da, db, options)?;
            Ok((
                Update {
                    path: path.clone(),
                    diff: da2,
                },
                Update {
                    path: path.clone(),
                    diff: db2,
                },
            ))
        }

        (Update { .. }, Set { .. }) | (Set { .. }, Update { .. }) => {
            if options.rebase {
                Ok((a.clone(), b.clone()))
            } else {
                Err(unresolvable("update", "set"))
            }
        }

        // left applied first: the right-hand set wins, its `original`
        // rewired to what the left one wrote
        (Set { val: aval, .. }, Set { path, val: bval, .. }) => {
            let winner = Set {
                path: path.clone(),
                val: bval.clone(),
                original: aval.clone(),
            };
            if options.rebase {
                Ok((a.clone(), winner))
            } else {
                Ok((Nop, winner))
            }
        }
    }
}

/// `del` removes a value; `inner` edits that value or a property nested
/// inside it (relative path possibly empty). The right-hand side of the
/// original call wins: either the edit recreates the value with the delete's
/// snapshot advanced through it, or the delete absorbs the edit into its
/// snapshot and the edit cancels out.
fn transform_delete_inner(
    del: &ObjectOperation,
    inner: &ObjectOperation,
    flipped: bool,
    options: TransformOptions,
) -> Result<(ObjectOperation, ObjectOperation)> {
    use ObjectOperation::*;
    let Delete {
        path: dpath,
        val: dval,
    } = del
    else {
        return Err(Error::InvalidOperation(
            "delete/inner transform requires a delete operation".into(),
        ));
    };
    let Some(rel) = inner.path().and_then(|p| p.relative_to(dpath)) else {
        return Err(Error::InvalidOperation(
            "operation paths do not overlap".into(),
        ));
    };
    let advanced = match inner {
        Update { diff, .. } => replace_at(dval, rel, |cur| diff.apply_to_value(cur))?,
        Set {
            path: spath,
            val: sval,
            ..
        } => {
            if options.rebase {
                // keep both; the pending set's `original` is rewired to the
                // deleted snapshot's view of the property
                let original = value_at(dval, rel)?.clone();
                return Ok((
                    del.clone(),
                    Set {
                        path: spath.clone(),
                        val: sval.clone(),
                        original,
                    },
                ));
            }
            replace_at(dval, rel, |_| Ok(sval.clone()))?
        }
        Create { val: cval, .. } => insert_at(dval, rel, cval.clone())?,
        Delete { val: ival, .. } => remove_at(dval, rel, ival)?,
        Nop => {
            return Err(Error::InvalidOperation(
                "delete/inner transform requires a non-NOP operation".into(),
            ))
        }
    };
    if flipped {
        Ok((
            Delete {
                path: dpath.clone(),
                val: advanced,
            },
            Nop,
        ))
    } else {
        Ok((
            Nop,
            Create {
                path: dpath.clone(),
                val: advanced,
            },
        ))
    }
}

fn value_at<'a>(root: &'a Value, rel: &[String]) -> Result<&'a Value> {
    let mut cur = root;
    for seg in rel {
        cur = cur
            .as_object()
            .and_then(|m| m.get(seg))
            .ok_or_else(|| Error::ApplyMismatch(format!("snapshot has no property `{seg}`")))?;
    }
    Ok(cur)
}

fn replace_at(
    root: &Value,
    rel: &[String],
    f: impl FnOnce(&Value) -> Result<Value>,
) -> Result<Value> {
    let Some((seg, rest)) = rel.split_first() else {
        return f(root);
    };
    let Some(map) = root.as_object() else {
        return Err(Error::ApplyMismatch(format!(
            "snapshot has no property `{seg}`"
        )));
    };
    let child = map
        .get(seg)
        .ok_or_else(|| Error::ApplyMismatch(format!("snapshot has no property `{seg}`")))?;
    let new_child = replace_at(child, rest, f)?;
    let mut out = map.clone();
    out.insert(seg.clone(), new_child);
    Ok(Value::Object(out))
}

/// Insert a property into a snapshot. The final segment may be absent; every
/// intermediate segment must name an existing object.
fn insert_at(root: &Value, rel: &[String], val: Value) -> Result<Value> {
    let Some((seg, rest)) = rel.split_first() else {
        return Err(Error::InvalidOperation(
            "cannot insert at the snapshot root".into(),
        ));
    };
    let Some(map) = root.as_object() else {
        return Err(Error::ApplyMismatch(format!(
            "snapshot has no property `{seg}`"
        )));
    };
    let mut out = map.clone();
    if rest.is_empty() {
        out.insert(seg.clone(), val);
    } else {
        let child = map
            .get(seg)
            .ok_or_else(|| Error::ApplyMismatch(format!("snapshot has no property `{seg}`")))?;
        out.insert(seg.clone(), insert_at(child, rest, val)?);
    }
    Ok(Value::Object(out))
}

/// Remove a property from a snapshot, verifying it structurally equals
/// `expected` the way a live delete would.
fn remove_at(root: &Value, rel: &[String], expected: &Value) -> Result<Value> {
    let Some((seg, rest)) = rel.split_first() else {
        return Err(Error::InvalidOperation(
            "cannot remove the snapshot root".into(),
        ));
    };
    let Some(map) = root.as_object() else {
        return Err(Error::ApplyMismatch(format!(
            "snapshot has no property `{seg}`"
        )));
    };
    let child = map
        .get(seg)
        .ok_or_else(|| Error::ApplyMismatch(format!("snapshot has no property `{seg}`")))?;
    let mut out = map.clone();
    if rest.is_empty() {
        if child != expected {
            return Err(Error::ApplyMismatch(format!(
                "unexpected value at property `{seg}`: {child}"
            )));
        }
        out.remove(seg);
    } else {
        out.insert(seg.clone(), remove_at(child, rest, expected)?);
    }
    Ok(Value::Object(out))
}
