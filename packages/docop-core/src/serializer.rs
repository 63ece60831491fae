//! Compact wire encoding of [`ObjectOperation`].
//!
//! An operation is a flat token record; the string form is the JSON array
//! encoding of that record. Token order is the wire contract:
//!
//! ```text
//! c <dot.joined.path> <json-value>
//! d <dot.joined.path> <json-value>
//! s <dot.joined.path> <new-value> <old-value>
//! u <dot.joined.path> <op-code> <op-args...>
//! ```
//!
//! with op-codes `t+`/`t-` (text insert/delete: `<pos> <str>`), `a+`/`a-`
//! (array insert/delete: `<pos> <val>`) and `c>>` (coordinate shift:
//! `<val>`). The op-code doubles as the property-type tag, so decoding can
//! pick the matching primitive decoder.

use serde_json::Value;

use crate::array::ArrayOperation;
use crate::coordinate::CoordinateOperation;
use crate::error::{Error, Result};
use crate::object::{ObjectOperation, PropertyDiff};
use crate::path::Path;
use crate::text::TextOperation;

const TAG_CREATE: &str = "c";
const TAG_DELETE: &str = "d";
const TAG_SET: &str = "s";
const TAG_UPDATE: &str = "u";

const OP_TEXT_INSERT: &str = "t+";
const OP_TEXT_DELETE: &str = "t-";
const OP_ARRAY_INSERT: &str = "a+";
const OP_ARRAY_DELETE: &str = "a-";
const OP_COORDINATE_SHIFT: &str = "c>>";

/// Encode an operation to its flat token record.
pub fn serialize(op: &ObjectOperation) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    match op {
        ObjectOperation::Create { path, val } => {
            out.push(TAG_CREATE.into());
            out.push(path.to_dotted().into());
            out.push(val.clone());
        }
        ObjectOperation::Delete { path, val } => {
            out.push(TAG_DELETE.into());
            out.push(path.to_dotted().into());
            out.push(val.clone());
        }
        ObjectOperation::Set {
            path,
            val,
            original,
        } => {
            out.push(TAG_SET.into());
            out.push(path.to_dotted().into());
            out.push(val.clone());
            out.push(original.clone());
        }
        ObjectOperation::Update { path, diff } => {
            out.push(TAG_UPDATE.into());
            out.push(path.to_dotted().into());
            serialize_diff(diff, &mut out)?;
        }
        ObjectOperation::Nop => {
            return Err(Error::InvalidOperation(
                "cannot serialize a NOP operation".into(),
            ))
        }
    }
    Ok(out)
}

fn serialize_diff(diff: &PropertyDiff, out: &mut Vec<Value>) -> Result<()> {
    match diff {
        PropertyDiff::Text(op) => {
            out.push(if op.is_insert() {
                OP_TEXT_INSERT.into()
            } else {
                OP_TEXT_DELETE.into()
            });
            out.push(op.pos().into());
            out.push(op.text().into());
        }
        PropertyDiff::Array(ArrayOperation::Insert { pos, val }) => {
            out.push(OP_ARRAY_INSERT.into());
            out.push((*pos).into());
            out.push(val.clone());
        }
        PropertyDiff::Array(ArrayOperation::Delete { pos, val }) => {
            out.push(OP_ARRAY_DELETE.into());
            out.push((*pos).into());
            out.push(val.clone());
        }
        PropertyDiff::Array(ArrayOperation::Nop) => {
            return Err(Error::InvalidOperation(
                "cannot serialize a NOP array operation".into(),
            ))
        }
        PropertyDiff::Coordinate(op) => {
            out.push(OP_COORDINATE_SHIFT.into());
            out.push(op.delta().into());
        }
    }
    Ok(())
}

/// Decode a flat token record back into an operation. Unknown tags or
/// op-codes fail with a parse error; nothing is silently defaulted.
pub fn deserialize(tokens: &[Value]) -> Result<ObjectOperation> {
    let tag = required_str(tokens, 0, "kind tag")?;
    let path = Path::from_dotted(required_str(tokens, 1, "path")?);
    if path.is_empty() {
        return Err(Error::Parse("operation path must not be empty".into()));
    }
    let op = match tag {
        TAG_CREATE => {
            expect_len(tokens, 3)?;
            ObjectOperation::Create {
                path,
                val: tokens[2].clone(),
            }
        }
        TAG_DELETE => {
            expect_len(tokens, 3)?;
            ObjectOperation::Delete {
                path,
                val: tokens[2].clone(),
            }
        }
        TAG_SET => {
            expect_len(tokens, 4)?;
            ObjectOperation::Set {
                path,
                val: tokens[2].clone(),
                original: tokens[3].clone(),
            }
        }
        TAG_UPDATE => ObjectOperation::Update {
            path,
            diff: deserialize_diff(tokens)?,
        },
        other => return Err(Error::Parse(format!("unknown operation tag `{other}`"))),
    };
    Ok(op)
}

fn deserialize_diff(tokens: &[Value]) -> Result<PropertyDiff> {
    let code = required_str(tokens, 2, "op-code")?;
    let diff = match code {
        OP_TEXT_INSERT | OP_TEXT_DELETE => {
            expect_len(tokens, 5)?;
            let pos = required_pos(tokens, 3)?;
            let text = required_str(tokens, 4, "text")?.to_string();
            if code == OP_TEXT_INSERT {
                PropertyDiff::Text(TextOperation::Insert { pos, text })
            } else {
                PropertyDiff::Text(TextOperation::Delete { pos, text })
            }
        }
        OP_ARRAY_INSERT | OP_ARRAY_DELETE => {
            expect_len(tokens, 5)?;
            let pos = required_pos(tokens, 3)?;
            let val = tokens[4].clone();
            if code == OP_ARRAY_INSERT {
                PropertyDiff::Array(ArrayOperation::Insert { pos, val })
            } else {
                PropertyDiff::Array(ArrayOperation::Delete { pos, val })
            }
        }
        OP_COORDINATE_SHIFT => {
            expect_len(tokens, 4)?;
            let delta = tokens[3].as_i64().ok_or_else(|| {
                Error::Parse(format!("expected an integer delta, got {}", tokens[3]))
            })?;
            PropertyDiff::Coordinate(CoordinateOperation::Shift { delta })
        }
        other => return Err(Error::Parse(format!("unknown op-code `{other}`"))),
    };
    Ok(diff)
}

/// Encode to the canonical string form (JSON array of the token record).
pub fn serialize_to_string(op: &ObjectOperation) -> Result<String> {
    let tokens = serialize(op)?;
    serde_json::to_string(&tokens).map_err(|e| Error::InvalidOperation(e.to_string()))
}

/// Decode from the canonical string form.
pub fn deserialize_from_string(record: &str) -> Result<ObjectOperation> {
    let tokens: Vec<Value> =
        serde_json::from_str(record).map_err(|e| Error::Parse(e.to_string()))?;
    deserialize(&tokens)
}

fn required_str<'a>(tokens: &'a [Value], idx: usize, what: &str) -> Result<&'a str> {
    tokens
        .get(idx)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse(format!("missing or non-string {what} at token {idx}")))
}

fn required_pos(tokens: &[Value], idx: usize) -> Result<usize> {
    tokens
        .get(idx)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| {
            Error::Parse(format!(
                "expected a non-negative integer position at token {idx}"
            ))
        })
}

fn expect_len(tokens: &[Value], len: usize) -> Result<()> {
    if tokens.len() != len {
        return Err(Error::Parse(format!(
            "expected {len} tokens, got {}",
            tokens.len()
        )));
    }
    Ok(())
}
