use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::path::Path;

/// Path-addressable document surface consumed by `ObjectOperation::apply`.
///
/// The editing layer owns the real document; this trait is the only
/// capability the operation algebra needs from it.
pub trait DocumentAdapter {
    fn get(&self, path: &Path) -> Result<Value>;
    fn set(&mut self, path: &Path, value: Value) -> Result<()>;
    /// Remove and return the value at `path`.
    fn delete(&mut self, path: &Path) -> Result<Value>;
}

/// In-memory JSON document tree for tests and prototyping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapDocument {
    root: Map<String, Value>,
}

fn missing(path: &Path) -> Error {
    Error::ApplyMismatch(format!("no value at path `{path}`"))
}

impl MapDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(Error::InvalidOperation(format!(
                "document root must be an object, got {other}"
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Parent object of `path` plus the final key. Intermediate objects are
    /// created when `create` is set (so a fresh node can be written in one
    /// call).
    fn parent_mut(&mut self, path: &Path, create: bool) -> Result<(&mut Map<String, Value>, String)> {
        let Some((last, init)) = path.segments().split_last() else {
            return Err(Error::InvalidOperation("path must not be empty".into()));
        };
        let mut cur = &mut self.root;
        for seg in init {
            if create && !cur.contains_key(seg) {
                cur.insert(seg.clone(), Value::Object(Map::new()));
            }
            cur = match cur.get_mut(seg) {
                Some(Value::Object(m)) => m,
                Some(_) => {
                    return Err(Error::ApplyMismatch(format!(
                        "path `{path}` passes through a non-object value"
                    )))
                }
                None => return Err(missing(path)),
            };
        }
        Ok((cur, last.clone()))
    }
}

impl DocumentAdapter for MapDocument {
    fn get(&self, path: &Path) -> Result<Value> {
        let segs = path.segments();
        let Some((first, rest)) = segs.split_first() else {
            return Err(Error::InvalidOperation("path must not be empty".into()));
        };
        let mut cur = self.root.get(first).ok_or_else(|| missing(path))?;
        for seg in rest {
            cur = cur
                .as_object()
                .and_then(|m| m.get(seg))
                .ok_or_else(|| missing(path))?;
        }
        Ok(cur.clone())
    }

    fn set(&mut self, path: &Path, value: Value) -> Result<()> {
        let (parent, key) = self.parent_mut(path, true)?;
        parent.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> Result<Value> {
        let (parent, key) = self.parent_mut(path, false)?;
        parent.remove(&key).ok_or_else(|| missing(path))
    }
}
