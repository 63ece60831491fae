use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::object::TransformOptions;
use crate::path::Coordinate;

/// Shift the offset of a (path, offset) coordinate, e.g. a cursor or an
/// annotation anchor tracking concurrent edits around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateOperation {
    Shift { delta: i64 },
}

impl CoordinateOperation {
    pub fn shift(delta: i64) -> Self {
        Self::Shift { delta }
    }

    pub fn delta(&self) -> i64 {
        match self {
            Self::Shift { delta } => *delta,
        }
    }

    pub fn is_nop(&self) -> bool {
        self.delta() == 0
    }

    /// Move a raw offset. A negative result means the anchor diverged from
    /// the edits this shift was derived from.
    pub fn shift_offset(&self, offset: usize) -> Result<usize> {
        let moved = offset as i64 + self.delta();
        usize::try_from(moved).map_err(|_| {
            Error::ApplyMismatch(format!(
                "shift by {} moves offset {offset} below zero",
                self.delta()
            ))
        })
    }

    pub fn apply(&self, coor: &Coordinate) -> Result<Coordinate> {
        Ok(Coordinate {
            path: coor.path.clone(),
            offset: self.shift_offset(coor.offset)?,
        })
    }

    pub fn invert(&self) -> Self {
        Self::Shift {
            delta: -self.delta(),
        }
    }

    /// Concurrent shifts never need a policy decision; they commute.
    pub fn has_conflict(&self, _other: &Self) -> bool {
        false
    }

    /// Both sides accumulate the other's pre-transform delta: the two anchors
    /// keep moving independently rather than merging destructively.
    pub fn transform(a: &Self, b: &Self, _options: TransformOptions) -> Result<(Self, Self)> {
        Ok((
            Self::Shift {
                delta: a.delta() + b.delta(),
            },
            Self::Shift {
                delta: b.delta() + a.delta(),
            },
        ))
    }
}
