#![forbid(unsafe_code)]
//! Path-addressed operation and transform algebra for collaborative tree
//! documents. Editing logic (local undo/redo, offline edits, remote peers)
//! produces small structural operations; this crate adjusts concurrent pairs
//! so every party converges to the same state regardless of arrival order,
//! and encodes operations in a compact wire form for persistence and
//! transport. It stays independent of any concrete document engine: hosts
//! plug in via the `DocumentAdapter` trait.

pub mod adapter;
pub mod array;
pub mod coordinate;
pub mod error;
pub mod object;
pub mod path;
pub mod serializer;
pub mod text;

pub use adapter::{DocumentAdapter, MapDocument};
pub use array::ArrayOperation;
pub use coordinate::CoordinateOperation;
pub use error::{Conflict, Error, Result};
pub use object::{ObjectOperation, PropertyDiff, PropertyType, TransformOptions};
pub use path::{Coordinate, Path};
pub use text::TextOperation;
