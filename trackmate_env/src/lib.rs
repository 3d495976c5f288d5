//! TrackMate Environment Abstraction Layer
//!
//! This crate holds the pieces of shared state the model layer would
//! otherwise keep in process-wide globals:
//! - Identity types for spots, edges and tracks
//! - Object id allocation (`IdAllocator`)
//!
//! Every model context owns its allocator, so two sessions (or two tests)
//! never influence each other's ids.
//!
//! # Example
//!
//! ```
//! use trackmate_env::{CounterIdAllocator, IdAllocator, ObjectId};
//!
//! let alloc = CounterIdAllocator::new();
//! let a = alloc.next();
//! alloc.bump(ObjectId(41));
//! let b = alloc.next();
//! assert!(a < b);
//! assert_eq!(b, ObjectId(42));
//! ```

mod allocator;
mod types;

pub use allocator::{CounterIdAllocator, IdAllocator};
pub use types::{EdgeId, ObjectId, TrackId};
