//! # Shared-Ptr
//!
//! A single-threaded, reference-counted shared-ownership pointer with
//! pluggable destruction policies.
//!
//! ## Features
//!
//! - **Exactly-once destruction**: the resource is finalized when the last handle goes away
//! - **Pluggable deleters**: default `Box` reclamation, free functions, closures, stateful functors
//! - **Type erasure**: `DynDeleter` puts any deleter behind one concrete type
//! - **Null-safe access**: empty handles report `Error::Empty` instead of reading garbage
//! - **Fallible construction**: `try_from_raw_with` hands the resource back on allocation failure
//!
//! Counting is non-atomic, so handles are neither `Send` nor `Sync`.
//!
//! ## Quick Start
//!
//! ```rust
//! use shared_ptr::SharedPtr;
//!
//! let first = SharedPtr::new("hello".to_string());
//! let second = first.clone();
//! assert_eq!(second.use_count(), 2);
//! drop(first);
//! assert_eq!(&*second, "hello"); // Freed when the last handle drops
//! ```

mod control;
mod deleter;
mod error;
mod shared;

pub use deleter::{DefaultDelete, Deleter, DynDeleter};
pub use error::{AllocError, Error};
pub use shared::{DynSharedPtr, SharedPtr};
