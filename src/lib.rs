//! # gwords-radix
//!
//! An ordered map from byte strings to values, built on an Adaptive Radix
//! Tree (ART).
//!
//! Based on "The Adaptive Radix Tree: ARTful Indexing for Main-Memory Databases"
//! (ICDE 2013, Leis et al.)
//!
//! ## Example
//!
//! ```rust
//! use gwords_radix::RadixTree;
//!
//! let mut tree: RadixTree<u64> = RadixTree::new();
//! tree.insert(b"hello", 1);
//! tree.insert(b"help", 2);
//! tree.insert(b"world", 3);
//!
//! assert_eq!(tree.get(b"hello"), Some(&1));
//! assert_eq!(tree.get(b"hel"), None);
//! assert_eq!(tree.keys(), vec![b"hello".to_vec(), b"help".to_vec(), b"world".to_vec()]);
//! ```
//!
//! ## Destroy callbacks
//!
//! A tree built with [`RadixTree::with_destroy`] hands every value removed
//! through [`RadixTree::remove`] to the callback. [`RadixTree::steal`] gives
//! the value back to the caller instead, and `clear`/drop only run the
//! callback when [`Config::destroy_on_clear`] is set.
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use gwords_radix::RadixTree;
//!
//! let destroyed = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&destroyed);
//! let mut tree = RadixTree::with_destroy(move |_: String| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! tree.insert("a", "first".to_string());
//! tree.insert("b", "second".to_string());
//!
//! assert!(tree.remove("a"));
//! assert_eq!(tree.steal("b").as_deref(), Some("second"));
//! assert_eq!(destroyed.load(Ordering::Relaxed), 1);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[macro_use]
mod tracing_helpers;

pub mod art;
pub mod config;
pub mod error;

pub use art::{ArtStats, DestroyFn, Iter, NodeKind, RadixTree, MAX_PREFIX_LEN};
pub use config::Config;
pub use error::{IntegrityError, Result};


#[cfg(test)]
mod proptests;
