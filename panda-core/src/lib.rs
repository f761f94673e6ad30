//! Panda Core
//!
//! This crate provides the dataflow engine of the Panda visual programming
//! environment. It implements:
//!
//! - A registry of value types with type-erased copy, conversion and text
//!   codecs
//! - Typed data ports linked into a propagation graph with dirty flags
//! - Objects created by name from a class factory, docks and generic ports
//! - A scheduler updating dirty objects lazily, producers first
//! - Saving and loading documents as JSON
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `types`: Value types and their registry
//! - `graph`: Dependency graph, update scheduling and graph queries
//! - `data`: Data ports and their storage
//! - `object`: Object classes, the objects list, docks and generic ports
//! - `document`: The document owning everything above
//! - `snapshot`: Serializable snapshots of documents
//! - `delay`: Callbacks run after a delay on a background thread
//!
//! # Example
//!
//! ```rust
//! use panda_core::Document;
//!
//! let mut doc = Document::new();
//! let add = doc.create_object("math::AddReals").unwrap();
//! let a = doc.find_data(add, "Input A").unwrap();
//! let b = doc.find_data(add, "Input B").unwrap();
//! let result = doc.find_data(add, "Result").unwrap();
//!
//! doc.set_value(a, 2.0_f64).unwrap();
//! doc.set_value(b, 3.5_f64).unwrap();
//! assert_eq!(*doc.get_value::<f64>(result).unwrap(), 5.5);
//! ```

pub mod data;
pub mod delay;
pub mod document;
pub mod graph;
pub mod object;
pub mod signal;
pub mod snapshot;
pub mod types;

pub use data::{BaseData, DataError, DataFlags, DataHandle, DataId};
pub use delay::{DelayHandle, DelayedRunner};
pub use document::{
    DataAccessor, Document, DocumentBuilder, DocumentConfig, DocumentError, DocumentSignals,
    Mailbox,
};
pub use graph::{UpdateError, UpdateState};
pub use object::{ObjectClass, ObjectError, ObjectFactory, ObjectId, PandaObject};
pub use snapshot::{DocumentSnapshot, LoadReport};
pub use types::{DataTypeId, DataValue, TypeError, TypeRegistry};
