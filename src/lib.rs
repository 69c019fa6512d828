//! # oxiom
//!
//! A deferred-building XML object model: the document tree is materialized
//! lazily from a streaming parser as it is traversed, and supports
//! incremental mutation, policy-driven cloning, and streaming
//! re-serialization without forcing full materialization.
//!
//! The heart of the crate is the [`tree::Model`] arena. A model is fed by
//! any [`stream::XmlSource`] — the built-in [`parser::PullParser`] or an
//! external event producer — and pulls structural events on demand: asking
//! for the first child of a container realizes exactly one child, building
//! the container to completion realizes them all, and serializing a
//! never-queried subtree can forward the raw events straight to the output
//! sink without creating nodes at all.
//!
//! ## Quick Start
//!
//! ```
//! use oxiom::parser::PullParser;
//! use oxiom::serial::serialize;
//! use oxiom::tree::Model;
//!
//! let mut model = Model::new();
//! let doc = model
//!     .attach_source(Box::new(PullParser::new("<root><child>Hello</child></root>")))
//!     .unwrap();
//! let root = model.document_element(doc).unwrap().unwrap();
//! let child = model.first_child(root).unwrap().unwrap();
//! assert_eq!(model.local_name(child), Some("child"));
//! assert_eq!(model.text_content(child).unwrap(), "Hello");
//! assert_eq!(
//!     serialize(&mut model, doc).unwrap(),
//!     "<root><child>Hello</child></root>"
//! );
//! ```

mod builder;
pub mod encoding;
pub mod error;
pub mod parser;
pub mod serial;
pub mod stream;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::{ModelError, ParseError, SourceLocation, StreamError};
pub use parser::{ParseOptions, PullParser};
pub use stream::{StreamEvent, XmlSink, XmlSource};
pub use tree::{Model, NodeId, NodeKind, NodeType};
