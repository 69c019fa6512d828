//! Streaming re-serialization of possibly partially built trees.
//!
//! The [`TreeWalker`] walks a container and delivers its structure as
//! [`StreamEvent`](crate::stream::StreamEvent)s into any
//! [`XmlSink`](crate::stream::XmlSink). Content already in memory is
//! replayed from the tree; in a consuming walk, content still sitting in
//! the underlying event stream is forwarded to the sink directly, without
//! ever materializing nodes for it. A single walk can mix both modes
//! across siblings.
//!
//! [`xml`] supplies the text renderer: an [`XmlWriter`] sink producing
//! well-formed XML, plus the [`serialize`] convenience functions.

pub mod walker;
pub mod xml;

pub use walker::TreeWalker;
pub use xml::{serialize, serialize_consuming, XmlWriter};
