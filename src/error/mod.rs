//! Error types for the object model and the event stream.
//!
//! Failures are layered: a malformed input surfaces as a [`ParseError`] at
//! the stream level, which the model wraps into
//! [`ModelError::DeferredParsing`] the first time a caller's request forces
//! the affected part of the tree to be built. The original stream-level
//! cause is always retrievable, either through
//! [`std::error::Error::source`] or through [`ModelError::parse_error`].
//!
//! Structural violations (illegal nesting, cycles, consumed nodes, iterator
//! misuse) are reported synchronously and never silently corrected.

use std::fmt;

use crate::tree::NodeType;

/// Source location within an XML input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type produced by the event stream when the input is malformed.
///
/// `ParseError` is `Clone` on purpose: a builder that has seen a parse
/// failure is permanently tainted and must re-report the same failure on
/// every subsequent build attempt, not silently resume.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl ParseError {
    /// Creates a new `ParseError` at the given location.
    #[must_use]
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// An error raised by an event sink while consuming serialization output.
#[derive(Debug)]
pub enum StreamError {
    /// An I/O failure in a sink writing to an output stream.
    Io(std::io::Error),
    /// Any other sink-side failure.
    Other(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "output stream error: {err}"),
            Self::Other(msg) => write!(f, "output stream error: {msg}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Other(_) => None,
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// The error type returned by operations on the object model.
#[derive(Debug)]
pub enum ModelError {
    /// The nesting table forbids this parent/child combination.
    ChildNotAllowed {
        /// The kind of the would-be parent.
        parent: NodeType,
        /// The kind of the rejected child.
        child: NodeType,
    },
    /// Inserting the node would make it an ancestor of itself.
    CyclicRelationship,
    /// A node was inserted as its own sibling.
    SelfRelationship,
    /// A sibling operation was attempted on a node that has no parent.
    NoParent,
    /// The migration policy rejected a node that already has a parent.
    NodeInUse,
    /// The migration policy rejected a node owned by another document.
    WrongDocument,
    /// The container's content was discarded or consumed; it can no longer
    /// be built or traversed.
    NodeConsumed,
    /// A cursor's `next` was called with nothing remaining.
    NoSuchElement,
    /// A cursor's `remove` was called before `next`, or twice in a row.
    IllegalIteratorState,
    /// The node under a cursor was detached by something other than the
    /// cursor's own `remove`.
    ConcurrentModification,
    /// A build was requested on a container that has no builder.
    NoBuilder,
    /// The builder reported completion but the container never did; the
    /// model and the stream are out of step.
    BuilderComplete,
    /// The underlying event stream failed while content was being built on
    /// demand.
    DeferredParsing(ParseError),
    /// An event sink failed while consuming serialization output.
    Stream(StreamError),
}

impl ModelError {
    /// Returns the stream-level parse failure behind this error, if any.
    #[must_use]
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::DeferredParsing(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChildNotAllowed { parent, child } => {
                write!(f, "a {child} node is not allowed inside a {parent} node")
            }
            Self::CyclicRelationship => {
                write!(f, "operation would create a cyclic parent-child relationship")
            }
            Self::SelfRelationship => write!(f, "a node cannot be inserted as its own sibling"),
            Self::NoParent => write!(f, "the node has no parent"),
            Self::NodeInUse => write!(f, "the node is already in use by another parent"),
            Self::WrongDocument => write!(f, "the node belongs to a different document"),
            Self::NodeConsumed => write!(f, "the node's content has been consumed"),
            Self::NoSuchElement => write!(f, "iteration has no more elements"),
            Self::IllegalIteratorState => {
                write!(f, "remove called before next or after a previous remove")
            }
            Self::ConcurrentModification => {
                write!(f, "the current node was removed by a method other than remove")
            }
            Self::NoBuilder => write!(f, "the node has no builder"),
            Self::BuilderComplete => write!(f, "the builder is already complete"),
            Self::DeferredParsing(err) => write!(f, "deferred parsing failure: {err}"),
            Self::Stream(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DeferredParsing(err) => Some(err),
            Self::Stream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for ModelError {
    fn from(err: ParseError) -> Self {
        Self::DeferredParsing(err)
    }
}

impl From<StreamError> for ModelError {
    fn from(err: StreamError) -> Self {
        Self::Stream(err)
    }
}
