//! Error types for fixflow-edit.
//!
//! The batch applier never returns these: it turns them into conflict records. They
//! surface from the strict [`apply_edits`](crate::apply_edits) helper and as the message
//! of an `InvalidEdit` conflict.

use fixflow_types::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The span ends past the end of the text.
    #[error("edit {span} is outside the text ({len} bytes)")]
    OutOfBounds { span: Span, len: usize },

    /// One of the span's ends falls inside a multi-byte character.
    #[error("edit {span} splits a UTF-8 character")]
    NotCharBoundary { span: Span },

    /// Two edits of one set touch the same bytes.
    #[error("edit {span} overlaps edit {other}")]
    Overlap { span: Span, other: Span },
}

pub type EditResult<T> = Result<T, EditError>;
