//! Built-in rules. Each module holds one rule (or one analyzer/fixer pair).

mod copyright;
mod explicit_this;
mod format_document;
mod namespace_newline;

pub use copyright::CopyrightHeader;
pub use explicit_this::{EXPLICIT_THIS_ID, ExplicitThisAnalyzer, ExplicitThisFixer};
pub use format_document::FormatDocument;
pub use namespace_newline::NewlineBeforeFirstNamespace;
