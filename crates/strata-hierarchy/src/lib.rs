//! Incremental, multi-language token hierarchy over a mutable text buffer.
//!
//! A [`TokenHierarchy`] tokenizes its text into a tree of token lists:
//! tokens of the root language at depth 0, with sub-regions of individual
//! tokens *embedded* with tokens of other languages below. Lists are built
//! lazily, embedded lists are cached per parent token, readers on any
//! thread share published token arrays without locking, and edits re-lex
//! only the damaged region while preserving the identity of untouched
//! tokens.

mod arena;
mod error;
mod hierarchy;
mod list;
mod op;
mod sequence;
mod update;

pub use arena::TokenId;
pub use error::Error;
pub use hierarchy::TokenHierarchy;
pub use sequence::{Token, TokenSequence};
pub use update::TokenChange;
