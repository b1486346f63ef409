//! Language descriptions for the token hierarchy.
//!
//! A [`Language`] bundles a token-kind vocabulary with the classifier
//! capability that produces tokens of that dialect. [`LanguagePath`] chains
//! languages into an embedding route and is interned process-wide so path
//! equality is pointer identity. [`InputAttributes`] carries path-scoped,
//! optionally inherited context into classifiers and embedding decisions.

mod attributes;
mod classifier;
mod language;
mod path;

pub use attributes::{AttrValue, InputAttributes};
pub use classifier::{Classifier, EmbeddingContext, EmbeddingDecl, ScannedToken};
pub use language::{KindInfo, Language, LanguageDef, TokenKind};
pub use path::LanguagePath;
