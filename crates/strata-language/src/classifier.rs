use strata_scan::ScanInput;
use text_size::TextSize;

use crate::attributes::InputAttributes;
use crate::language::{Language, TokenKind};
use crate::path::LanguagePath;

/// Pluggable token classifier for one lexical dialect.
///
/// The driving loop feeds the classifier one span through a [`ScanInput`];
/// each call consumes the next token's characters and reports its kind.
/// Returning `Some` without consuming at least one character, or `None`
/// before the span is exhausted, is a configuration error surfaced by the
/// driver.
///
/// Classifiers must be restartable at any token boundary: an incremental
/// pass re-enters at the start of the token preceding an edit, with no
/// state carried over. A dialect needing more context must widen its tokens
/// until boundaries are self-delimiting.
pub trait Classifier: Send {
    fn next_token(&mut self, input: &mut ScanInput<'_>) -> Option<ScannedToken>;
}

/// One classified token, optionally declaring an embedding over its span.
#[derive(Clone, Debug)]
pub struct ScannedToken {
    pub kind: TokenKind,
    pub embedding: Option<EmbeddingDecl>,
}

impl ScannedToken {
    pub fn new(kind: TokenKind) -> Self {
        Self { kind, embedding: None }
    }

    pub fn with_embedding(kind: TokenKind, embedding: EmbeddingDecl) -> Self {
        Self { kind, embedding: Some(embedding) }
    }
}

/// Declared embedding: a child language over a token's span, with leading
/// and trailing delimiter characters excluded.
#[derive(Clone, Debug)]
pub struct EmbeddingDecl {
    pub language: Language,
    pub skip_start: TextSize,
    pub skip_end: TextSize,
}

impl EmbeddingDecl {
    pub fn new(language: Language, skip_start: u32, skip_end: u32) -> Self {
        Self { language, skip_start: skip_start.into(), skip_end: skip_end.into() }
    }
}

/// Context handed to [`LanguageDef::embedding`](crate::LanguageDef::embedding)
/// when the hierarchy resolves a token's default embedding.
pub struct EmbeddingContext<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub path: &'a LanguagePath,
    pub attributes: &'a InputAttributes,
}
