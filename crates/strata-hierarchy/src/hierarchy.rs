//! Public handle over the hierarchy engine.

use std::fmt;
use std::sync::Arc;

use strata_language::{InputAttributes, Language, LanguagePath};
use text_size::TextSize;

use crate::error::Error;
use crate::op::HierarchyOp;
use crate::sequence::TokenSequence;
use crate::update::TokenChange;

/// Token hierarchy over one text buffer.
///
/// Cheap to clone; clones share the same engine, so any number of reader
/// threads may hold one. Token lists are built lazily on first traversal
/// and kept up to date incrementally through [`insert`](Self::insert) /
/// [`remove`](Self::remove), which the host's edit pipeline must serialize
/// (single writer, any number of readers).
#[derive(Clone)]
pub struct TokenHierarchy {
    op: Arc<HierarchyOp>,
}

impl TokenHierarchy {
    /// Creates a hierarchy over `text` rooted at `language`.
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self::with_attributes(text, language, InputAttributes::new())
    }

    /// Creates a hierarchy carrying caller-supplied input attributes.
    pub fn with_attributes(
        text: impl Into<String>,
        language: Language,
        attributes: InputAttributes,
    ) -> Self {
        Self { op: HierarchyOp::new(text.into(), language, attributes) }
    }

    /// Current text snapshot.
    pub fn text(&self) -> Arc<str> {
        self.op.text()
    }

    /// The root language.
    pub fn language(&self) -> &Language {
        self.op.language()
    }

    /// The depth-1 path of the root language.
    pub fn language_path(&self) -> &LanguagePath {
        self.op.root_path()
    }

    /// Attributes visible to classifiers and embedding hooks.
    pub fn input_attributes(&self) -> &InputAttributes {
        self.op.attributes()
    }

    /// Cursor over the top-level tokens, building them on first use.
    pub fn token_sequence(&self) -> Result<TokenSequence, Error> {
        self.op.root_sequence()
    }

    /// Every language path a token list currently exists for, the root
    /// path included, ordered by depth then name.
    pub fn language_paths(&self) -> Vec<LanguagePath> {
        self.op.language_paths()
    }

    /// The stack of nested sequences whose span covers `offset`, outermost
    /// first, each positioned on its covering token.
    ///
    /// At a token boundary, `backward_bias` selects the sequence path
    /// through the token ending at `offset` instead of the one starting
    /// there; with `backward_bias` at offset 0 the stack is empty.
    pub fn embedded_token_sequences(
        &self,
        offset: TextSize,
        backward_bias: bool,
    ) -> Result<Vec<TokenSequence>, Error> {
        self.op.embedded_sequences(offset, backward_bias)
    }

    /// Inserts `text` at `offset` and re-lexes the damaged region.
    ///
    /// Panics when `offset` is out of bounds or not a character boundary.
    pub fn insert(&self, offset: TextSize, text: &str) -> Result<TokenChange, Error> {
        self.op.insert(offset, text)
    }

    /// Removes `len` characters at `offset` and re-lexes the damaged region.
    ///
    /// Panics when the range is out of bounds or splits a character.
    pub fn remove(&self, offset: TextSize, len: TextSize) -> Result<TokenChange, Error> {
        self.op.remove(offset, len)
    }

    /// Discards all tokens and embeddings; the next query re-lexes from
    /// scratch. For vocabulary refreshes and other wholesale invalidation.
    pub fn rebuild(&self) {
        self.op.rebuild();
    }
}

impl fmt::Debug for TokenHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenHierarchy")
            .field("language", &self.language().name())
            .field("text_len", &self.text().len())
            .finish_non_exhaustive()
    }
}
