//! Public cursor over one token list.

use std::fmt;
use std::sync::Arc;

use strata_language::{Language, LanguagePath, TokenKind};
use text_size::{TextRange, TextSize};

use crate::arena::TokenId;
use crate::error::Error;
use crate::list::{ListId, TokenRun};
use crate::op::HierarchyOp;

/// One token, addressed in the hierarchy's top-level coordinate space.
///
/// Equality and hashing are by identity: a token kept across an incremental
/// re-lex compares equal to its pre-edit self even though its offset may
/// have shifted.
#[derive(Clone)]
pub struct Token {
    id: TokenId,
    kind: TokenKind,
    range: TextRange,
    text: Arc<str>,
}

impl Token {
    /// Stable identity; survives edits that do not touch this token.
    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Range in top-level coordinates, as of the snapshot this token was
    /// read from.
    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn offset(&self) -> TextSize {
        self.range.start()
    }

    pub fn len(&self) -> TextSize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text[self.range]
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?} {:?}", self.kind, self.range, self.text())
    }
}

/// Cursor over one token list.
///
/// Cursors are snapshots: they hold the list's published run and the text it
/// was produced from, so movement and reads never block. Cursor position is
/// private to each cursor; the tokens themselves are shared, and every
/// cursor over the same list observes identical token identities. After the
/// hierarchy is modified, accessors return [`Error::Expired`] — obtain a
/// fresh sequence instead of trusting stale data.
#[derive(Clone)]
pub struct TokenSequence {
    op: Arc<HierarchyOp>,
    list: ListId,
    path: LanguagePath,
    run: Arc<TokenRun>,
    text: Arc<str>,
    base: TextSize,
    version: u64,
    window: (usize, usize),
    /// Current token, an absolute index into the run.
    index: Option<usize>,
    /// Where `move_next` goes while between tokens.
    boundary: usize,
}

impl TokenSequence {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        op: Arc<HierarchyOp>,
        list: ListId,
        path: LanguagePath,
        run: Arc<TokenRun>,
        text: Arc<str>,
        base: TextSize,
        version: u64,
    ) -> Self {
        let window = (0, run.entries.len());
        Self { op, list, path, run, text, base, version, window, index: None, boundary: 0 }
    }

    /// The language this sequence's tokens belong to.
    pub fn language(&self) -> &Language {
        self.path.inner_language()
    }

    pub fn language_path(&self) -> &LanguagePath {
        &self.path
    }

    /// Number of tokens visible through this cursor's window.
    pub fn token_count(&self) -> usize {
        self.window.1 - self.window.0
    }

    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }

    /// Index of the current token within the window, if positioned.
    pub fn index(&self) -> Option<usize> {
        self.index.map(|index| index - self.window.0)
    }

    /// Moves to the next token; `false` at the end (the cursor then rests
    /// after the last token) and on an empty window.
    pub fn move_next(&mut self) -> bool {
        match self.index {
            Some(index) if index + 1 < self.window.1 => {
                self.index = Some(index + 1);
                true
            }
            Some(_) => {
                self.index = None;
                self.boundary = self.window.1;
                false
            }
            None if self.boundary < self.window.1 => {
                self.index = Some(self.boundary);
                true
            }
            None => false,
        }
    }

    /// Moves to the previous token; `false` at the start.
    pub fn move_previous(&mut self) -> bool {
        match self.index {
            Some(index) if index > self.window.0 => {
                self.index = Some(index - 1);
                true
            }
            Some(_) => false,
            None if self.boundary > self.window.0 => {
                self.index = Some(self.boundary - 1);
                true
            }
            None => false,
        }
    }

    /// Rests the cursor before the first token.
    pub fn move_start(&mut self) {
        self.index = None;
        self.boundary = self.window.0;
    }

    /// Rests the cursor after the last token.
    pub fn move_end(&mut self) {
        self.index = None;
        self.boundary = self.window.1;
    }

    /// Rests the cursor before the token at window-relative `index`
    /// (clamped to the window); `move_next` then enters it.
    pub fn move_index(&mut self, index: usize) {
        self.index = None;
        self.boundary = (self.window.0 + index).min(self.window.1);
    }

    /// Rests the cursor before the token containing `offset` (top-level
    /// coordinates) and returns how far `offset` reaches into it. `None`
    /// when no window token contains the offset; the cursor then rests at
    /// the window end.
    pub fn move_to(&mut self, offset: TextSize) -> Option<TextSize> {
        match self.find_covering(offset, false) {
            Some(index) => {
                self.index = None;
                self.boundary = index;
                Some(offset - (self.base + self.run.entries[index].range.start()))
            }
            None => {
                self.move_end();
                None
            }
        }
    }

    /// The token under the cursor.
    pub fn token(&self) -> Result<Token, Error> {
        self.check_version()?;
        let index = self.index.ok_or(Error::CursorUnpositioned)?;
        let entry = &self.run.entries[index];
        Ok(Token {
            id: entry.id,
            kind: entry.kind,
            range: entry.range + self.base,
            text: self.text.clone(),
        })
    }

    /// Start offset of the current token in top-level coordinates.
    pub fn offset(&self) -> Result<TextSize, Error> {
        self.check_version()?;
        let index = self.index.ok_or(Error::CursorUnpositioned)?;
        Ok(self.base + self.run.entries[index].range.start())
    }

    /// The embedded sequence rooted at the current token.
    ///
    /// Idempotent: every call at the same token, from any cursor over this
    /// list, is backed by the same child list and yields identical token
    /// identities. `Ok(None)` when the token embeds nothing.
    pub fn embedded(&self) -> Result<Option<TokenSequence>, Error> {
        self.check_version()?;
        let index = self.index.ok_or(Error::CursorUnpositioned)?;
        self.op.embedded_at(self.list, self.run.entries[index], self.version)
    }

    /// Attaches (or returns the already attached) embedding of `language`
    /// over the current token, excluding `skip_start`/`skip_end` delimiter
    /// characters.
    pub fn create_embedding(
        &self,
        language: &Language,
        skip_start: u32,
        skip_end: u32,
    ) -> Result<TokenSequence, Error> {
        self.check_version()?;
        let index = self.index.ok_or(Error::CursorUnpositioned)?;
        self.op.create_embedding_at(
            self.list,
            self.run.entries[index],
            self.version,
            language,
            skip_start.into(),
            skip_end.into(),
        )
    }

    /// New cursor over the same list restricted to tokens starting at or
    /// after `start_offset`. Token identities are shared with this cursor.
    pub fn sub_sequence(&self, start_offset: TextSize) -> Result<TokenSequence, Error> {
        self.sub_sequence_range(start_offset, self.base + self.span_len())
    }

    /// New cursor restricted to tokens overlapping `[start_offset,
    /// end_offset)`; both in top-level coordinates.
    pub fn sub_sequence_range(
        &self,
        start_offset: TextSize,
        end_offset: TextSize,
    ) -> Result<TokenSequence, Error> {
        self.check_version()?;
        let entries = &self.run.entries;
        let start_rel = start_offset.max(self.base) - self.base;
        let end_rel = end_offset.max(self.base) - self.base;
        let first =
            entries.partition_point(|entry| entry.range.end() <= start_rel).max(self.window.0);
        let last =
            entries.partition_point(|entry| entry.range.start() < end_rel).min(self.window.1);
        let window = (first, last.max(first));
        let mut sub = self.clone();
        sub.window = window;
        sub.index = None;
        sub.boundary = window.0;
        Ok(sub)
    }

    /// Positions the cursor on the token covering `offset`, honoring the
    /// boundary bias, and reports success.
    pub(crate) fn position_covering(&mut self, offset: TextSize, backward_bias: bool) -> bool {
        match self.find_covering(offset, backward_bias) {
            Some(index) => {
                self.index = Some(index);
                self.boundary = index;
                true
            }
            None => false,
        }
    }

    /// Window-bounded covering-token lookup. With backward bias a token
    /// ending exactly at `offset` wins; otherwise one starting there does.
    fn find_covering(&self, offset: TextSize, backward_bias: bool) -> Option<usize> {
        if offset < self.base || (backward_bias && offset == self.base) {
            return None;
        }
        let rel = offset - self.base;
        let probe = if backward_bias { rel - TextSize::new(1) } else { rel };
        let index = self.run.entry_at(probe)?;
        (index >= self.window.0 && index < self.window.1).then_some(index)
    }

    fn span_len(&self) -> TextSize {
        self.run.entries.last().map_or(TextSize::new(0), |entry| entry.range.end())
    }

    fn check_version(&self) -> Result<(), Error> {
        let actual = self.op.current_version();
        if actual == self.version {
            Ok(())
        } else {
            Err(Error::Expired { expected: self.version, actual })
        }
    }
}

impl fmt::Debug for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSequence")
            .field("path", &self.path)
            .field("tokens", &self.token_count())
            .field("index", &self.index())
            .finish_non_exhaustive()
    }
}
