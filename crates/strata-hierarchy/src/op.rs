//! The engine behind a token hierarchy.
//!
//! All mutable shared state — list placeholders, the token arena, the
//! embedding cache — lives under one monitor (`Mutex` + `Condvar`).
//! Classifier execution happens outside the lock on whichever thread first
//! demands a list; threads arriving mid-build wait on the condvar in a
//! guarded re-check loop. Published runs are immutable, so routine reads
//! never touch the monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};
use strata_language::{
    EmbeddingContext, EmbeddingDecl, InputAttributes, Language, LanguagePath, TokenKind,
};
use strata_scan::ScanInput;
use text_size::{TextRange, TextSize};
use tracing::debug;

use crate::arena::{TokenArena, TokenId};
use crate::error::Error;
use crate::list::{EmbeddingEdge, ListData, ListId, ROOT_LIST, RunEntry, TokenRun};
use crate::sequence::TokenSequence;

/// One classified token before it is granted an identity.
pub(crate) struct ScannedPiece {
    pub(crate) kind: TokenKind,
    pub(crate) range: TextRange,
    pub(crate) embedding: Option<EmbeddingDecl>,
}

pub(crate) struct HierarchyState {
    pub(crate) text: Arc<str>,
    pub(crate) lists: FxHashMap<ListId, ListData>,
    pub(crate) next_list: u32,
    pub(crate) arena: TokenArena,
    pub(crate) embeddings: FxHashMap<TokenId, ListId>,
    pub(crate) version: u64,
}

impl HierarchyState {
    fn new(text: Arc<str>, root_path: LanguagePath) -> Self {
        let mut lists = FxHashMap::default();
        lists.insert(ROOT_LIST, ListData::new(root_path, None));
        Self {
            text,
            lists,
            next_list: 1,
            arena: TokenArena::new(),
            embeddings: FxHashMap::default(),
            version: 0,
        }
    }

    /// Absolute start offset of a list's span, via the parent chain.
    pub(crate) fn list_base(&self, list: ListId) -> TextSize {
        match &self.lists[&list].parent {
            None => TextSize::new(0),
            Some(edge) => {
                let parent_base = self.list_base(edge.parent_list);
                let entry = self.parent_entry(edge);
                parent_base + entry.range.start() + edge.skip_start
            }
        }
    }

    fn list_span_len(&self, list: ListId) -> TextSize {
        match &self.lists[&list].parent {
            None => TextSize::of(&*self.text),
            Some(edge) => {
                let entry = self.parent_entry(edge);
                entry.range.len() - edge.skip_start - edge.skip_end
            }
        }
    }

    fn parent_entry(&self, edge: &EmbeddingEdge) -> RunEntry {
        let run = self.lists[&edge.parent_list]
            .run
            .as_ref()
            .expect("embedded list is reachable only through a built parent");
        *run.entries
            .iter()
            .find(|entry| entry.id == edge.parent_token)
            .expect("parent token present in its own run")
    }

    /// Creates an unbuilt child list under `parent_token` and caches it.
    pub(crate) fn create_child(
        &mut self,
        parent_list: ListId,
        parent_token: TokenId,
        decl: &EmbeddingDecl,
    ) -> ListId {
        let child = ListId(self.next_list);
        self.next_list += 1;
        let child_path = self.lists[&parent_list].path.embedded(&decl.language);
        self.lists.insert(
            child,
            ListData::new(
                child_path,
                Some(EmbeddingEdge {
                    parent_list,
                    parent_token,
                    skip_start: decl.skip_start,
                    skip_end: decl.skip_end,
                }),
            ),
        );
        self.embeddings.insert(parent_token, child);
        child
    }

    /// Frees a token's slot and drops its embedded subtree.
    pub(crate) fn free_token(&mut self, id: TokenId) {
        self.arena.free(id);
        if let Some(child) = self.embeddings.remove(&id) {
            self.drop_list(child);
        }
    }

    fn drop_list(&mut self, list: ListId) {
        let Some(data) = self.lists.remove(&list) else { return };
        if let Some(run) = data.run {
            for entry in &run.entries {
                self.free_token(entry.id);
            }
        }
    }
}

/// Result of making sure a list is built: everything a cursor snapshots.
pub(crate) struct BuiltList {
    pub(crate) run: Arc<TokenRun>,
    pub(crate) path: LanguagePath,
    pub(crate) base: TextSize,
    pub(crate) text: Arc<str>,
    pub(crate) version: u64,
}

pub(crate) struct HierarchyOp {
    pub(crate) state: Mutex<HierarchyState>,
    pub(crate) built: Condvar,
    version: AtomicU64,
    attributes: InputAttributes,
    language: Language,
    root_path: LanguagePath,
}

impl HierarchyOp {
    pub(crate) fn new(text: String, language: Language, attributes: InputAttributes) -> Arc<Self> {
        let root_path = LanguagePath::new(&language);
        Arc::new(Self {
            state: Mutex::new(HierarchyState::new(text.into(), root_path.clone())),
            built: Condvar::new(),
            version: AtomicU64::new(0),
            attributes,
            language,
            root_path,
        })
    }

    pub(crate) fn language(&self) -> &Language {
        &self.language
    }

    pub(crate) fn root_path(&self) -> &LanguagePath {
        &self.root_path
    }

    pub(crate) fn attributes(&self) -> &InputAttributes {
        &self.attributes
    }

    pub(crate) fn current_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub(crate) fn publish_version(&self, state: &HierarchyState) {
        self.version.store(state.version, Ordering::Release);
    }

    pub(crate) fn text(&self) -> Arc<str> {
        self.state.lock().text.clone()
    }

    /// The root cursor, building the root list on first use.
    pub(crate) fn root_sequence(self: &Arc<Self>) -> Result<TokenSequence, Error> {
        self.sequence_for(ROOT_LIST)
    }

    pub(crate) fn sequence_for(self: &Arc<Self>, list: ListId) -> Result<TokenSequence, Error> {
        let built = self.ensure_built(list)?;
        Ok(TokenSequence::new(
            self.clone(),
            list,
            built.path,
            built.run,
            built.text,
            built.base,
            built.version,
        ))
    }

    /// Makes sure `list` has a published run, becoming the builder or
    /// waiting for one already at work.
    fn ensure_built(&self, list: ListId) -> Result<BuiltList, Error> {
        let mut state = self.state.lock();
        loop {
            let Some(data) = state.lists.get(&list) else {
                return Err(Error::Expired { expected: 0, actual: state.version });
            };
            if let Some(run) = &data.run {
                return Ok(BuiltList {
                    run: run.clone(),
                    path: data.path.clone(),
                    base: state.list_base(list),
                    text: state.text.clone(),
                    version: state.version,
                });
            }
            if !data.building {
                break;
            }
            // Guarded wait: re-check on wake, whether the notification was
            // for this list, another list, or spurious.
            self.built.wait(&mut state);
        }

        let snapshot_version = state.version;
        let path = state.lists[&list].path.clone();
        let base = state.list_base(list);
        let span_len = state.list_span_len(list);
        let text = state.text.clone();
        state.lists.get_mut(&list).expect("checked above").building = true;
        drop(state);

        let language = path.inner_language().clone();
        let span: std::ops::Range<usize> = TextRange::at(base, span_len).into();
        let scanned = scan_span(&language, &text[span], base);

        let mut state = self.state.lock();
        if !state.lists.contains_key(&list) {
            // Dropped by a rebuild while we were scanning.
            self.built.notify_all();
            return Err(Error::Expired { expected: snapshot_version, actual: state.version });
        }
        if state.version != snapshot_version {
            // An edit landed mid-scan; the produced tokens describe old
            // text. Hand the build back and retry against the new snapshot.
            state.lists.get_mut(&list).expect("checked above").building = false;
            self.built.notify_all();
            drop(state);
            return self.ensure_built(list);
        }

        let pieces = match scanned {
            Ok(pieces) => pieces,
            Err(err) => {
                state.lists.get_mut(&list).expect("checked above").building = false;
                self.built.notify_all();
                return Err(err);
            }
        };
        if let Err(err) = validate_embeddings(&pieces) {
            state.lists.get_mut(&list).expect("checked above").building = false;
            self.built.notify_all();
            return Err(err);
        }

        let mut entries = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            let id = state.arena.alloc();
            entries.push(RunEntry { id, kind: piece.kind, range: piece.range });
            if let Some(decl) = &piece.embedding {
                state.create_child(list, id, decl);
            }
        }
        let run = Arc::new(TokenRun { entries });

        debug!(
            path = %path.mime_path(),
            tokens = run.entries.len(),
            base = u32::from(base),
            "token list built"
        );

        let data = state.lists.get_mut(&list).expect("checked above");
        data.run = Some(run.clone());
        data.building = false;
        self.built.notify_all();

        Ok(BuiltList { run, path, base, text, version: snapshot_version })
    }

    /// Resolves (creating if needed) the embedding under `entry`.
    pub(crate) fn embedded_at(
        self: &Arc<Self>,
        list: ListId,
        entry: RunEntry,
        version: u64,
    ) -> Result<Option<TokenSequence>, Error> {
        let mut state = self.state.lock();
        if state.version != version {
            return Err(Error::Expired { expected: version, actual: state.version });
        }
        debug_assert!(state.arena.is_live(entry.id), "live version implies live token");

        let child = match state.embeddings.get(&entry.id).copied() {
            Some(child) => Some(child),
            None => {
                let path = state.lists[&list].path.clone();
                let language = path.inner_language().clone();
                let base = state.list_base(list);
                let text = state.text.clone();
                let abs: std::ops::Range<usize> = (entry.range + base).into();
                let context = EmbeddingContext {
                    kind: entry.kind,
                    text: &text[abs],
                    path: &path,
                    attributes: &self.attributes,
                };
                match language.embedding(context) {
                    None => None,
                    Some(decl) => {
                        check_skips(decl.skip_start, decl.skip_end, entry.range.len())?;
                        Some(state.create_child(list, entry.id, &decl))
                    }
                }
            }
        };
        drop(state);

        match child {
            None => Ok(None),
            Some(child) => self.sequence_for(child).map(Some),
        }
    }

    /// Explicit embedding creation; idempotent per token, raced creations
    /// resolve to the first one under the monitor.
    pub(crate) fn create_embedding_at(
        self: &Arc<Self>,
        list: ListId,
        entry: RunEntry,
        version: u64,
        language: &Language,
        skip_start: TextSize,
        skip_end: TextSize,
    ) -> Result<TokenSequence, Error> {
        let mut state = self.state.lock();
        if state.version != version {
            return Err(Error::Expired { expected: version, actual: state.version });
        }
        let child = match state.embeddings.get(&entry.id).copied() {
            Some(child) => child,
            None => {
                check_skips(skip_start, skip_end, entry.range.len())?;
                let decl = EmbeddingDecl {
                    language: language.clone(),
                    skip_start,
                    skip_end,
                };
                state.create_child(list, entry.id, &decl)
            }
        };
        drop(state);
        self.sequence_for(child)
    }

    /// Every language path a list currently exists for, root included.
    pub(crate) fn language_paths(&self) -> Vec<LanguagePath> {
        let state = self.state.lock();
        let mut paths: Vec<LanguagePath> = state
            .lists
            .values()
            .map(|data| data.path.clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        paths.sort_by_key(|path| (path.len(), path.mime_path()));
        paths
    }

    /// The stack of sequences covering `offset`, outermost first.
    pub(crate) fn embedded_sequences(
        self: &Arc<Self>,
        offset: TextSize,
        backward_bias: bool,
    ) -> Result<Vec<TokenSequence>, Error> {
        let mut result = Vec::new();
        let mut sequence = self.root_sequence()?;
        loop {
            if !sequence.position_covering(offset, backward_bias) {
                break;
            }
            result.push(sequence.clone());
            match sequence.embedded()? {
                Some(child) => sequence = child,
                None => break,
            }
        }
        Ok(result)
    }

    /// Discards every token and list; the next query re-lexes from scratch.
    pub(crate) fn rebuild(&self) {
        let mut state = self.state.lock();
        state.arena.clear();
        state.lists.clear();
        state.embeddings.clear();
        state.lists.insert(ROOT_LIST, ListData::new(self.root_path.clone(), None));
        state.version += 1;
        self.publish_version(&state);
        self.built.notify_all();
        debug!(version = state.version, "hierarchy rebuilt");
    }
}

pub(crate) fn check_skips(
    skip_start: TextSize,
    skip_end: TextSize,
    token_len: TextSize,
) -> Result<(), Error> {
    if skip_start + skip_end > token_len {
        return Err(Error::InvalidEmbedding { skip_start, skip_end, token_len });
    }
    Ok(())
}

fn validate_embeddings(pieces: &[ScannedPiece]) -> Result<(), Error> {
    for piece in pieces {
        if let Some(decl) = &piece.embedding {
            check_skips(decl.skip_start, decl.skip_end, piece.range.len())?;
        }
    }
    Ok(())
}

/// Drives a classifier over one span, producing list-relative pieces.
///
/// `span_base` only labels error offsets in top-level coordinates.
pub(crate) fn scan_span(
    language: &Language,
    span: &str,
    span_base: TextSize,
) -> Result<Vec<ScannedPiece>, Error> {
    let mut input = ScanInput::new(span);
    let mut classifier = language.classifier();
    let mut pieces = Vec::new();
    loop {
        let start = input.token_start();
        match classifier.next_token(&mut input) {
            Some(token) => {
                let len = input.finish_token();
                if len == TextSize::new(0) {
                    return Err(stalled(language, span_base + start));
                }
                pieces.push(ScannedPiece {
                    kind: token.kind,
                    range: TextRange::at(start, len),
                    embedding: token.embedding,
                });
            }
            None => {
                if !input.is_eof() {
                    // Refusing input short of the span end stalls the scan
                    // just like a zero-length token does.
                    return Err(stalled(language, span_base + start));
                }
                break;
            }
        }
    }
    Ok(pieces)
}

fn stalled(language: &Language, offset: TextSize) -> Error {
    Error::ClassifierStalled { language: language.name().to_string(), offset }
}
