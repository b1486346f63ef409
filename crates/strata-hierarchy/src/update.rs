//! Incremental re-lex after a text edit.
//!
//! Only the minimal damaged region is re-scanned: the scan restarts at the
//! token preceding the edit and runs forward until a produced boundary
//! lines up with a (shifted) old token boundary past the edit, at which
//! point the entire old suffix is reused by reference. Identity
//! preservation here is a correctness requirement, not an optimization —
//! embedded lists and downstream caches are keyed by token identity.

use std::sync::Arc;

use strata_scan::ScanInput;
use text_size::{TextRange, TextSize};
use tracing::debug;

use crate::error::Error;
use crate::list::{ROOT_LIST, RunEntry, TokenRun};
use crate::op::{HierarchyOp, HierarchyState, ScannedPiece, check_skips};

/// Summary of one edit's effect on the root token run, in post-edit
/// coordinates. Consumption (repaint scheduling, parser invalidation) is
/// the host's concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenChange {
    /// Region whose tokens were replaced.
    pub range: TextRange,
    /// Old tokens discarded, identity lost.
    pub removed_tokens: usize,
    /// Fresh tokens spliced in.
    pub added_tokens: usize,
    /// Net text length change.
    pub delta: i64,
}

impl HierarchyOp {
    /// Inserts `text` at `offset`, re-lexing the damaged region.
    pub(crate) fn insert(&self, offset: TextSize, text: &str) -> Result<TokenChange, Error> {
        self.edit(offset, TextSize::new(0), text)
    }

    /// Removes `len` characters at `offset`, re-lexing the damaged region.
    pub(crate) fn remove(&self, offset: TextSize, len: TextSize) -> Result<TokenChange, Error> {
        self.edit(offset, len, "")
    }

    /// Applies one splice to the text and updates the root run in place.
    ///
    /// Panics when the edit range is out of bounds or splits a character,
    /// matching the standard library's `String::replace_range`.
    fn edit(&self, offset: TextSize, removed: TextSize, inserted: &str) -> Result<TokenChange, Error> {
        let mut state = self.state.lock();
        let old_len = TextSize::of(&*state.text);
        assert!(
            offset + removed <= old_len,
            "edit {offset:?}+{removed:?} out of bounds of {old_len:?}"
        );

        let start: usize = offset.into();
        let end: usize = (offset + removed).into();
        let mut new_text = String::with_capacity(state.text.len() + inserted.len());
        new_text.push_str(&state.text[..start]);
        new_text.push_str(inserted);
        new_text.push_str(&state.text[end..]);
        state.text = new_text.into();

        state.version += 1;
        self.publish_version(&state);

        let change = relex_root(&mut state, offset, removed, TextSize::of(inserted));
        // Either outcome invalidated outstanding snapshots; let waiters
        // re-check against the new state.
        self.built.notify_all();

        match change {
            Ok(change) => {
                debug!(
                    range = ?change.range,
                    removed = change.removed_tokens,
                    added = change.added_tokens,
                    delta = change.delta,
                    "incremental re-lex"
                );
                Ok(change)
            }
            Err(err) => Err(err),
        }
    }
}

fn relex_root(
    state: &mut HierarchyState,
    start: TextSize,
    removed: TextSize,
    inserted: TextSize,
) -> Result<TokenChange, Error> {
    let delta = i64::from(u32::from(inserted)) - i64::from(u32::from(removed));
    let Some(old_run) = state.lists[&ROOT_LIST].run.clone() else {
        // Never built: the next traversal lexes the post-edit text.
        return Ok(TokenChange {
            range: TextRange::at(start, inserted),
            removed_tokens: 0,
            added_tokens: 0,
            delta,
        });
    };
    let entries = &old_run.entries;
    let old_end = start + removed;
    let shift = |offset: TextSize| -> TextSize {
        TextSize::new(u32::try_from(i64::from(u32::from(offset)) + delta).expect("suffix offsets stay non-negative"))
    };

    // Resume one token before the first one the edit touches.
    let first_touched = entries.partition_point(|entry| entry.range.end() < start);
    let relex_from = first_touched.saturating_sub(1);
    let relex_start =
        entries.get(relex_from).map_or(TextSize::new(0), |entry| entry.range.start());

    // First old token lying entirely behind the edit: the re-sync
    // candidates. Their text is untouched, so a boundary match there means
    // byte-identical input from that point on.
    let mut tail = entries.partition_point(|entry| entry.range.start() < old_end);

    let text = state.text.clone();
    let language = state.lists[&ROOT_LIST].path.inner_language().clone();
    let mut input = ScanInput::new(&text[usize::from(relex_start)..]);
    let mut classifier = language.classifier();
    let mut produced: Vec<ScannedPiece> = Vec::new();

    // Scan forward until a produced boundary coincides with a shifted old
    // boundary; suffix offsets are >= the new edit end, so alignment
    // guarantees byte-identical text from there on.
    let resync = loop {
        let boundary = relex_start + input.token_start();
        while tail < entries.len() && shift(entries[tail].range.start()) < boundary {
            tail += 1;
        }
        if tail < entries.len() && shift(entries[tail].range.start()) == boundary {
            break tail;
        }
        match classifier.next_token(&mut input) {
            Some(token) => {
                let piece_start = input.token_start();
                let len = input.finish_token();
                if len == TextSize::new(0) {
                    drop_root_run(state);
                    return Err(Error::ClassifierStalled {
                        language: language.name().to_string(),
                        offset: relex_start + piece_start,
                    });
                }
                produced.push(ScannedPiece {
                    kind: token.kind,
                    range: TextRange::at(relex_start + piece_start, len),
                    embedding: token.embedding,
                });
            }
            None => {
                if !input.is_eof() {
                    drop_root_run(state);
                    return Err(Error::ClassifierStalled {
                        language: language.name().to_string(),
                        offset: boundary,
                    });
                }
                break entries.len();
            }
        }
    };

    for piece in &produced {
        if let Some(decl) = &piece.embedding
            && let Err(err) = check_skips(decl.skip_start, decl.skip_end, piece.range.len())
        {
            drop_root_run(state);
            return Err(err);
        }
    }

    // Re-scanned tokens fully in front of the edit that came out unchanged
    // keep their identity.
    let mut head_reused = 0;
    while head_reused < produced.len() {
        let Some(old) = entries.get(relex_from + head_reused) else { break };
        let piece = &produced[head_reused];
        if old.range.end() <= start && old.range == piece.range && old.kind == piece.kind {
            head_reused += 1;
        } else {
            break;
        }
    }

    for old in &entries[relex_from + head_reused..resync] {
        state.free_token(old.id);
    }

    let mut new_entries =
        Vec::with_capacity(relex_from + produced.len() + (entries.len() - resync));
    new_entries.extend_from_slice(&entries[..relex_from + head_reused]);
    for piece in &produced[head_reused..] {
        let id = state.arena.alloc();
        new_entries.push(RunEntry { id, kind: piece.kind, range: piece.range });
        if let Some(decl) = &piece.embedding {
            state.create_child(ROOT_LIST, id, decl);
        }
    }
    for old in &entries[resync..] {
        new_entries.push(RunEntry {
            id: old.id,
            kind: old.kind,
            range: TextRange::at(shift(old.range.start()), old.range.len()),
        });
    }

    let affected_end = produced
        .last()
        .map_or(start + inserted, |piece| piece.range.end())
        .max(start + inserted);
    let change = TokenChange {
        range: TextRange::new(relex_start, affected_end),
        removed_tokens: resync - (relex_from + head_reused),
        added_tokens: produced.len() - head_reused,
        delta,
    };

    state.lists.get_mut(&ROOT_LIST).expect("root list always present").run =
        Some(Arc::new(TokenRun { entries: new_entries }));

    Ok(change)
}

/// A classifier failure mid-splice leaves no defensible run: drop the root
/// list's tokens entirely so the next access re-lexes from scratch.
fn drop_root_run(state: &mut HierarchyState) {
    let root = state.lists.get_mut(&ROOT_LIST).expect("root list always present");
    if let Some(run) = root.run.take() {
        for entry in &run.entries {
            state.free_token(entry.id);
        }
    }
}
