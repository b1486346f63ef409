//! Test dialects shared by the integration tests.
//!
//! Three small languages exercise both embedding mechanisms: `doc` declares
//! embeddings inline from its classifier, `markup` declares them lazily via
//! the language hook (honoring a suppression attribute), and `plain` /
//! `expr` are the embedded leaves.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_hierarchy::TokenSequence;
use strata_language::{
    Classifier, EmbeddingContext, EmbeddingDecl, KindInfo, Language, LanguageDef, ScannedToken,
    TokenKind,
};
use strata_scan::ScanInput;

pub const WORD: TokenKind = TokenKind::new(0);
pub const SPACE: TokenKind = TokenKind::new(1);
pub const PUNCT: TokenKind = TokenKind::new(2);
pub const COMMENT: TokenKind = TokenKind::new(3);
pub const TEXT: TokenKind = TokenKind::new(0);
pub const TAG: TokenKind = TokenKind::new(1);

/// Whitespace-and-words leaf language.
pub fn plain() -> Language {
    Language::new(PlainDef)
}

struct PlainDef;

impl LanguageDef for PlainDef {
    fn name(&self) -> &str {
        "text/x-plain"
    }

    fn kinds(&self) -> Vec<KindInfo> {
        vec![
            KindInfo::new("word"),
            KindInfo::with_category("space", "whitespace"),
            KindInfo::new("punct"),
        ]
    }

    fn classifier(&self) -> Box<dyn Classifier> {
        Box::new(PlainClassifier)
    }
}

struct PlainClassifier;

impl Classifier for PlainClassifier {
    fn next_token(&mut self, input: &mut ScanInput<'_>) -> Option<ScannedToken> {
        if input.is_eof() {
            return None;
        }
        let first = input.advance();
        let kind = if first.is_alphanumeric() {
            input.advance_while(char::is_alphanumeric);
            WORD
        } else if first.is_whitespace() {
            input.advance_while(char::is_whitespace);
            SPACE
        } else {
            PUNCT
        };
        Some(ScannedToken::new(kind))
    }
}

/// Word language whose `/** ... */` comments embed `embedded` inline,
/// excluding the `/**` and `*/` delimiters.
pub fn doc(embedded: &Language) -> Language {
    Language::new(DocDef { embedded: embedded.clone() })
}

struct DocDef {
    embedded: Language,
}

impl LanguageDef for DocDef {
    fn name(&self) -> &str {
        "text/x-doc"
    }

    fn kinds(&self) -> Vec<KindInfo> {
        vec![
            KindInfo::new("word"),
            KindInfo::with_category("space", "whitespace"),
            KindInfo::new("punct"),
            KindInfo::with_category("comment", "comment"),
        ]
    }

    fn classifier(&self) -> Box<dyn Classifier> {
        Box::new(DocClassifier { embedded: self.embedded.clone() })
    }
}

struct DocClassifier {
    embedded: Language,
}

impl Classifier for DocClassifier {
    fn next_token(&mut self, input: &mut ScanInput<'_>) -> Option<ScannedToken> {
        if input.is_eof() {
            return None;
        }
        if input.peek() == '/' && input.peek_second() == '*' {
            input.advance();
            input.advance();
            let doc = input.peek() == '*';
            let mut terminated = false;
            while !input.is_eof() {
                if input.peek() == '*' && input.peek_second() == '/' {
                    input.advance();
                    input.advance();
                    terminated = true;
                    break;
                }
                input.advance();
            }
            // Only a closed `/**...*/` has room for the delimiter skips.
            if doc && terminated && u32::from(input.scanned_len()) >= 5 {
                return Some(ScannedToken::with_embedding(
                    COMMENT,
                    EmbeddingDecl::new(self.embedded.clone(), 3, 2),
                ));
            }
            return Some(ScannedToken::new(COMMENT));
        }
        let first = input.advance();
        let kind = if first.is_alphanumeric() {
            input.advance_while(char::is_alphanumeric);
            WORD
        } else if first.is_whitespace() {
            input.advance_while(char::is_whitespace);
            SPACE
        } else {
            PUNCT
        };
        Some(ScannedToken::new(kind))
    }
}

/// Markup-ish language: `<...>` tags between text runs. Tags embed
/// `embedded` through the language hook unless the `suppress-embedding`
/// attribute is set at this path.
pub fn markup(embedded: &Language) -> Language {
    Language::new(MarkupDef { embedded: embedded.clone() })
}

struct MarkupDef {
    embedded: Language,
}

impl LanguageDef for MarkupDef {
    fn name(&self) -> &str {
        "text/x-markup"
    }

    fn kinds(&self) -> Vec<KindInfo> {
        vec![KindInfo::new("text"), KindInfo::new("tag")]
    }

    fn classifier(&self) -> Box<dyn Classifier> {
        Box::new(MarkupClassifier)
    }

    fn embedding(&self, context: EmbeddingContext<'_>) -> Option<EmbeddingDecl> {
        if context.kind != TAG || !context.text.ends_with('>') {
            return None;
        }
        let suppressed = context
            .attributes
            .get_as::<bool>(context.path, "suppress-embedding")
            .is_some_and(|flag| *flag);
        if suppressed {
            return None;
        }
        Some(EmbeddingDecl::new(self.embedded.clone(), 1, 1))
    }
}

struct MarkupClassifier;

impl Classifier for MarkupClassifier {
    fn next_token(&mut self, input: &mut ScanInput<'_>) -> Option<ScannedToken> {
        if input.is_eof() {
            return None;
        }
        if input.peek() == '<' {
            input.advance();
            input.advance_while(|c| c != '>');
            if !input.is_eof() {
                input.advance();
            }
            return Some(ScannedToken::new(TAG));
        }
        input.advance();
        input.advance_while(|c| c != '<');
        Some(ScannedToken::new(TEXT))
    }
}

/// Plain word language whose classifier constructions are counted, for
/// asserting how many builds actually ran.
pub fn counting(counter: &Arc<AtomicUsize>) -> Language {
    Language::new(CountingDef { counter: counter.clone() })
}

struct CountingDef {
    counter: Arc<AtomicUsize>,
}

impl LanguageDef for CountingDef {
    fn name(&self) -> &str {
        "text/x-counted"
    }

    fn kinds(&self) -> Vec<KindInfo> {
        vec![
            KindInfo::new("word"),
            KindInfo::with_category("space", "whitespace"),
            KindInfo::new("punct"),
        ]
    }

    fn classifier(&self) -> Box<dyn Classifier> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Box::new(PlainClassifier)
    }
}

/// Language whose classifier refuses to advance: a broken plugin.
pub fn stalling() -> Language {
    Language::new(StallingDef)
}

struct StallingDef;

impl LanguageDef for StallingDef {
    fn name(&self) -> &str {
        "text/x-stalling"
    }

    fn kinds(&self) -> Vec<KindInfo> {
        vec![KindInfo::new("word")]
    }

    fn classifier(&self) -> Box<dyn Classifier> {
        Box::new(StallingClassifier)
    }
}

struct StallingClassifier;

impl Classifier for StallingClassifier {
    fn next_token(&mut self, input: &mut ScanInput<'_>) -> Option<ScannedToken> {
        if input.is_eof() { None } else { Some(ScannedToken::new(TokenKind::new(0))) }
    }
}

/// Renders every token of `sequence` as one `kind "text" @range` line.
pub fn dump(sequence: &mut TokenSequence) -> String {
    let mut out = String::new();
    sequence.move_start();
    while sequence.move_next() {
        let token = sequence.token().expect("cursor is on a token");
        let name = sequence.language().kind_name(token.kind()).to_string();
        writeln!(out, "{name} {:?} @{:?}", token.text(), token.range()).unwrap();
    }
    out
}

/// Collects `(kind, range)` pairs for comparing token streams.
pub fn shape(sequence: &mut TokenSequence) -> Vec<(TokenKind, text_size::TextRange)> {
    let mut out = Vec::new();
    sequence.move_start();
    while sequence.move_next() {
        let token = sequence.token().expect("cursor is on a token");
        out.push((token.kind(), token.range()));
    }
    out
}

/// Collects token identities for identity-stability assertions.
pub fn identities(sequence: &mut TokenSequence) -> Vec<strata_hierarchy::TokenId> {
    let mut out = Vec::new();
    sequence.move_start();
    while sequence.move_next() {
        out.push(sequence.token().expect("cursor is on a token").id());
    }
    out
}
