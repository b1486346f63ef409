use std::fmt;
use std::sync::Arc;

use crate::classifier::{Classifier, EmbeddingContext, EmbeddingDecl};

/// Ordinal of a token kind within its owning [`Language`]'s vocabulary.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenKind(u16);

impl TokenKind {
    pub const fn new(ordinal: u16) -> Self {
        Self(ordinal)
    }

    pub const fn ordinal(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenKind({})", self.0)
    }
}

/// Display name and optional category for one token kind.
#[derive(Clone, Copy, Debug)]
pub struct KindInfo {
    pub name: &'static str,
    pub category: Option<&'static str>,
}

impl KindInfo {
    pub const fn new(name: &'static str) -> Self {
        Self { name, category: None }
    }

    pub const fn with_category(name: &'static str, category: &'static str) -> Self {
        Self { name, category: Some(category) }
    }
}

/// Definition of one lexical dialect, injected at [`Language`] construction.
///
/// Implementations are stateless descriptions: per-span scan state lives in
/// the classifier returned from [`classifier`](Self::classifier).
pub trait LanguageDef: Send + Sync + 'static {
    /// Dialect identifier, used for diagnostics and mime-path display.
    fn name(&self) -> &str;

    /// Ordered token-kind vocabulary; [`TokenKind`] ordinals index into it.
    fn kinds(&self) -> Vec<KindInfo>;

    /// Creates a fresh classifier for one span of this dialect.
    fn classifier(&self) -> Box<dyn Classifier>;

    /// Default embedding for a token, consulted on the first `embedded()`
    /// access. `None` means the token embeds nothing by itself; an explicit
    /// `create_embedding` can still attach one.
    ///
    /// Called while the owning hierarchy's internal lock is held: inspect
    /// only the given context, never query the hierarchy from here.
    fn embedding(&self, context: EmbeddingContext<'_>) -> Option<EmbeddingDecl> {
        let _ = context;
        None
    }

    /// Fixed spelling for single-spelling kinds (operators, separators).
    fn flyweight_text(&self, kind: TokenKind) -> Option<&'static str> {
        let _ = kind;
        None
    }
}

struct LanguageData {
    def: Box<dyn LanguageDef>,
    kinds: Vec<KindInfo>,
}

/// Immutable description of one lexical dialect.
///
/// Cheap to clone; equality and hashing are by identity. A refreshed
/// vocabulary is a new `Language`, never an in-place mutation.
#[derive(Clone)]
pub struct Language {
    data: Arc<LanguageData>,
}

impl Language {
    pub fn new(def: impl LanguageDef) -> Self {
        let kinds = def.kinds();
        Self { data: Arc::new(LanguageData { def: Box::new(def), kinds }) }
    }

    pub fn name(&self) -> &str {
        self.data.def.name()
    }

    pub fn kind_count(&self) -> usize {
        self.data.kinds.len()
    }

    /// Display name of `kind`.
    ///
    /// Panics when `kind` is not part of this language's vocabulary.
    pub fn kind_name(&self, kind: TokenKind) -> &str {
        self.data.kinds[kind.ordinal() as usize].name
    }

    pub fn kind_category(&self, kind: TokenKind) -> Option<&str> {
        self.data.kinds[kind.ordinal() as usize].category
    }

    pub fn flyweight_text(&self, kind: TokenKind) -> Option<&'static str> {
        self.data.def.flyweight_text(kind)
    }

    /// Creates a fresh classifier for one span.
    pub fn classifier(&self) -> Box<dyn Classifier> {
        self.data.def.classifier()
    }

    /// Consults the dialect's default-embedding hook.
    pub fn embedding(&self, context: EmbeddingContext<'_>) -> Option<EmbeddingDecl> {
        self.data.def.embedding(context)
    }

    /// Stable address used for identity comparison and path interning.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.data) as *const () as usize
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Language {}

impl std::hash::Hash for Language {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language").field("name", &self.name()).finish_non_exhaustive()
    }
}
