use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::language::Language;

struct PathData {
    languages: Box<[Language]>,
}

/// Interned, non-empty chain of [`Language`]s describing one embedding route:
/// language at depth 0, the language embedded inside it at depth 1, and so on.
///
/// Structurally equal chains always resolve to the same instance, so `==` is
/// pointer identity and cheap; callers rely on that for path comparison.
#[derive(Clone)]
pub struct LanguagePath {
    data: Arc<PathData>,
}

impl LanguagePath {
    /// Returns the depth-1 path for `language`.
    pub fn new(language: &Language) -> Self {
        interner().intern(std::slice::from_ref(language))
    }

    /// Returns this path extended by one embedded `language`.
    pub fn embedded(&self, language: &Language) -> Self {
        let mut chain = self.data.languages.to_vec();
        chain.push(language.clone());
        interner().intern(&chain)
    }

    /// Returns this path extended by a whole `suffix` path, interned in one
    /// step.
    pub fn embedded_path(&self, suffix: &Self) -> Self {
        let mut chain = self.data.languages.to_vec();
        chain.extend_from_slice(&suffix.data.languages);
        interner().intern(&chain)
    }

    /// Returns the canonical sub-chain from depth `from` to the end.
    ///
    /// `sub_path(0)` is this very instance. Panics when `from` is out of
    /// bounds.
    pub fn sub_path(&self, from: usize) -> Self {
        self.sub_path_range(from, self.len())
    }

    /// Returns the canonical sub-chain covering depths `from..to`.
    ///
    /// Panics on an empty or out-of-bounds range.
    pub fn sub_path_range(&self, from: usize, to: usize) -> Self {
        assert!(from < to && to <= self.len(), "invalid sub-path range {from}..{to}");
        if from == 0 && to == self.len() {
            return self.clone();
        }
        interner().intern(&self.data.languages[from..to])
    }

    /// Returns the path one level up, or `None` at depth 1.
    pub fn parent(&self) -> Option<Self> {
        (self.len() > 1).then(|| self.sub_path_range(0, self.len() - 1))
    }

    /// Returns `true` iff `other` is a suffix chain of this path, including
    /// the whole-path case.
    pub fn ends_with(&self, other: &Self) -> bool {
        if other.len() > self.len() {
            return false;
        }
        let tail = &self.data.languages[self.len() - other.len()..];
        tail.iter().zip(other.languages()).all(|(a, b)| a == b)
    }

    pub fn languages(&self) -> &[Language] {
        &self.data.languages
    }

    /// Number of embedding levels; always at least 1.
    pub fn len(&self) -> usize {
        self.data.languages.len()
    }

    /// Language at `depth`. Panics when `depth` is out of bounds.
    pub fn language(&self, depth: usize) -> &Language {
        &self.data.languages[depth]
    }

    /// The outermost (depth-0) language.
    pub fn top_language(&self) -> &Language {
        &self.data.languages[0]
    }

    /// The innermost (deepest) language.
    pub fn inner_language(&self) -> &Language {
        self.data.languages.last().expect("paths are non-empty")
    }

    /// Dialect names joined by `/`, for diagnostics and lookup keys only.
    pub fn mime_path(&self) -> String {
        let names: Vec<&str> = self.languages().iter().map(Language::name).collect();
        names.join("/")
    }
}

impl PartialEq for LanguagePath {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for LanguagePath {}

impl std::hash::Hash for LanguagePath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.data) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for LanguagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LanguagePath({})", self.mime_path())
    }
}

/// Process-wide interning arena for language paths.
///
/// Append-only from the callers' perspective: entries are weak, so a chain
/// no longer referenced by any path is reclaimed and re-interned on next
/// use. Reads take the shared lock; only insertion takes the exclusive one.
struct PathInterner {
    table: RwLock<FxHashMap<Box<[usize]>, Weak<PathData>>>,
}

impl PathInterner {
    fn intern(&self, chain: &[Language]) -> LanguagePath {
        debug_assert!(!chain.is_empty(), "language paths are non-empty");
        let key: Box<[usize]> = chain.iter().map(Language::key).collect();

        if let Some(data) = self.table.read().get(&key).and_then(Weak::upgrade) {
            return LanguagePath { data };
        }

        let mut table = self.table.write();
        // Re-check under the exclusive lock: another thread may have
        // interned the same chain between the two lock acquisitions.
        if let Some(data) = table.get(&key).and_then(Weak::upgrade) {
            return LanguagePath { data };
        }
        let data = Arc::new(PathData { languages: chain.to_vec().into_boxed_slice() });
        table.insert(key, Arc::downgrade(&data));
        table.retain(|_, entry| entry.strong_count() > 0);
        LanguagePath { data }
    }
}

fn interner() -> &'static PathInterner {
    static INTERNER: OnceLock<PathInterner> = OnceLock::new();
    INTERNER.get_or_init(|| PathInterner { table: RwLock::new(FxHashMap::default()) })
}
