//! Selector Repository
//!
//! Process-wide cache of compiled selector chains, keyed by selector text,
//! parsing mode and reference resolver identity. The cache is bounded: once
//! full, new compilations are returned to the caller but not stored.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use lru::LruCache;

use super::item::SelectorItem;
use super::parser::parse_selector;
use crate::error::{MarkupError, SelectorError};
use crate::markup::ParsingMode;

/// Maximum number of compiled selectors kept by the global repository
pub const MAX_ENTRIES: usize = 1000;

/// Maps a reference name (`%name`, or a bare element name) to a selector
/// fragment. Returning `None` leaves the name to be matched literally.
///
/// Compiled selectors are cached per resolver *instance*, so a resolver
/// must give the same answer for the same reference for as long as it is
/// in use.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<String>;
}

impl ReferenceResolver for HashMap<String, String> {
    fn resolve(&self, reference: &str) -> Option<String> {
        self.get(reference).cloned()
    }
}

/// Resolver compared and hashed by allocation address
#[derive(Clone)]
struct ResolverKey(Arc<dyn ReferenceResolver>);

impl ResolverKey {
    fn address(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ResolverKey {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ResolverKey {}

impl Hash for ResolverKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    selector: String,
    mode: ParsingMode,
    resolver: Option<ResolverKey>,
}

/// Bounded, thread-safe cache of compiled selector chains
pub struct SelectorRepository {
    cache: Mutex<LruCache<CacheKey, Arc<[SelectorItem]>>>,
}

impl SelectorRepository {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        SelectorRepository {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The repository shared by every parse in the process
    pub fn global() -> &'static SelectorRepository {
        static GLOBAL: LazyLock<SelectorRepository> = LazyLock::new(SelectorRepository::new);
        &GLOBAL
    }

    // A panic while holding the lock cannot leave the cache inconsistent
    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<[SelectorItem]>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compile `selector`, reusing a cached chain when available
    pub fn compile(
        &self,
        selector: &str,
        mode: ParsingMode,
        resolver: Option<&Arc<dyn ReferenceResolver>>,
    ) -> Result<Arc<[SelectorItem]>, SelectorError> {
        let key = CacheKey {
            selector: selector.to_string(),
            mode,
            resolver: resolver.cloned().map(ResolverKey),
        };

        if let Some(items) = self.lock().get(&key) {
            trace!("selector cache hit: \"{}\"", selector);
            return Ok(Arc::clone(items));
        }

        let items: Arc<[SelectorItem]> = parse_selector(selector, mode, resolver.map(|r| &**r))?.into();
        debug!(
            "compiled selector \"{}\" ({:?}) into {} step(s)",
            selector,
            mode,
            items.len()
        );

        let mut cache = self.lock();
        if cache.len() < cache.cap().get() || cache.contains(&key) {
            cache.put(key, Arc::clone(&items));
        } else {
            debug!(
                "selector cache full ({} entries), not storing \"{}\"",
                cache.len(),
                selector
            );
        }
        Ok(items)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for SelectorRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// A list of selectors compiled for one parsing mode
///
/// Holds only immutable chains; every parse builds fresh matching state
/// from it, so one value can serve any number of parses.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    names: Vec<String>,
    chains: Vec<Arc<[SelectorItem]>>,
    mode: ParsingMode,
}

impl CompiledSelectors {
    /// Compile through the global repository
    pub fn compile<S: AsRef<str>>(
        selectors: &[S],
        mode: ParsingMode,
        resolver: Option<&Arc<dyn ReferenceResolver>>,
    ) -> Result<Self, MarkupError> {
        Self::compile_with(SelectorRepository::global(), selectors, mode, resolver)
    }

    pub fn compile_with<S: AsRef<str>>(
        repository: &SelectorRepository,
        selectors: &[S],
        mode: ParsingMode,
        resolver: Option<&Arc<dyn ReferenceResolver>>,
    ) -> Result<Self, MarkupError> {
        if selectors.is_empty() {
            return Err(MarkupError::Configuration(
                "at least one selector must be specified".to_string(),
            ));
        }

        let mut names = Vec::with_capacity(selectors.len());
        let mut chains = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let selector = selector.as_ref();
            chains.push(repository.compile(selector, mode, resolver)?);
            names.push(selector.to_string());
        }

        Ok(CompiledSelectors {
            names,
            chains,
            mode,
        })
    }

    /// Selector texts, in the order given
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn chains(&self) -> &[Arc<[SelectorItem]>] {
        &self.chains
    }

    pub fn parsing_mode(&self) -> ParsingMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
