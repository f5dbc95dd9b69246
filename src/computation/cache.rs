//! Parse cache for computation expressions
//!
//! Metadata repeats the same few computation strings across many opcodes, and
//! decode paths evaluate them on every read. Parsed trees are kept in a global
//! LRU cache keyed by `(variable, source)` so each distinct string is
//! tokenized and parsed once.
//!
//! Only successful parses are cached; syntax errors are recomputed, which is
//! fine since they abort metadata loading anyway.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::parser::{self, Expr};
use super::Variable;
use crate::config;

/// Statistics for parse cache monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

type ParseKey = (Variable, Arc<str>);

static PARSE_CACHE: LazyLock<Mutex<LruCache<ParseKey, Arc<Expr>>>> = LazyLock::new(|| {
    let size = NonZeroUsize::new(config::current().parse_cache_size).unwrap_or(NonZeroUsize::MIN);
    Mutex::new(LruCache::new(size))
});

static HITS: AtomicU64 = AtomicU64::new(0);
static MISSES: AtomicU64 = AtomicU64::new(0);

/// Parse `source`, returning the cached tree when the same string was seen before
pub fn parse_cached(source: &str, variable: Variable) -> Result<Arc<Expr>, String> {
    let key: ParseKey = (variable, Arc::from(source));
    if let Some(expr) = PARSE_CACHE.lock().get(&key) {
        HITS.fetch_add(1, Ordering::Relaxed);
        return Ok(Arc::clone(expr));
    }

    MISSES.fetch_add(1, Ordering::Relaxed);
    debug!(target: "opmeta::computation::cache", source, variable = variable.name(), "Parsing computation");
    let expr = Arc::new(parser::parse(source, variable)?);

    // Another thread may have parsed the same string meanwhile; either tree is identical.
    PARSE_CACHE.lock().put(key, Arc::clone(&expr));
    Ok(expr)
}

pub fn stats() -> ParseCacheStats {
    ParseCacheStats {
        hits: HITS.load(Ordering::Relaxed),
        misses: MISSES.load(Ordering::Relaxed),
        entries: PARSE_CACHE.lock().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cached_returns_shared_tree() {
        let source = "(arg + 11) * 3 - 7";
        let first = parse_cached(source, Variable::Arg).unwrap();
        let second = parse_cached(source, Variable::Arg).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_parse_cached_keys_on_variable() {
        assert!(parse_cached("bits * 5 + 2", Variable::Bits).is_ok());
        assert!(parse_cached("bits * 5 + 2", Variable::Arg).is_err());
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let before = stats().misses;
        assert!(parse_cached("arg +* 1", Variable::Arg).is_err());
        assert!(parse_cached("arg +* 1", Variable::Arg).is_err());
        assert!(stats().misses >= before + 2);
    }
}
