//! Bounded brute-force inversion of computations, with a concurrent memo cache
//!
//! Encoding a logical argument value back into raw operand bits needs the
//! inverse of the argument's computation. Operand fields are at most 16 bits
//! wide, so the inverse is found by evaluating every raw candidate
//! `0..=2^width - 1` and collecting those that map to the target.
//!
//! # Design
//!
//! - Results keyed by `(expression, variable, target, width)`
//! - Insert-if-absent population via `DashMap::entry`, safe for concurrent callers
//! - Atomic access counters for approximate LRU eviction (oldest ~25% dropped)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use smallvec::SmallVec;
use tracing::debug;

use super::parser::{Expr, Fault};
use super::Variable;
use crate::config;

/// Key for inversion cache entries
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct InverseKey {
    expression: Arc<str>,
    variable: Variable,
    target: i64,
    width: u8,
}

/// Every raw value in the searched domain that evaluates to the target
pub type Matches = Arc<[u16]>;

/// Outcome of a brute-force search
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inversion {
    /// Raw candidates that map to the target (possibly none)
    Found(Matches),
    /// Every candidate failed to evaluate; the first failure is kept
    Failed(Fault),
}

#[derive(Clone, Debug)]
struct InverseEntry {
    result: Inversion,
    access_count: u64,
}

/// Memo cache for inversion results
pub struct InverseCache {
    cache: DashMap<InverseKey, InverseEntry>,
    max_entries: usize,
    access_counter: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for InverseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InverseCache")
            .field("entries", &self.cache.len())
            .field("max_entries", &self.max_entries)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

/// Statistics for the inversion cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseCacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

static GLOBAL: LazyLock<InverseCache> =
    LazyLock::new(|| InverseCache::new(config::current().inversion_cache_size));

impl InverseCache {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            cache: DashMap::with_capacity(max_entries.min(1024)),
            max_entries,
            access_counter: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The process-wide cache used by the operand builder
    pub fn global() -> &'static InverseCache {
        &GLOBAL
    }

    /// Find all raw values of `width` bits that `expr` maps to `target`
    pub fn invert(
        &self,
        source: &Arc<str>,
        variable: Variable,
        expr: &Expr,
        target: i64,
        width: u8,
    ) -> Inversion {
        let key = InverseKey {
            expression: Arc::clone(source),
            variable,
            target,
            width,
        };

        if let Some(mut entry) = self.cache.get_mut(&key) {
            entry.access_count = self.access_counter.fetch_add(1, Ordering::Relaxed) + 1;
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.result.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let result = search(expr, target, width);
        match &result {
            Inversion::Found(matches) => debug!(
                target: "opmeta::computation::inverse",
                expression = &**source,
                logical = target,
                width,
                matches = matches.len(),
                "Inverted computation"
            ),
            Inversion::Failed(fault) => debug!(
                target: "opmeta::computation::inverse",
                expression = &**source,
                logical = target,
                width,
                %fault,
                "Every candidate failed to evaluate"
            ),
        }

        if self.cache.len() >= self.max_entries {
            self.evict_lru();
        }
        let access_count = self.access_counter.fetch_add(1, Ordering::Relaxed) + 1;
        // Results are deterministic, so whichever racing insert lands first is kept.
        self.cache
            .entry(key)
            .or_insert(InverseEntry {
                result,
                access_count,
            })
            .result
            .clone()
    }

    fn evict_lru(&self) {
        let to_evict = (self.max_entries / 4).max(1);
        let mut entries: Vec<_> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().access_count))
            .collect();
        entries.sort_by_key(|(_, count)| *count);
        for (key, _) in entries.into_iter().take(to_evict) {
            self.cache.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> InverseCacheStats {
        InverseCacheStats {
            entries: self.cache.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Exhaustive search over `0..=2^width - 1`
fn search(expr: &Expr, target: i64, width: u8) -> Inversion {
    let max: u32 = (1u32 << width.min(16)) - 1;
    let mut matches: SmallVec<[u16; 4]> = SmallVec::new();
    let mut first_fault = None;
    let mut evaluated = false;

    for raw in 0..=max {
        match expr.eval(raw as i64) {
            Ok(value) => {
                evaluated = true;
                if value == target {
                    matches.push(raw as u16);
                }
            }
            Err(fault) => {
                first_fault.get_or_insert(fault);
            }
        }
    }

    match first_fault {
        Some(fault) if !evaluated => Inversion::Failed(fault),
        _ => Inversion::Found(Arc::from(matches.as_slice())),
    }
}
