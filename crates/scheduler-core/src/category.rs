//! Category Resolver (spec §4.6).
//!
//! Maps a category id to its `(bg_color, fg_color)` pair with a process-local
//! cache invalidated on any category write, grounded on the teacher's
//! `OnceLock<Mutex<HashMap<..>>>` validation caches in `recurrence.rs`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::Category;

const FALLBACK_FG: &str = "#FFFFFF";

/// Deterministic colour cache keyed by category id.
pub struct CategoryResolver {
    cache: RwLock<HashMap<i64, (String, String)>>,
}

impl CategoryResolver {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a resolver pre-populated from a Repository snapshot, used by
    /// the Resolver so one resolution pass never re-queries the category
    /// table per occurrence.
    pub fn from_map(categories: &HashMap<i64, Category>) -> Self {
        let resolver = Self::new();
        {
            let mut cache = resolver.cache.write().expect("category cache poisoned");
            for category in categories.values() {
                cache.insert(category.id, (category.bg_color.clone(), category.fg_color.clone()));
            }
        }
        resolver
    }

    /// Flushes the cache; callers re-warm it from the Repository on the next
    /// resolve. Invoked on any category write (spec §4.6).
    pub fn invalidate(&self) {
        self.cache.write().expect("category cache poisoned").clear();
    }

    pub fn warm(&self, category: &Category) {
        self.cache
            .write()
            .expect("category cache poisoned")
            .insert(category.id, (category.bg_color.clone(), category.fg_color.clone()));
    }

    /// Resolves `category_id` to its colour pair. A cache miss falls back to
    /// a deterministic colour derived from a hash of `title` (spec §4.3 step 5).
    pub fn resolve(&self, category_id: i64, title: &str) -> (String, String) {
        if let Some(pair) = self.cache.read().expect("category cache poisoned").get(&category_id) {
            return pair.clone();
        }
        (fallback_color(title), FALLBACK_FG.to_string())
    }
}

impl Default for CategoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// A stable `#RRGGBB` colour derived from `title`'s hash, used when a
/// category lookup misses (deleted category, stale reference, etc.).
fn fallback_color(title: &str) -> String {
    let mut hash: u32 = 2166136261;
    for byte in title.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    format!("#{:06X}", hash & 0x00FF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, bg: &str, fg: &str) -> Category {
        Category {
            id,
            name: format!("cat-{id}"),
            bg_color: bg.to_string(),
            fg_color: fg.to_string(),
            sort_order: id as i32,
            is_system: false,
        }
    }

    #[test]
    fn resolves_known_category() {
        let mut map = HashMap::new();
        map.insert(1, category(1, "#FF0000", "#FFFFFF"));
        let resolver = CategoryResolver::from_map(&map);
        assert_eq!(resolver.resolve(1, "whatever"), ("#FF0000".to_string(), "#FFFFFF".to_string()));
    }

    #[test]
    fn falls_back_to_deterministic_hash_color_on_miss() {
        let resolver = CategoryResolver::new();
        let a = resolver.resolve(999, "My Task");
        let b = resolver.resolve(999, "My Task");
        assert_eq!(a, b);
        assert_eq!(a.1, FALLBACK_FG);
    }

    #[test]
    fn invalidate_clears_cache() {
        let mut map = HashMap::new();
        map.insert(1, category(1, "#FF0000", "#FFFFFF"));
        let resolver = CategoryResolver::from_map(&map);
        resolver.invalidate();
        let (bg, _) = resolver.resolve(1, "Task Name");
        assert_ne!(bg, "#FF0000");
    }
}
