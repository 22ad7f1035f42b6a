//! Slug derivation and per-tenant slug allocation
//!
//! ```rust
//! use catalog_core::hierarchy::slug::slugify;
//!
//! assert_eq!(slugify("Crème Brûlée & Co."), "creme-brulee-co");
//! assert_eq!(slugify("  --Hot  Drinks--  "), "hot-drinks");
//! ```

use crate::db::{StoreResult, TreeStore};
use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Base used when a name slugifies to nothing (e.g. only punctuation)
pub const FALLBACK_SLUG: &str = "category";

/// Lowercase alphanumeric runs joined by single hyphens
const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";

/// Derive a URL-safe candidate slug from a display name.
///
/// Lowercases, strips diacritics (folding stroked letters and ligatures such
/// as `đ`, `ø`, `ß` to ASCII), collapses every run of non-alphanumeric
/// characters into one hyphen and trims hyphens at both ends. May return an
/// empty string; callers substitute [`FALLBACK_SLUG`].
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        match fold_letter(c) {
            Some(folded) => {
                for f in folded.chars() {
                    push_slug_char(&mut slug, &mut pending_hyphen, f);
                }
            }
            None => push_slug_char(&mut slug, &mut pending_hyphen, c),
        }
    }

    slug
}

/// ASCII spelling of Latin letters that have no decomposition (stroke, ligature)
fn fold_letter(c: char) -> Option<&'static str> {
    let folded = match c {
        'đ' | 'Đ' | 'ð' | 'Ð' => "d",
        'ł' | 'Ł' => "l",
        'ø' | 'Ø' => "o",
        'ß' | 'ẞ' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ħ' | 'Ħ' => "h",
        'þ' | 'Þ' => "th",
        'ı' => "i",
        _ => return None,
    };
    Some(folded)
}

fn push_slug_char(slug: &mut String, pending_hyphen: &mut bool, c: char) {
    if c.is_ascii_alphanumeric() {
        if *pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        *pending_hyphen = false;
        slug.push(c.to_ascii_lowercase());
    } else {
        *pending_hyphen = true;
    }
}

/// Whether `slug` already has the shape [`slugify`] produces
pub fn is_valid_slug(slug: &str) -> bool {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let slug_regex = SLUG_REGEX.get_or_init(|| Regex::new(SLUG_PATTERN).unwrap());
    slug_regex.is_match(slug)
}

/// Hands out slugs that are unique within a tenant.
///
/// Allocation only reads the store; the caller persists the record. Two
/// writers can still race between lookup and write, which the store's unique
/// index reports as a conflict.
pub struct SlugAllocator<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> SlugAllocator<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    /// Return `candidate` if free, otherwise the first free `candidate-N` (N = 2, 3, ...).
    ///
    /// `candidate` is normalized with [`slugify`] first. `exclude_id` ignores
    /// the record being renamed so it can keep its own slug.
    pub async fn ensure_unique(
        &self,
        tenant_id: &str,
        candidate: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<String> {
        let mut base = slugify(candidate);
        if base.is_empty() {
            base = FALLBACK_SLUG.to_string();
        }

        if !self.store.slug_exists(tenant_id, &base, exclude_id).await? {
            return Ok(base);
        }

        let mut suffix = 2u64;
        loop {
            let attempt = format!("{}-{}", base, suffix);
            if !self.store.slug_exists(tenant_id, &attempt, exclude_id).await? {
                tracing::debug!(tenant_id, base = %base, slug = %attempt, "Slug collision resolved");
                return Ok(attempt);
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Category, TreeInfo};

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Foo"), "foo");
        assert_eq!(slugify("Hot Drinks"), "hot-drinks");
        assert_eq!(slugify("Fish & Chips!!"), "fish-chips");
        assert_eq!(slugify("Ünïcödé Café"), "unicode-cafe");
        assert_eq!(slugify("2024 Specials"), "2024-specials");
    }

    #[test]
    fn test_slugify_folds_undecomposable_letters() {
        assert_eq!(slugify("Đồ uống"), "do-uong");
        assert_eq!(slugify("Łódź"), "lodz");
        assert_eq!(slugify("Øl & Smørrebrød"), "ol-smorrebrod");
        assert_eq!(slugify("Straße"), "strasse");
        assert_eq!(slugify("Æble Œuvre"), "aeble-oeuvre");
        assert_eq!(slugify("Ħobż"), "hobz");
    }

    #[test]
    fn test_slugify_empty_and_symbols() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("-a-"), "a");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("foo"));
        assert!(is_valid_slug("foo-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Foo"));
        assert!(!is_valid_slug("foo--bar"));
        assert!(!is_valid_slug("-foo"));
        assert!(!is_valid_slug("foo/bar"));
    }

    #[tokio::test]
    async fn test_ensure_unique_appends_counter() {
        let store = MemoryStore::new();
        let allocator = SlugAllocator::new(&store);

        let first = allocator.ensure_unique("t1", "Foo", None).await.unwrap();
        assert_eq!(first, "foo");
        store
            .create(Category::new("t1", "Foo", first, TreeInfo::root()))
            .await
            .unwrap();

        let second = allocator.ensure_unique("t1", "Foo", None).await.unwrap();
        assert_eq!(second, "foo-2");
        store
            .create(Category::new("t1", "Foo", second, TreeInfo::root()))
            .await
            .unwrap();

        assert_eq!(
            allocator.ensure_unique("t1", "foo", None).await.unwrap(),
            "foo-3"
        );
        // Other tenants are unaffected
        assert_eq!(
            allocator.ensure_unique("t2", "foo", None).await.unwrap(),
            "foo"
        );
    }

    #[tokio::test]
    async fn test_ensure_unique_excludes_self_and_falls_back() {
        let store = MemoryStore::new();
        let existing = store
            .create(Category::new("t1", "Foo", "foo", TreeInfo::root()))
            .await
            .unwrap();
        let allocator = SlugAllocator::new(&store);

        let kept = allocator
            .ensure_unique("t1", "Foo", Some(&existing.id))
            .await
            .unwrap();
        assert_eq!(kept, "foo");

        let fallback = allocator.ensure_unique("t1", "???", None).await.unwrap();
        assert_eq!(fallback, FALLBACK_SLUG);
    }
}
