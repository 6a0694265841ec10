//! Slug normalization and collision-free resolution.

use async_trait::async_trait;

use crate::errors::AppError;

/// Storage capability the resolver needs: "is this slug already taken?".
#[async_trait]
pub trait SlugLookup: Send + Sync {
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;
}

/// Convert free text to a URL-friendly slug.
///
/// Letters and digits are lowercased and kept; every other run of
/// characters collapses into a single `-`.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Strip surrounding whitespace and path separators from a candidate slug.
pub fn normalize(candidate: &str) -> Result<String, AppError> {
    let slug = candidate.trim().trim_matches('/');
    if slug.is_empty() {
        return Err(AppError::Validation(
            "Slug cannot be empty or root".to_string(),
        ));
    }
    Ok(slug.to_string())
}

/// Resolve `candidate` to a slug no other entity uses.
///
/// A free candidate is returned unchanged; otherwise `-1`, `-2`, ... are
/// tried in order until one is free. There is no upper bound on the suffix.
pub async fn resolve<L>(candidate: &str, lookup: &L) -> Result<String, AppError>
where
    L: SlugLookup + ?Sized,
{
    let slug = normalize(candidate)?;
    if !lookup.slug_exists(&slug).await? {
        return Ok(slug);
    }

    let mut suffix: u64 = 1;
    loop {
        let next = format!("{}-{}", slug, suffix);
        if !lookup.slug_exists(&next).await? {
            tracing::debug!("Slug {:?} taken, resolved to {:?}", slug, next);
            return Ok(next);
        }
        suffix += 1;
    }
}

/// Resolve a slug for an entity that already persisted `previous`.
///
/// Keeping the same slug never collides with the entity itself, so the
/// lookup is skipped entirely in that case.
pub async fn resolve_for_update<L>(
    candidate: &str,
    previous: &str,
    lookup: &L,
) -> Result<String, AppError>
where
    L: SlugLookup + ?Sized,
{
    let slug = normalize(candidate)?;
    if slug == previous {
        return Ok(slug);
    }
    resolve(&slug, lookup).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Taken {
        slugs: HashSet<String>,
        calls: AtomicUsize,
    }

    impl Taken {
        fn new(slugs: &[&str]) -> Self {
            Self {
                slugs: slugs.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SlugLookup for Taken {
        async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.slugs.contains(slug))
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust -- and   Go!  "), "rust-and-go");
        assert_eq!(slugify("Café Menu"), "café-menu");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_normalize_trims_separators() {
        assert_eq!(normalize("/about/").unwrap(), "about");
        assert_eq!(normalize("//a/b//").unwrap(), "a/b");
        assert!(matches!(normalize("/"), Err(AppError::Validation(_))));
        assert!(matches!(normalize("  "), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_free_candidate_is_unchanged() {
        let lookup = Taken::new(&["other"]);
        assert_eq!(resolve("welcome", &lookup).await.unwrap(), "welcome");
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_collisions_take_next_free_suffix() {
        for n in 1..6 {
            let mut taken = vec!["slug".to_string()];
            taken.extend((1..n).map(|i| format!("slug-{}", i)));
            let refs: Vec<&str> = taken.iter().map(String::as_str).collect();
            let lookup = Taken::new(&refs);

            let resolved = resolve("slug", &lookup).await.unwrap();
            assert_eq!(resolved, format!("slug-{}", n));
        }
    }

    #[tokio::test]
    async fn test_unchanged_slug_skips_lookup() {
        let lookup = Taken::new(&["welcome"]);
        let resolved = resolve_for_update("/welcome/", "welcome", &lookup)
            .await
            .unwrap();
        assert_eq!(resolved, "welcome");
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_changed_slug_is_resolved() {
        let lookup = Taken::new(&["taken"]);
        let resolved = resolve_for_update("taken", "mine", &lookup).await.unwrap();
        assert_eq!(resolved, "taken-1");
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_slug_fails_before_lookup() {
        let lookup = Taken::new(&[]);
        let err = resolve("///", &lookup).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(lookup.calls(), 0);
    }
}
