//! Content slugs: derivation from titles, validation of supplied slugs and
//! site-scoped uniqueness probing.
//!
//! Titles are transliterated first (`pinyin` for CJK input) and then passed
//! through `slug::slugify`, so "家常红烧肉" becomes `jia-chang-hong-shao-rou`.

use std::future::Future;

use pinyin::ToPinyin;
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;
pub const MAX_SLUG_LEN: usize = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` must be lowercase ascii words joined by single hyphens")]
    Malformed { slug: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(transliterate(input));
    if candidate.len() > MAX_SLUG_LEN {
        candidate.truncate(MAX_SLUG_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }
    Ok(candidate)
}

/// Accept a caller-supplied slug only if it is already in canonical form.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    let canonical = slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");
    if canonical {
        Ok(())
    } else {
        Err(SlugError::Malformed {
            slug: slug.to_string(),
        })
    }
}

/// Probe `base`, then `base-2`, `base-3`, ... until `is_free` accepts one.
pub async fn unique_slug<F, Fut, E>(base: &str, mut is_free: F) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    if is_free(base.to_string())
        .await
        .map_err(SlugAsyncError::Predicate)?
    {
        return Ok(base.to_string());
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_free(candidate.clone())
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted {
        base: base.to_string(),
    }))
}

fn transliterate(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }
        match ch.to_pinyin() {
            Some(py) => {
                if !output.is_empty() && !output.ends_with(' ') {
                    output.push(' ');
                }
                output.push_str(py.plain());
            }
            None if ch.is_whitespace() => output.push(' '),
            None => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn derives_from_mixed_titles() {
        assert_eq!(derive_slug("Sourdough Bread!").unwrap(), "sourdough-bread");
        assert_eq!(derive_slug("家常 Noodles").unwrap(), "jia-chang-noodles");
    }

    #[test]
    fn rejects_blank_titles() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn long_titles_are_truncated_without_trailing_hyphen() {
        let title = "word ".repeat(60);
        let slug = derive_slug(&title).unwrap();
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn validate_accepts_only_canonical_slugs() {
        assert!(validate_slug("pan-fried-tofu-2").is_ok());
        for bad in ["", "Pan-Fried", "-tofu", "tofu-", "pan--fried", "pan fried"] {
            assert!(validate_slug(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn unique_slug_appends_counter() {
        let taken = ["stew".to_string(), "stew-2".to_string()];
        let slug = unique_slug("stew", |candidate| {
            let free = !taken.contains(&candidate);
            async move { Ok::<bool, Infallible>(free) }
        })
        .await
        .expect("unique slug");
        assert_eq!(slug, "stew-3");
    }

    #[tokio::test]
    async fn unique_slug_gives_up_eventually() {
        let err = unique_slug("stew", |_| async { Ok::<bool, Infallible>(false) })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SlugAsyncError::Slug(SlugError::Exhausted { .. })
        ));
    }
}
