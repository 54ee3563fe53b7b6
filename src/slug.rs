//! Slug derivation and collision-free slug assignment.
//!
//! Slugs are assigned once, when a row is created. Uniqueness is owned by the
//! database: every slugged table carries a unique index on its slug column, the
//! service picks the next free candidate (`base`, `base-1`, `base-2`, ...) with a
//! single query and retries when a concurrent writer claimed it first.

use std::collections::HashSet;

use metrics::counter;
use sea_orm::{
    sea_query::Condition, ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait,
    DbErr, EntityTrait, IntoActiveModel, QueryFilter, QuerySelect, SqlErr,
};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Maximum length of a stored slug.
pub const MAX_SLUG_LENGTH: usize = 200;

/// Base length kept when a numeric suffix is appended.
const SUFFIXED_BASE_LENGTH: usize = 190;

const MAX_INSERT_ATTEMPTS: usize = 5;

/// Converts free text into a URL-safe slug.
///
/// Accented Latin letters are folded to ASCII, everything is lower-cased,
/// characters other than letters, digits, underscores, hyphens and whitespace
/// are dropped, runs of hyphens/whitespace collapse to one hyphen and leading or
/// trailing hyphens and underscores are stripped.
pub fn slugify(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for ch in value.chars() {
        push_ascii_folded(ch, &mut folded);
    }

    let mut slug = String::with_capacity(folded.len());
    let mut separator_pending = false;
    for ch in folded.chars().map(|c| c.to_ascii_lowercase()) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if separator_pending {
                slug.push('-');
                separator_pending = false;
            }
            slug.push(ch);
        } else if ch == '-' || matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c') {
            separator_pending = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Slugifies `value`, falling back to `fallback` when nothing slug-worthy remains.
pub fn slug_base(value: &str, fallback: &str) -> String {
    let slug = slugify(value);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

fn push_ascii_folded(ch: char, out: &mut String) {
    if ch.is_ascii() {
        out.push(ch);
        return;
    }

    let folded = match ch {
        'À'..='Å' | 'à'..='å' | 'Ā' | 'ā' | 'Ă' | 'ă' | 'Ą' | 'ą' => "a",
        'Ç' | 'ç' | 'Ć' | 'ć' | 'Č' | 'č' => "c",
        'Ď' | 'ď' => "d",
        'È'..='Ë' | 'è'..='ë' | 'Ē' | 'ē' | 'Ę' | 'ę' | 'Ě' | 'ě' => "e",
        'Ğ' | 'ğ' => "g",
        'Ì'..='Ï' | 'ì'..='ï' | 'Ī' | 'ī' | 'İ' => "i",
        'Ñ' | 'ñ' | 'Ń' | 'ń' | 'Ň' | 'ň' => "n",
        'Ò'..='Ö' | 'ò'..='ö' | 'Ō' | 'ō' | 'Ő' | 'ő' => "o",
        'Ř' | 'ř' => "r",
        'Ś' | 'ś' | 'Ş' | 'ş' | 'Š' | 'š' => "s",
        'Ť' | 'ť' | 'Ţ' | 'ţ' => "t",
        'Ù'..='Ü' | 'ù'..='ü' | 'Ū' | 'ū' | 'Ů' | 'ů' | 'Ű' | 'ű' => "u",
        'Ý' | 'ý' | 'ÿ' => "y",
        'Ź' | 'ź' | 'Ż' | 'ż' | 'Ž' | 'ž' => "z",
        _ => "",
    };
    out.push_str(folded);
}

fn truncate(slug: &str, max: usize) -> String {
    let truncated: String = slug.chars().take(max).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Picks the first candidate for `base` that is not in `taken`.
pub fn first_free_candidate(base: &str, taken: &[String]) -> String {
    let root = truncate(base, MAX_SLUG_LENGTH);
    let taken: HashSet<&str> = taken.iter().map(String::as_str).collect();
    if !taken.contains(root.as_str()) {
        return root;
    }

    let stem = truncate(base, SUFFIXED_BASE_LENGTH);
    let mut counter = 1usize;
    loop {
        let candidate = format!("{stem}-{counter}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Loads every existing slug that could collide with `base` and returns the first free one.
pub async fn next_available_slug<E, C>(
    db: &C,
    column: E::Column,
    base: &str,
) -> Result<String, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let root = truncate(base, MAX_SLUG_LENGTH);
    let stem = truncate(base, SUFFIXED_BASE_LENGTH);

    let taken: Vec<String> = E::find()
        .select_only()
        .column(column)
        .filter(
            Condition::any()
                .add(column.eq(root))
                .add(column.starts_with(format!("{stem}-"))),
        )
        .into_tuple()
        .all(db)
        .await?;

    Ok(first_free_candidate(base, &taken))
}

/// Inserts the active model produced by `build`, handing it a free slug.
///
/// When the insert loses a race on the slug unique index the next candidate is
/// computed and the insert retried, up to a fixed number of attempts.
pub async fn insert_with_unique_slug<A, C, F>(
    db: &C,
    column: <A::Entity as EntityTrait>::Column,
    base: &str,
    build: F,
) -> Result<<A::Entity as EntityTrait>::Model, ServiceError>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
    F: Fn(String) -> A + Send,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let slug = next_available_slug::<A::Entity, C>(db, column, base).await?;
        debug!(slug = %slug, attempt, "Assigning slug");

        match build(slug.clone()).insert(db).await {
            Ok(model) => return Ok(model),
            Err(err) if attempt < MAX_INSERT_ATTEMPTS && is_slug_conflict(&err) => {
                warn!(slug = %slug, attempt, "Slug claimed concurrently, retrying");
                counter!("backoffice.slug.conflict_retries", 1);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// True when the error is a unique violation on a slug column.
pub fn is_slug_conflict(err: &DbErr) -> bool {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => message.contains("slug"),
        _ => false,
    }
}

/// True for any unique constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Central", "central")]
    #[case("  Main   Warehouse ", "main-warehouse")]
    #[case("Widget — WID-1", "widget-wid-1")]
    #[case("Crème Brûlée", "creme-brulee")]
    #[case("jane.doe@example.com-Paris-a1b2c3", "janedoeexamplecom-paris-a1b2c3")]
    #[case("--Hello__World--", "hello__world")]
    #[case("a - . - b", "a-b")]
    #[case("snake_case name", "snake_case-name")]
    #[case("!!!", "")]
    fn slugify_matches_expected(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn slug_base_uses_fallback_for_empty_input() {
        assert_eq!(slug_base("???", "warehouse"), "warehouse");
        assert_eq!(slug_base("East Hub", "warehouse"), "east-hub");
    }

    #[test]
    fn first_candidate_is_base_when_free() {
        assert_eq!(first_free_candidate("central", &[]), "central");
    }

    #[test]
    fn collisions_append_increasing_counter() {
        let taken = vec!["central".to_string()];
        assert_eq!(first_free_candidate("central", &taken), "central-1");

        let taken = vec![
            "central".to_string(),
            "central-1".to_string(),
            "central-2".to_string(),
        ];
        assert_eq!(first_free_candidate("central", &taken), "central-3");
    }

    #[test]
    fn gaps_in_suffixes_are_reused() {
        let taken = vec!["central".to_string(), "central-2".to_string()];
        assert_eq!(first_free_candidate("central", &taken), "central-1");
    }

    #[test]
    fn unrelated_prefix_matches_do_not_block_base() {
        let taken = vec!["central-park".to_string()];
        assert_eq!(first_free_candidate("central", &taken), "central");
    }

    #[test]
    fn long_bases_are_truncated() {
        let base = "x".repeat(250);
        let first = first_free_candidate(&base, &[]);
        assert_eq!(first.len(), MAX_SLUG_LENGTH);

        let second = first_free_candidate(&base, &[first]);
        assert_eq!(second, format!("{}-1", "x".repeat(SUFFIXED_BASE_LENGTH)));
    }
}
