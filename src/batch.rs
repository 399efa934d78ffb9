//! Bulk ranking edits submitted as one flat form.
//!
//! Field names encode what they update. Two conventions are in use:
//!
//! | convention | score field              | description field      |
//! |------------|--------------------------|------------------------|
//! | `Prefixed` | `rating_{spirit}_{drink}`| `description_{spirit}` |
//! | `Plain`    | `{spirit}_{drink}`       | `{spirit}_description` |
//!
//! The spirit and drink type are split at the first underscore, so a spirit
//! whose name contains an underscore cannot be addressed correctly.
//!
//! Field names are taken literally from the urlencoded body. Rocket's form
//! parser would read `.` and `[` as nesting, which mangles names such as
//! `E.H. Taylor`.

use std::collections::BTreeMap;

use rocket::http::RawStr;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use crate::db::{find_spirit_by_name, upsert_ranking_for_spirit, update_spirit_description};
use crate::error::AppError;
use crate::validation::parse_score;

/// Fields carried alongside the data that only steer the redirect.
pub const CONTEXT_FIELDS: [&str; 3] = ["spirit_type", "sort_by", "sort_order"];

const RATING_PREFIX: &str = "rating_";
const DESCRIPTION_PREFIX: &str = "description_";
const DESCRIPTION_SUFFIX: &str = "description";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldConvention {
    Prefixed,
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchUpdate {
    Score {
        spirit_name: String,
        drink_type: String,
        score: f64,
    },
    Description {
        spirit_name: String,
        description: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub rankings_written: usize,
    pub descriptions_updated: usize,
    pub skipped: usize,
}

enum FieldKey<'a> {
    Score(&'a str, &'a str),
    Description(&'a str),
}

fn split_key(convention: FieldConvention, key: &str) -> Option<FieldKey<'_>> {
    match convention {
        FieldConvention::Prefixed => {
            if let Some(rest) = key.strip_prefix(RATING_PREFIX) {
                let (spirit, drink) = rest.split_once('_')?;
                Some(FieldKey::Score(spirit, drink))
            } else {
                key.strip_prefix(DESCRIPTION_PREFIX)
                    .map(FieldKey::Description)
            }
        }
        FieldConvention::Plain => {
            let (spirit, rest) = key.split_once('_')?;
            if rest == DESCRIPTION_SUFFIX {
                Some(FieldKey::Description(spirit))
            } else {
                Some(FieldKey::Score(spirit, rest))
            }
        }
    }
}

/// Splits an `application/x-www-form-urlencoded` body into literal
/// name/value pairs. A repeated name keeps its last value.
pub fn fields_from_urlencoded(body: &str) -> BTreeMap<String, String> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                RawStr::new(name).url_decode_lossy().into_owned(),
                RawStr::new(value).url_decode_lossy().into_owned(),
            )
        })
        .collect()
}

/// Decodes submitted fields into updates. Blank values and fields outside
/// the convention are dropped; every score must parse or the whole batch is
/// rejected before anything is written.
pub fn parse_fields(
    convention: FieldConvention,
    fields: &BTreeMap<String, String>,
) -> Result<(Vec<BatchUpdate>, usize), AppError> {
    let mut updates = Vec::new();
    let mut skipped = 0;

    for (key, value) in fields {
        if CONTEXT_FIELDS.contains(&key.as_str()) {
            continue;
        }

        let Some(field_key) = split_key(convention, key) else {
            debug!(field = %key, "Ignoring field outside the naming convention");
            continue;
        };

        let value = value.trim();
        if value.is_empty() {
            skipped += 1;
            continue;
        }

        match field_key {
            FieldKey::Score(spirit_name, drink_type) if !spirit_name.is_empty() => {
                updates.push(BatchUpdate::Score {
                    spirit_name: spirit_name.to_string(),
                    drink_type: drink_type.to_string(),
                    score: parse_score(key, value)?,
                });
            }
            FieldKey::Description(spirit_name) if !spirit_name.is_empty() => {
                updates.push(BatchUpdate::Description {
                    spirit_name: spirit_name.to_string(),
                    description: value.to_string(),
                });
            }
            _ => skipped += 1,
        }
    }

    Ok((updates, skipped))
}

/// Applies a batch in one transaction. A score for an unknown spirit aborts
/// the batch; a description for an unknown spirit is skipped.
#[instrument(skip(pool, fields), fields(field_count = fields.len()))]
pub async fn save_batch(
    pool: &Pool<Sqlite>,
    convention: FieldConvention,
    fields: &BTreeMap<String, String>,
) -> Result<BatchSummary, AppError> {
    info!(?convention, "Saving ranking batch");
    let (updates, skipped) = parse_fields(convention, fields)?;

    let mut summary = BatchSummary {
        skipped,
        ..BatchSummary::default()
    };

    let mut tx = pool.begin().await?;

    for update in updates {
        match update {
            BatchUpdate::Score {
                spirit_name,
                drink_type,
                score,
            } => {
                let spirit = find_spirit_by_name(&mut *tx, &spirit_name)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Spirit '{}' not found", spirit_name))
                    })?;
                upsert_ranking_for_spirit(&mut tx, spirit.id, &drink_type, score).await?;
                summary.rankings_written += 1;
            }
            BatchUpdate::Description {
                spirit_name,
                description,
            } => match find_spirit_by_name(&mut *tx, &spirit_name).await? {
                Some(spirit) => {
                    update_spirit_description(&mut *tx, spirit.id, &description).await?;
                    summary.descriptions_updated += 1;
                }
                None => {
                    debug!(spirit = %spirit_name, "Skipping description for unknown spirit");
                    summary.skipped += 1;
                }
            },
        }
    }

    tx.commit().await?;

    info!(
        rankings_written = summary.rankings_written,
        descriptions_updated = summary.descriptions_updated,
        skipped = summary.skipped,
        "Ranking batch saved"
    );
    Ok(summary)
}
