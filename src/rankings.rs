//! The ranking matrix: every spirit of a type against every serving style.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use crate::db::{get_ranking_rows, list_spirit_types};
use crate::error::AppError;
use crate::models::{DbRankingRow, DrinkType, RatingCell};
use crate::validation::blank_to_none;

pub const DEFAULT_SPIRIT_TYPE: &str = "Bourbon";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    SpiritName,
    DrinkType(DrinkType),
}

impl SortKey {
    pub const SPIRIT_NAME: &'static str = "spirit_name";

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::SpiritName => Self::SPIRIT_NAME,
            SortKey::DrinkType(drink_type) => drink_type.as_str(),
        }
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::SPIRIT_NAME {
            return Ok(SortKey::SpiritName);
        }

        s.parse::<DrinkType>().map(SortKey::DrinkType).map_err(|_| {
            AppError::Validation(format!(
                "Cannot sort by '{}'; expected {} or one of: {}",
                s,
                Self::SPIRIT_NAME,
                DrinkType::labels().join(", ")
            ))
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SortKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::Validation(format!(
                "Sort order must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingQuery {
    pub spirit_type: String,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl Default for RankingQuery {
    fn default() -> Self {
        Self {
            spirit_type: DEFAULT_SPIRIT_TYPE.to_string(),
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl RankingQuery {
    /// Builds a query from raw request parameters. Absent or blank values
    /// fall back to their defaults; unknown sort keys and orders are rejected.
    pub fn from_params(
        spirit_type: Option<&str>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        default_spirit_type: &str,
    ) -> Result<Self, AppError> {
        Ok(Self {
            spirit_type: blank_to_none(spirit_type)
                .unwrap_or(default_spirit_type)
                .to_string(),
            sort_by: blank_to_none(sort_by)
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
            sort_order: blank_to_none(sort_order)
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiritRankings {
    #[serde(skip)]
    pub spirit_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub distillery: Option<String>,
    pub proof: Option<f64>,
    pub age: Option<String>,
    pub ratings: BTreeMap<DrinkType, RatingCell>,
}

impl SpiritRankings {
    pub fn rating(&self, drink_type: DrinkType) -> RatingCell {
        self.ratings
            .get(&drink_type)
            .copied()
            .unwrap_or(RatingCell::NotAvailable)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingMatrix {
    pub query: RankingQuery,
    pub spirit_types: Vec<String>,
    pub drink_types: Vec<&'static str>,
    pub spirits: Vec<SpiritRankings>,
}

#[cfg(test)]
impl RankingMatrix {
    pub fn get(&self, name: &str) -> Option<&SpiritRankings> {
        self.spirits.iter().find(|s| s.name == name)
    }
}

/// Folds joined spirit/ranking rows into one entry per spirit, in the order
/// spirits first appear, with every drink type present in `ratings`.
pub fn fold_rows(rows: Vec<DbRankingRow>) -> Vec<SpiritRankings> {
    let mut entries: Vec<SpiritRankings> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let spirit_id = row.spirit_id.unwrap_or_default();
        let position = *index.entry(spirit_id).or_insert_with(|| {
            entries.push(SpiritRankings {
                spirit_id,
                name: row.name.clone().unwrap_or_default(),
                description: row.description.clone(),
                distillery: row.distillery.clone(),
                proof: row.proof,
                age: row.age.clone(),
                ratings: BTreeMap::new(),
            });
            entries.len() - 1
        });

        if let (Some(drink_type), Some(score)) = (row.drink_type.as_deref(), row.score) {
            // Rows arrive oldest first; the oldest is the one upserts edit.
            match drink_type.parse::<DrinkType>() {
                Ok(drink_type) => {
                    entries[position]
                        .ratings
                        .entry(drink_type)
                        .or_insert(RatingCell::Score(score));
                }
                Err(_) => debug!(drink_type, spirit_id, "Ignoring ranking outside the matrix"),
            }
        }
    }

    for entry in &mut entries {
        for drink_type in DrinkType::ALL {
            entry
                .ratings
                .entry(drink_type)
                .or_insert(RatingCell::NotAvailable);
        }
    }

    entries
}

/// Orders matrix entries. Ties, and spirits sharing a score, fall back to
/// name then insertion order. For drink-type keys, spirits without a score
/// for that style rank below every scored spirit.
pub fn sort_entries(entries: &mut [SpiritRankings], sort_by: SortKey, sort_order: SortOrder) {
    let by_name = |a: &SpiritRankings, b: &SpiritRankings| {
        a.name.cmp(&b.name).then(a.spirit_id.cmp(&b.spirit_id))
    };

    match sort_by {
        SortKey::SpiritName => entries.sort_by(|a, b| match sort_order {
            SortOrder::Asc => by_name(a, b),
            SortOrder::Desc => by_name(b, a),
        }),
        SortKey::DrinkType(drink_type) => entries.sort_by(|a, b| {
            let primary = compare_cells(a.rating(drink_type), b.rating(drink_type));
            let primary = match sort_order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then_with(|| by_name(a, b))
        }),
    }
}

fn compare_cells(a: RatingCell, b: RatingCell) -> Ordering {
    match (a.score(), b.score()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[instrument(skip(pool))]
pub async fn aggregate_rankings(
    pool: &Pool<Sqlite>,
    query: RankingQuery,
) -> Result<RankingMatrix, AppError> {
    info!("Aggregating rankings");
    let rows = get_ranking_rows(pool, &query.spirit_type).await?;

    let mut spirits = fold_rows(rows);
    sort_entries(&mut spirits, query.sort_by, query.sort_order);

    let spirit_types = list_spirit_types(pool).await?;

    Ok(RankingMatrix {
        query,
        spirit_types,
        drink_types: DrinkType::labels(),
        spirits,
    })
}
