use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Serving styles a spirit can be rated in, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DrinkType {
    #[serde(rename = "Neat")]
    Neat,
    #[serde(rename = "On the Rocks")]
    OnTheRocks,
    #[serde(rename = "With Water")]
    WithWater,
    #[serde(rename = "With Coke")]
    WithCoke,
    #[serde(rename = "With Ginger Ale")]
    WithGingerAle,
    #[serde(rename = "Old Fashioned")]
    OldFashioned,
    #[serde(rename = "Whiskey Sour")]
    WhiskeySour,
}

impl DrinkType {
    pub const ALL: [DrinkType; 7] = [
        DrinkType::Neat,
        DrinkType::OnTheRocks,
        DrinkType::WithWater,
        DrinkType::WithCoke,
        DrinkType::WithGingerAle,
        DrinkType::OldFashioned,
        DrinkType::WhiskeySour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrinkType::Neat => "Neat",
            DrinkType::OnTheRocks => "On the Rocks",
            DrinkType::WithWater => "With Water",
            DrinkType::WithCoke => "With Coke",
            DrinkType::WithGingerAle => "With Ginger Ale",
            DrinkType::OldFashioned => "Old Fashioned",
            DrinkType::WhiskeySour => "Whiskey Sour",
        }
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(DrinkType::as_str).collect()
    }
}

impl fmt::Display for DrinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrinkType::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown drink type: {}", s))
    }
}

/// A cell of the ranking matrix. `NotAvailable` means no ranking row exists,
/// which is not the same thing as a stored score of 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingCell {
    Score(f64),
    NotAvailable,
}

impl RatingCell {
    pub const NOT_AVAILABLE: &'static str = "N/A";

    pub fn score(&self) -> Option<f64> {
        match self {
            RatingCell::Score(score) => Some(*score),
            RatingCell::NotAvailable => None,
        }
    }
}

impl Serialize for RatingCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RatingCell::Score(score) => serializer.serialize_f64(*score),
            RatingCell::NotAvailable => serializer.serialize_str(Self::NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Spirit {
    pub id: i64,
    pub name: String,
    pub distillery: Option<String>,
    pub proof: Option<f64>,
    pub age: Option<String>,
    pub description: Option<String>,
    pub spirit_type: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbSpirit {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub distillery: Option<String>,
    pub proof: Option<f64>,
    pub age: Option<String>,
    pub description: Option<String>,
    pub spirit_type: Option<String>,
}

impl From<DbSpirit> for Spirit {
    fn from(spirit: DbSpirit) -> Self {
        Self {
            id: spirit.id.unwrap_or_default(),
            name: spirit.name.unwrap_or_default(),
            distillery: spirit.distillery,
            proof: spirit.proof,
            age: spirit.age,
            description: spirit.description,
            spirit_type: spirit.spirit_type.unwrap_or_default(),
        }
    }
}

/// Fields accepted when cataloguing a new spirit.
#[derive(Debug, Clone, Default)]
pub struct NewSpirit {
    pub name: String,
    pub spirit_type: String,
    pub distillery: Option<String>,
    pub proof: Option<f64>,
    pub age: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Ranking {
    pub id: i64,
    pub spirit_id: i64,
    pub spirit_name: String,
    pub drink_type: String,
    pub score: f64,
    pub description: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbRanking {
    pub id: Option<i64>,
    pub spirit_id: Option<i64>,
    pub spirit_name: Option<String>,
    pub drink_type: Option<String>,
    pub score: Option<f64>,
    pub description: Option<String>,
}

impl From<DbRanking> for Ranking {
    fn from(ranking: DbRanking) -> Self {
        Self {
            id: ranking.id.unwrap_or_default(),
            spirit_id: ranking.spirit_id.unwrap_or_default(),
            spirit_name: ranking.spirit_name.unwrap_or_default(),
            drink_type: ranking.drink_type.unwrap_or_default(),
            score: ranking.score.unwrap_or_default(),
            description: ranking.description,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Review {
    pub id: i64,
    pub spirit_id: i64,
    pub spirit_name: String,
    pub review_text: String,
    pub rating: f64,
    pub drink_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbReview {
    pub id: Option<i64>,
    pub spirit_id: Option<i64>,
    pub spirit_name: Option<String>,
    pub review_text: Option<String>,
    pub rating: Option<f64>,
    pub drink_type: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbReview> for Review {
    fn from(db: DbReview) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            spirit_id: db.spirit_id.unwrap_or_default(),
            spirit_name: db.spirit_name.unwrap_or_default(),
            review_text: db.review_text.unwrap_or_default(),
            rating: db.rating.unwrap_or_default(),
            drink_type: db.drink_type.unwrap_or_default(),
            created_at: db
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            updated_at: db
                .updated_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Fields accepted when writing a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub spirit_name: String,
    pub spirit_type: String,
    pub drink_type: String,
    pub rating: f64,
    pub review_text: String,
}

/// One row of the spirit ⟕ ranking join behind the ranking matrix. The
/// ranking side is null when a spirit has no rankings at all.
#[derive(sqlx::FromRow, Clone, Debug, Default)]
pub struct DbRankingRow {
    pub spirit_id: Option<i64>,
    pub name: Option<String>,
    pub distillery: Option<String>,
    pub proof: Option<f64>,
    pub age: Option<String>,
    pub description: Option<String>,
    pub drink_type: Option<String>,
    pub score: Option<f64>,
}
