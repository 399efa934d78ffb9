use chrono::Utc;
use sqlx::{Executor, Pool, Sqlite, SqliteConnection};
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::models::{
    DbRanking, DbRankingRow, DbReview, DbSpirit, NewReview, NewSpirit, Ranking, Review, Spirit,
};

/// Distillery recorded for spirits created implicitly by a review.
pub const PLACEHOLDER_DISTILLERY: &str = "Unknown";

const SPIRIT_COLUMNS: &str = "id, name, distillery, proof, age, description, spirit_type";

const RANKING_SELECT: &str = "SELECT r.id, r.spirit_id, s.name AS spirit_name, r.drink_type, r.score, r.description
     FROM rankings r
     JOIN spirits s ON s.id = r.spirit_id";

const REVIEW_SELECT: &str = "SELECT rv.id, rv.spirit_id, s.name AS spirit_name, rv.review_text, rv.rating,
            rv.drink_type, rv.created_at, rv.updated_at
     FROM reviews rv
     JOIN spirits s ON s.id = rv.spirit_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(i64),
    AlreadyExists(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(i64),
    Updated(i64),
}

#[cfg(test)]
impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedSpirit {
    pub id: i64,
    pub rankings_removed: u64,
    pub reviews_removed: u64,
}

#[instrument(skip(executor))]
pub async fn find_spirit_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Spirit>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!("Looking up spirit by name");
    let row = sqlx::query_as::<_, DbSpirit>(&format!(
        "SELECT {} FROM spirits WHERE name = ?",
        SPIRIT_COLUMNS
    ))
    .bind(name)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Spirit::from))
}

/// Like [`find_spirit_by_name`] but a missing spirit is an error.
pub async fn require_spirit<'e, E>(executor: E, name: &str) -> Result<Spirit, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_spirit_by_name(executor, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Spirit '{}' not found", name)))
}

#[instrument]
pub async fn list_spirits(
    pool: &Pool<Sqlite>,
    spirit_type: Option<&str>,
) -> Result<Vec<Spirit>, AppError> {
    info!("Listing spirits");
    let rows = match spirit_type {
        Some(spirit_type) => {
            sqlx::query_as::<_, DbSpirit>(&format!(
                "SELECT {} FROM spirits WHERE spirit_type = ? ORDER BY name",
                SPIRIT_COLUMNS
            ))
            .bind(spirit_type)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbSpirit>(&format!(
                "SELECT {} FROM spirits ORDER BY name",
                SPIRIT_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.into_iter().map(Spirit::from).collect())
}

#[instrument]
pub async fn list_spirit_types(pool: &Pool<Sqlite>) -> Result<Vec<String>, AppError> {
    info!("Listing spirit types");
    let types = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT spirit_type FROM spirits ORDER BY spirit_type",
    )
    .fetch_all(pool)
    .await?;

    Ok(types)
}

async fn insert_spirit<'e, E>(executor: E, spirit: &NewSpirit) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "INSERT INTO spirits (name, distillery, proof, age, description, spirit_type)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&spirit.name)
    .bind(&spirit.distillery)
    .bind(spirit.proof)
    .bind(&spirit.age)
    .bind(&spirit.description)
    .bind(&spirit.spirit_type)
    .execute(executor)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Catalogues a spirit unless one with the same name already exists.
#[instrument(skip(pool))]
pub async fn create_spirit(pool: &Pool<Sqlite>, spirit: &NewSpirit) -> Result<CreateOutcome, AppError> {
    info!(name = %spirit.name, spirit_type = %spirit.spirit_type, "Creating spirit");
    let mut tx = pool.begin().await?;

    if let Some(existing) = find_spirit_by_name(&mut *tx, &spirit.name).await? {
        tx.rollback().await?;
        return Ok(CreateOutcome::AlreadyExists(existing.id));
    }

    let id = insert_spirit(&mut *tx, spirit).await?;
    tx.commit().await?;

    Ok(CreateOutcome::Created(id))
}

/// Resolves a spirit by name, creating it with placeholder details when it
/// has not been catalogued yet.
#[instrument(skip(conn))]
pub async fn find_or_create_spirit(
    conn: &mut SqliteConnection,
    name: &str,
    spirit_type: &str,
) -> Result<CreateOutcome, AppError> {
    if let Some(existing) = find_spirit_by_name(&mut *conn, name).await? {
        return Ok(CreateOutcome::AlreadyExists(existing.id));
    }

    info!("Creating placeholder spirit");
    let placeholder = NewSpirit {
        name: name.to_string(),
        spirit_type: spirit_type.to_string(),
        distillery: Some(PLACEHOLDER_DISTILLERY.to_string()),
        ..NewSpirit::default()
    };
    let id = insert_spirit(&mut *conn, &placeholder).await?;

    Ok(CreateOutcome::Created(id))
}

#[instrument(skip(executor, description))]
pub async fn update_spirit_description<'e, E>(
    executor: E,
    spirit_id: i64,
    description: &str,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    info!("Updating spirit description");
    sqlx::query("UPDATE spirits SET description = ? WHERE id = ?")
        .bind(description)
        .bind(spirit_id)
        .execute(executor)
        .await?;

    Ok(())
}

#[instrument(skip(executor))]
pub async fn find_ranking<'e, E>(
    executor: E,
    spirit_id: i64,
    drink_type: &str,
) -> Result<Option<Ranking>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, DbRanking>(&format!(
        "{} WHERE r.spirit_id = ? AND r.drink_type = ? ORDER BY r.id LIMIT 1",
        RANKING_SELECT
    ))
    .bind(spirit_id)
    .bind(drink_type)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Ranking::from))
}

#[instrument]
pub async fn get_ranking(
    pool: &Pool<Sqlite>,
    spirit_name: &str,
    drink_type: &str,
) -> Result<Ranking, AppError> {
    info!("Getting ranking");
    let spirit = require_spirit(pool, spirit_name).await?;

    find_ranking(pool, spirit.id, drink_type)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No '{}' ranking for spirit '{}'",
                drink_type, spirit_name
            ))
        })
}

#[instrument]
pub async fn list_rankings_for_spirit(
    pool: &Pool<Sqlite>,
    spirit_id: i64,
) -> Result<Vec<Ranking>, AppError> {
    let rows = sqlx::query_as::<_, DbRanking>(&format!(
        "{} WHERE r.spirit_id = ? ORDER BY r.id",
        RANKING_SELECT
    ))
    .bind(spirit_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Ranking::from).collect())
}

/// Writes the score for (spirit, drink type), keeping a single row per pair.
#[instrument(skip(conn))]
pub async fn upsert_ranking_for_spirit(
    conn: &mut SqliteConnection,
    spirit_id: i64,
    drink_type: &str,
    score: f64,
) -> Result<UpsertOutcome, AppError> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM rankings WHERE spirit_id = ? AND drink_type = ? ORDER BY id LIMIT 1",
    )
    .bind(spirit_id)
    .bind(drink_type)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            debug!(ranking_id = id, "Updating existing ranking");
            sqlx::query("UPDATE rankings SET score = ? WHERE id = ?")
                .bind(score)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            Ok(UpsertOutcome::Updated(id))
        }
        None => {
            debug!("Inserting new ranking");
            let res = sqlx::query(
                "INSERT INTO rankings (spirit_id, drink_type, score) VALUES (?, ?, ?)",
            )
            .bind(spirit_id)
            .bind(drink_type)
            .bind(score)
            .execute(&mut *conn)
            .await?;
            Ok(UpsertOutcome::Created(res.last_insert_rowid()))
        }
    }
}

/// Creates or updates the ranking for (spirit, drink type). The spirit must
/// already be catalogued. The drink type is stored as given.
#[instrument(skip(pool))]
pub async fn upsert_ranking(
    pool: &Pool<Sqlite>,
    spirit_name: &str,
    drink_type: &str,
    score: f64,
) -> Result<UpsertOutcome, AppError> {
    info!("Upserting ranking");
    let mut tx = pool.begin().await?;

    let spirit = require_spirit(&mut *tx, spirit_name).await?;
    let outcome = upsert_ranking_for_spirit(&mut tx, spirit.id, drink_type, score).await?;

    tx.commit().await?;
    Ok(outcome)
}

/// Overwrites the score of an existing ranking. Unlike [`upsert_ranking`]
/// this never creates a row.
#[instrument(skip(pool))]
pub async fn update_ranking_score(
    pool: &Pool<Sqlite>,
    spirit_name: &str,
    drink_type: &str,
    score: f64,
) -> Result<Ranking, AppError> {
    info!("Updating ranking score");
    let mut tx = pool.begin().await?;

    let spirit = require_spirit(&mut *tx, spirit_name).await?;
    let mut ranking = find_ranking(&mut *tx, spirit.id, drink_type)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No '{}' ranking for spirit '{}'",
                drink_type, spirit_name
            ))
        })?;

    sqlx::query("UPDATE rankings SET score = ? WHERE id = ?")
        .bind(score)
        .bind(ranking.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    ranking.score = score;
    Ok(ranking)
}

#[instrument(skip(pool))]
pub async fn get_ranking_rows(
    pool: &Pool<Sqlite>,
    spirit_type: &str,
) -> Result<Vec<DbRankingRow>, AppError> {
    info!("Fetching ranking rows");
    let rows = sqlx::query_as::<_, DbRankingRow>(
        "SELECT s.id AS spirit_id, s.name, s.distillery, s.proof, s.age, s.description,
                r.drink_type, r.score
         FROM spirits s
         LEFT OUTER JOIN rankings r ON r.spirit_id = s.id
         WHERE s.spirit_type = ?
         ORDER BY s.name, s.id, r.id",
    )
    .bind(spirit_type)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stores a review, cataloguing the spirit first if the name is unknown.
#[instrument(skip(pool, review), fields(spirit = %review.spirit_name))]
pub async fn create_review(pool: &Pool<Sqlite>, review: &NewReview) -> Result<i64, AppError> {
    info!("Creating review");
    let mut tx = pool.begin().await?;

    let spirit_id = match find_or_create_spirit(&mut tx, &review.spirit_name, &review.spirit_type)
        .await?
    {
        CreateOutcome::Created(id) | CreateOutcome::AlreadyExists(id) => id,
    };

    let res = sqlx::query(
        "INSERT INTO reviews (spirit_id, review_text, rating, drink_type) VALUES (?, ?, ?, ?)",
    )
    .bind(spirit_id)
    .bind(&review.review_text)
    .bind(review.rating)
    .bind(&review.drink_type)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_review(pool: &Pool<Sqlite>, id: i64) -> Result<Review, AppError> {
    info!("Getting review");
    let row = sqlx::query_as::<_, DbReview>(&format!("{} WHERE rv.id = ?", REVIEW_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(review) => Ok(Review::from(review)),
        _ => Err(AppError::NotFound(format!("Review with id {} not found", id))),
    }
}

#[instrument(skip(pool, review_text))]
pub async fn update_review(
    pool: &Pool<Sqlite>,
    id: i64,
    rating: f64,
    review_text: &str,
) -> Result<(), AppError> {
    info!("Updating review");
    let now = Utc::now().naive_utc();
    let res = sqlx::query(
        "UPDATE reviews SET rating = ?, review_text = ?, updated_at = ? WHERE id = ?",
    )
    .bind(rating)
    .bind(review_text)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Review with id {} not found", id)));
    }

    Ok(())
}

#[instrument]
pub async fn list_reviews_for_spirit(
    pool: &Pool<Sqlite>,
    spirit_name: &str,
) -> Result<Vec<Review>, AppError> {
    info!("Listing reviews for spirit");
    let spirit = require_spirit(pool, spirit_name).await?;

    let rows = sqlx::query_as::<_, DbReview>(&format!(
        "{} WHERE rv.spirit_id = ? ORDER BY rv.created_at DESC, rv.id DESC",
        REVIEW_SELECT
    ))
    .bind(spirit.id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Review::from).collect())
}

/// Removes a spirit together with its rankings and reviews. Nothing is
/// touched when no spirit matches both the type and the name.
#[instrument(skip(pool))]
pub async fn delete_spirit(
    pool: &Pool<Sqlite>,
    spirit_type: &str,
    spirit_name: &str,
) -> Result<DeletedSpirit, AppError> {
    info!("Deleting spirit");
    let mut tx = pool.begin().await?;

    let spirit_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM spirits WHERE spirit_type = ? AND name = ?",
    )
    .bind(spirit_type)
    .bind(spirit_name)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "{} '{}' not found",
            spirit_type, spirit_name
        ))
    })?;

    let rankings_removed = sqlx::query("DELETE FROM rankings WHERE spirit_id = ?")
        .bind(spirit_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let reviews_removed = sqlx::query("DELETE FROM reviews WHERE spirit_id = ?")
        .bind(spirit_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM spirits WHERE id = ?")
        .bind(spirit_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(DeletedSpirit {
        id: spirit_id,
        rankings_removed,
        reviews_removed,
    })
}
