
use rocket::State;
use rocket::data::{Data, Limits};
use rocket::form::Form;
use rocket::http::RawStr;
use rocket::response::{Flash, Redirect};
use rocket::serde::json::Json;
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::batch::{BatchSummary, FieldConvention, fields_from_urlencoded, save_batch};
use crate::config::AppConfig;
use crate::db::{
    CreateOutcome, UpsertOutcome, create_review, create_spirit, delete_spirit, get_ranking,
    get_review, list_rankings_for_spirit, list_reviews_for_spirit, list_spirit_types,
    list_spirits, require_spirit, update_ranking_score, update_review, upsert_ranking,
};
use crate::error::AppError;
use crate::models::{DrinkType, NewReview, NewSpirit, Ranking, Review};
use crate::rankings::{RankingMatrix, RankingQuery, aggregate_rankings};
use crate::validation::{FormValidateExt, blank_to_none, parse_optional_number, parse_score};

type FormResult = Result<Flash<Redirect>, Flash<Redirect>>;

pub fn rankings_uri(spirit_type: &str) -> String {
    format!(
        "/rankings?spirit_type={}",
        RawStr::new(spirit_type).percent_encode()
    )
}

/// Value of a field already checked by `validate_form`.
fn field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

#[get("/")]
pub async fn index(db: &State<Pool<Sqlite>>, config: &State<AppConfig>) -> Result<Json<Value>, AppError> {
    let spirit_types = list_spirit_types(db).await?;

    Ok(Json(json!({
        "title": "Spirit Rankings",
        "default_spirit_type": config.default_spirit_type,
        "spirit_types": spirit_types,
        "drink_types": DrinkType::labels(),
    })))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[get("/rankings?<sort_by>&<sort_order>&<spirit_type>")]
pub async fn rankings_page(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    spirit_type: Option<&str>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<RankingMatrix>, AppError> {
    let query =
        RankingQuery::from_params(spirit_type, sort_by, sort_order, &config.default_spirit_type)?;

    Ok(Json(aggregate_rankings(db, query).await?))
}

fn batch_message(summary: &BatchSummary) -> String {
    format!(
        "Saved {} ranking(s) and {} description(s)",
        summary.rankings_written, summary.descriptions_updated
    )
}

async fn read_form_body(data: Data<'_>, limits: &Limits) -> Result<String, AppError> {
    let body = data
        .open(limits.get("form").unwrap_or(Limits::FORM))
        .into_string()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read form body: {}", e)))?;

    if !body.is_complete() {
        return Err(AppError::Validation("Form submission is too large".to_string()));
    }

    Ok(body.into_inner())
}

async fn submit_batch(
    db: &Pool<Sqlite>,
    config: &AppConfig,
    convention: FieldConvention,
    data: Data<'_>,
    limits: &Limits,
) -> FormResult {
    let fallback = rankings_uri(&config.default_spirit_type);
    let fields = match read_form_body(data, limits).await {
        Ok(body) => fields_from_urlencoded(&body),
        Err(e) => return Err(e.into_flash(fallback)),
    };

    let redirect_to = match blank_to_none(fields.get("spirit_type").map(String::as_str)) {
        Some(spirit_type) => rankings_uri(spirit_type),
        None => fallback,
    };

    match save_batch(db, convention, &fields).await {
        Ok(summary) => Ok(Flash::success(
            Redirect::to(redirect_to),
            batch_message(&summary),
        )),
        Err(e) => Err(e.into_flash(redirect_to)),
    }
}

#[post("/update_ranking", format = "form", data = "<data>")]
pub async fn update_rankings(
    data: Data<'_>,
    limits: &Limits,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> FormResult {
    submit_batch(db, config, FieldConvention::Prefixed, data, limits).await
}

#[post("/save_rankings", format = "form", data = "<data>")]
pub async fn save_rankings(
    data: Data<'_>,
    limits: &Limits,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> FormResult {
    submit_batch(db, config, FieldConvention::Plain, data, limits).await
}

#[get("/edit_ranking/<spirit_name>/<drink_type>")]
pub async fn edit_ranking_page(
    spirit_name: &str,
    drink_type: &str,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Ranking>, AppError> {
    Ok(Json(get_ranking(db, spirit_name, drink_type).await?))
}

#[derive(FromForm, Validate)]
pub struct ScoreForm {
    #[validate(required(message = "is required"))]
    score: Option<String>,
}

#[post("/edit_ranking/<spirit_name>/<drink_type>", data = "<form>")]
pub async fn edit_ranking(
    spirit_name: &str,
    drink_type: &str,
    form: Form<ScoreForm>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> FormResult {
    let result = async {
        form.validate_form()?;
        let score = parse_score("score", field(&form.score))?;
        update_ranking_score(db, spirit_name, drink_type, score).await
    }
    .await;

    match result {
        Ok(ranking) => {
            let spirit_type = require_spirit(&**db, spirit_name)
                .await
                .map(|s| s.spirit_type)
                .unwrap_or_else(|_| config.default_spirit_type.clone());
            Ok(Flash::success(
                Redirect::to(rankings_uri(&spirit_type)),
                format!(
                    "{} {} is now {}",
                    ranking.spirit_name, ranking.drink_type, ranking.score
                ),
            ))
        }
        Err(e) => Err(e.into_flash(rankings_uri(&config.default_spirit_type))),
    }
}

#[get("/rank_spirit")]
pub async fn rank_spirit_page(db: &State<Pool<Sqlite>>) -> Result<Json<Value>, AppError> {
    let spirits = list_spirits(db, None).await?;

    Ok(Json(json!({
        "spirits": spirits,
        "drink_types": DrinkType::labels(),
    })))
}

#[derive(FromForm, Validate)]
pub struct RankSpiritForm {
    #[validate(
        required(message = "is required"),
        length(min = 1, message = "is required")
    )]
    spirit_name: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 1, message = "is required")
    )]
    drink_type: Option<String>,
    #[validate(required(message = "is required"))]
    score: Option<String>,
}

#[post("/rank_spirit", data = "<form>")]
pub async fn rank_spirit(form: Form<RankSpiritForm>, db: &State<Pool<Sqlite>>) -> FormResult {
    let result = async {
        form.validate_form()?;
        let spirit_name = field(&form.spirit_name);
        let drink_type = field(&form.drink_type);
        let score = parse_score("score", field(&form.score))?;

        let outcome = upsert_ranking(db, spirit_name, drink_type, score).await?;
        let spirit = require_spirit(&**db, spirit_name).await?;
        Ok::<_, AppError>((spirit, outcome))
    }
    .await;

    match result {
        Ok((spirit, outcome)) => {
            let verb = match outcome {
                UpsertOutcome::Created(_) => "Added",
                UpsertOutcome::Updated(_) => "Updated",
            };
            info!(spirit = %spirit.name, ?outcome, "Ranked spirit");
            Ok(Flash::success(
                Redirect::to(rankings_uri(&spirit.spirit_type)),
                format!("{} ranking for {}", verb, spirit.name),
            ))
        }
        Err(e) => Err(e.into_flash("/rank_spirit")),
    }
}

#[get("/add_spirit")]
pub async fn add_spirit_page(
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<Value>, AppError> {
    let spirit_types = list_spirit_types(db).await?;

    Ok(Json(json!({
        "spirit_types": spirit_types,
        "default_spirit_type": config.default_spirit_type,
    })))
}

#[derive(FromForm, Validate)]
pub struct AddSpiritForm {
    #[validate(
        required(message = "is required"),
        length(min = 1, max = 100, message = "must be 1 to 100 characters")
    )]
    name: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 1, max = 50, message = "must be 1 to 50 characters")
    )]
    spirit_type: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    distillery: Option<String>,
    proof: Option<String>,
    age: Option<String>,
    description: Option<String>,
}

#[post("/add_spirit", data = "<form>")]
pub async fn add_spirit(form: Form<AddSpiritForm>, db: &State<Pool<Sqlite>>) -> FormResult {
    let result = async {
        form.validate_form()?;
        let spirit = NewSpirit {
            name: field(&form.name).to_string(),
            spirit_type: field(&form.spirit_type).to_string(),
            distillery: blank_to_none(form.distillery.as_deref()).map(String::from),
            proof: parse_optional_number("proof", form.proof.as_deref())?,
            age: blank_to_none(form.age.as_deref()).map(String::from),
            description: blank_to_none(form.description.as_deref()).map(String::from),
        };
        let outcome = create_spirit(db, &spirit).await?;
        Ok::<_, AppError>((spirit, outcome))
    }
    .await;

    match result {
        Ok((spirit, CreateOutcome::Created(_))) => Ok(Flash::success(
            Redirect::to(rankings_uri(&spirit.spirit_type)),
            format!("Added {}", spirit.name),
        )),
        Ok((spirit, CreateOutcome::AlreadyExists(_))) => Ok(Flash::new(
            Redirect::to(rankings_uri(&spirit.spirit_type)),
            "warning",
            format!("{} is already catalogued", spirit.name),
        )),
        Err(e) => Err(e.into_flash("/add_spirit")),
    }
}

#[get("/add_review")]
pub async fn add_review_page(db: &State<Pool<Sqlite>>) -> Result<Json<Value>, AppError> {
    let spirits = list_spirits(db, None).await?;

    Ok(Json(json!({
        "spirits": spirits,
        "drink_types": DrinkType::labels(),
    })))
}

#[derive(FromForm, Validate)]
pub struct AddReviewForm {
    #[validate(
        required(message = "is required"),
        length(min = 1, max = 100, message = "must be 1 to 100 characters")
    )]
    name: Option<String>,
    #[validate(
        required(message = "is required"),
        length(min = 1, message = "is required")
    )]
    drink_type: Option<String>,
    #[validate(required(message = "is required"))]
    rating: Option<String>,
    #[validate(required(message = "is required"))]
    review_text: Option<String>,
    spirit_type: Option<String>,
}

#[post("/add_review", data = "<form>")]
pub async fn add_review(
    form: Form<AddReviewForm>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> FormResult {
    let result = async {
        form.validate_form()?;
        let review = NewReview {
            spirit_name: field(&form.name).to_string(),
            spirit_type: blank_to_none(form.spirit_type.as_deref())
                .unwrap_or(&config.default_spirit_type)
                .to_string(),
            drink_type: field(&form.drink_type).to_string(),
            rating: parse_score("rating", field(&form.rating))?,
            review_text: field(&form.review_text).to_string(),
        };
        create_review(db, &review).await?;
        let spirit = require_spirit(&**db, &review.spirit_name).await?;
        Ok::<_, AppError>(spirit)
    }
    .await;

    match result {
        Ok(spirit) => Ok(Flash::success(
            Redirect::to(rankings_uri(&spirit.spirit_type)),
            format!("Review for {} saved", spirit.name),
        )),
        Err(e) => Err(e.into_flash("/add_review")),
    }
}

#[get("/edit_review/<id>")]
pub async fn edit_review_page(id: i64, db: &State<Pool<Sqlite>>) -> Result<Json<Review>, AppError> {
    Ok(Json(get_review(db, id).await?))
}

#[derive(FromForm, Validate)]
pub struct EditReviewForm {
    #[validate(required(message = "is required"))]
    rating: Option<String>,
    #[validate(required(message = "is required"))]
    review_text: Option<String>,
}

/// A missing review answers 404; bad input redirects back to the edit page.
#[post("/edit_review/<id>", data = "<form>")]
pub async fn edit_review(
    id: i64,
    form: Form<EditReviewForm>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Flash<Redirect>, AppError> {
    get_review(db, id).await?;

    let result = async {
        form.validate_form()?;
        let rating = parse_score("rating", field(&form.rating))?;
        update_review(db, id, rating, field(&form.review_text)).await?;
        get_review(db, id).await
    }
    .await;

    match result {
        Ok(review) => {
            let spirit_type = require_spirit(&**db, &review.spirit_name)
                .await
                .map(|s| s.spirit_type)
                .unwrap_or_else(|_| config.default_spirit_type.clone());
            Ok(Flash::success(
                Redirect::to(rankings_uri(&spirit_type)),
                format!("Review for {} updated", review.spirit_name),
            ))
        }
        Err(e @ AppError::NotFound(_)) => Err(e),
        Err(e) => Ok(e.into_flash(format!("/edit_review/{}", id))),
    }
}

#[get("/spirit/<name>")]
pub async fn spirit_detail(name: &str, db: &State<Pool<Sqlite>>) -> Result<Json<Value>, AppError> {
    let spirit = require_spirit(&**db, name).await?;
    let rankings = list_rankings_for_spirit(db, spirit.id).await?;
    let reviews = list_reviews_for_spirit(db, name).await?;

    Ok(Json(json!({
        "spirit": spirit,
        "rankings": rankings,
        "reviews": reviews,
    })))
}

#[post("/delete_spirit/<spirit_type>/<spirit_name>")]
pub async fn delete_spirit_route(
    spirit_type: &str,
    spirit_name: &str,
    db: &State<Pool<Sqlite>>,
) -> FormResult {
    let redirect_to = rankings_uri(spirit_type);

    match delete_spirit(db, spirit_type, spirit_name).await {
        Ok(deleted) => {
            info!(
                spirit_id = deleted.id,
                rankings_removed = deleted.rankings_removed,
                reviews_removed = deleted.reviews_removed,
                "Deleted spirit"
            );
            Ok(Flash::success(
                Redirect::to(redirect_to),
                format!("Deleted {}", spirit_name),
            ))
        }
        Err(e) => Err(e.into_flash(redirect_to)),
    }
}
