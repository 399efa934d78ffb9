#[cfg(test)]
pub mod test_db {
    use crate::config::AppConfig;
    use crate::db::{create_review, create_spirit, upsert_ranking};
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::{NewReview, NewSpirit};
    use rocket::local::asynchronous::Client;
    use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();

    #[derive(Default)]
    pub struct TestDbBuilder {
        spirits: Vec<NewSpirit>,
        rankings: Vec<TestRanking>,
        reviews: Vec<NewReview>,
    }

    pub struct TestRanking {
        pub spirit_name: String,
        pub drink_type: String,
        pub score: f64,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn spirit(self, name: &str, spirit_type: &str) -> Self {
            self.spirit_with(NewSpirit {
                name: name.to_string(),
                spirit_type: spirit_type.to_string(),
                ..NewSpirit::default()
            })
        }

        pub fn spirit_with(mut self, spirit: NewSpirit) -> Self {
            self.spirits.push(spirit);
            self
        }

        pub fn ranking(mut self, spirit_name: &str, drink_type: &str, score: f64) -> Self {
            self.rankings.push(TestRanking {
                spirit_name: spirit_name.to_string(),
                drink_type: drink_type.to_string(),
                score,
            });
            self
        }

        pub fn review(
            mut self,
            spirit_name: &str,
            drink_type: &str,
            rating: f64,
            review_text: &str,
        ) -> Self {
            self.reviews.push(NewReview {
                spirit_name: spirit_name.to_string(),
                spirit_type: "Bourbon".to_string(),
                drink_type: drink_type.to_string(),
                rating,
                review_text: review_text.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            // A single connection keeps every query on the same in-memory database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut spirit_id_map: HashMap<String, i64> = HashMap::new();

            for spirit in &self.spirits {
                let id = match create_spirit(&pool, spirit).await? {
                    crate::db::CreateOutcome::Created(id)
                    | crate::db::CreateOutcome::AlreadyExists(id) => id,
                };
                spirit_id_map.insert(spirit.name.clone(), id);
            }

            for ranking in &self.rankings {
                upsert_ranking(
                    &pool,
                    &ranking.spirit_name,
                    &ranking.drink_type,
                    ranking.score,
                )
                .await?;
            }

            for review in &self.reviews {
                create_review(&pool, review).await?;
            }

            Ok(TestDb {
                pool,
                spirit_id_map,
            })
        }
    }

    #[derive(Debug)]
    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub spirit_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn spirit_id(&self, name: &str) -> Option<i64> {
            self.spirit_id_map.get(name).copied()
        }

        pub async fn ranking_rows(&self, spirit_name: &str, drink_type: &str) -> Vec<f64> {
            sqlx::query_scalar::<_, f64>(
                "SELECT r.score FROM rankings r
                 JOIN spirits s ON s.id = r.spirit_id
                 WHERE s.name = ? AND r.drink_type = ?
                 ORDER BY r.id",
            )
            .bind(spirit_name)
            .bind(drink_type)
            .fetch_all(&self.pool)
            .await
            .expect("Failed to query rankings")
        }

        pub async fn count(&self, table: &str) -> i64 {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await
                .expect("Failed to count rows")
        }

        pub async fn description_of(&self, spirit_name: &str) -> Option<String> {
            sqlx::query_scalar::<_, Option<String>>(
                "SELECT description FROM spirits WHERE name = ?",
            )
            .bind(spirit_name)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to query description")
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .spirit("Eagle Rare", "Bourbon")
            .spirit("Buffalo Trace", "Bourbon")
            .spirit("Lagavulin 16", "Scotch")
            .ranking("Eagle Rare", "Neat", 8.5)
            .ranking("Buffalo Trace", "Neat", 7.0)
            .ranking("Buffalo Trace", "Old Fashioned", 9.0)
            .review("Eagle Rare", "Neat", 9.0, "Cherry and leather")
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), AppConfig::default()).await;
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to create Rocket test client");

        (client, test_db)
    }
}
