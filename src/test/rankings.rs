#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::models::{DrinkType, RatingCell};
    use crate::db::upsert_ranking;
    use crate::rankings::{
        DEFAULT_SPIRIT_TYPE, RankingQuery, SortKey, SortOrder, aggregate_rankings,
    };
    use crate::test::test_utils::{TestDbBuilder, create_standard_test_db};

    fn names(matrix: &crate::rankings::RankingMatrix) -> Vec<&str> {
        matrix.spirits.iter().map(|s| s.name.as_str()).collect()
    }

    fn sorted_by(sort_by: &str, sort_order: &str) -> RankingQuery {
        RankingQuery::from_params(None, Some(sort_by), Some(sort_order), DEFAULT_SPIRIT_TYPE)
            .expect("Failed to build query")
    }

    #[tokio::test]
    async fn test_missing_rankings_are_not_available() {
        let test_db = TestDbBuilder::new()
            .spirit("Eagle Rare", "Bourbon")
            .ranking("Eagle Rare", "Neat", 8.5)
            .build()
            .await
            .expect("Failed to build test database");

        let matrix = aggregate_rankings(&test_db.pool, RankingQuery::default())
            .await
            .expect("Failed to aggregate rankings");

        let eagle_rare = matrix.get("Eagle Rare").expect("Eagle Rare missing");
        assert_eq!(eagle_rare.rating(DrinkType::Neat), RatingCell::Score(8.5));
        assert_eq!(
            eagle_rare.rating(DrinkType::WithWater),
            RatingCell::NotAvailable
        );

        let json = serde_json::to_value(&matrix).expect("Failed to serialize matrix");
        let ratings = &json["spirits"][0]["ratings"];
        assert_eq!(ratings["Neat"], serde_json::json!(8.5));
        assert_eq!(ratings["With Water"], serde_json::json!("N/A"));
    }

    #[tokio::test]
    async fn test_every_entry_has_all_drink_types() {
        let test_db = create_standard_test_db().await;

        let matrix = aggregate_rankings(&test_db.pool, RankingQuery::default())
            .await
            .expect("Failed to aggregate rankings");

        assert_eq!(names(&matrix), vec!["Buffalo Trace", "Eagle Rare"]);
        for entry in &matrix.spirits {
            assert_eq!(entry.ratings.len(), DrinkType::ALL.len());
            assert!(DrinkType::ALL.iter().all(|d| entry.ratings.contains_key(d)));
        }
        assert_eq!(matrix.spirit_types, vec!["Bourbon", "Scotch"]);
        assert_eq!(matrix.drink_types.len(), 7);
    }

    #[tokio::test]
    async fn test_filters_by_spirit_type() {
        let test_db = create_standard_test_db().await;

        let query = RankingQuery::from_params(Some("Scotch"), None, None, DEFAULT_SPIRIT_TYPE)
            .expect("Failed to build query");
        let matrix = aggregate_rankings(&test_db.pool, query)
            .await
            .expect("Failed to aggregate rankings");

        assert_eq!(names(&matrix), vec!["Lagavulin 16"]);
        let lagavulin = &matrix.spirits[0];
        assert!(
            lagavulin
                .ratings
                .values()
                .all(|cell| *cell == RatingCell::NotAvailable)
        );

        let query = RankingQuery::from_params(Some("Rye"), None, None, DEFAULT_SPIRIT_TYPE)
            .expect("Failed to build query");
        let matrix = aggregate_rankings(&test_db.pool, query)
            .await
            .expect("Failed to aggregate rankings");
        assert!(matrix.spirits.is_empty());
    }

    #[tokio::test]
    async fn test_zero_is_not_missing() {
        let test_db = TestDbBuilder::new()
            .spirit("Rot Gut", "Bourbon")
            .ranking("Rot Gut", "With Coke", 0.0)
            .build()
            .await
            .expect("Failed to build test database");

        let matrix = aggregate_rankings(&test_db.pool, RankingQuery::default())
            .await
            .expect("Failed to aggregate rankings");

        let entry = matrix.get("Rot Gut").expect("Rot Gut missing");
        assert_eq!(entry.rating(DrinkType::WithCoke), RatingCell::Score(0.0));

        let json = serde_json::to_value(entry).expect("Failed to serialize entry");
        assert_eq!(json["ratings"]["With Coke"], serde_json::json!(0.0));
    }

    #[tokio::test]
    async fn test_unlisted_drink_types_are_hidden() {
        let test_db = TestDbBuilder::new()
            .spirit("Eagle Rare", "Bourbon")
            .ranking("Eagle Rare", "Manhattan", 7.5)
            .build()
            .await
            .expect("Failed to build test database");

        let matrix = aggregate_rankings(&test_db.pool, RankingQuery::default())
            .await
            .expect("Failed to aggregate rankings");

        let entry = matrix.get("Eagle Rare").expect("Eagle Rare missing");
        assert_eq!(entry.ratings.len(), 7);
        assert!(entry.ratings.values().all(|c| *c == RatingCell::NotAvailable));
    }

    #[tokio::test]
    async fn test_duplicate_rows_show_the_upserted_one() {
        let test_db = TestDbBuilder::new()
            .spirit("Eagle Rare", "Bourbon")
            .ranking("Eagle Rare", "Neat", 8.0)
            .build()
            .await
            .expect("Failed to build test database");
        let spirit_id = test_db.spirit_id("Eagle Rare").expect("Spirit not found");

        sqlx::query("INSERT INTO rankings (spirit_id, drink_type, score) VALUES (?, 'Neat', 3.0)")
            .bind(spirit_id)
            .execute(&test_db.pool)
            .await
            .expect("Failed to insert duplicate ranking");

        upsert_ranking(&test_db.pool, "Eagle Rare", "Neat", 9.5)
            .await
            .expect("Failed to upsert ranking");
        assert_eq!(
            test_db.ranking_rows("Eagle Rare", "Neat").await,
            vec![9.5, 3.0]
        );

        let matrix = aggregate_rankings(&test_db.pool, RankingQuery::default())
            .await
            .expect("Failed to aggregate rankings");
        let entry = matrix.get("Eagle Rare").expect("Eagle Rare missing");
        assert_eq!(entry.rating(DrinkType::Neat), RatingCell::Score(9.5));
    }

    #[tokio::test]
    async fn test_sort_by_name() {
        let test_db = TestDbBuilder::new()
            .spirit("Weller", "Bourbon")
            .spirit("Blanton's", "Bourbon")
            .spirit("Old Forester", "Bourbon")
            .build()
            .await
            .expect("Failed to build test database");

        let asc = aggregate_rankings(&test_db.pool, sorted_by("spirit_name", "asc"))
            .await
            .expect("Failed to aggregate rankings");
        assert_eq!(names(&asc), vec!["Blanton's", "Old Forester", "Weller"]);

        let desc = aggregate_rankings(&test_db.pool, sorted_by("spirit_name", "desc"))
            .await
            .expect("Failed to aggregate rankings");
        assert_eq!(names(&desc), vec!["Weller", "Old Forester", "Blanton's"]);
    }

    #[tokio::test]
    async fn test_sort_by_drink_type_places_missing_scores_last_when_descending() {
        let test_db = TestDbBuilder::new()
            .spirit("A", "Bourbon")
            .spirit("B", "Bourbon")
            .spirit("C", "Bourbon")
            .spirit("D", "Bourbon")
            .ranking("A", "Neat", 5.0)
            .ranking("B", "Neat", 9.0)
            .ranking("C", "On the Rocks", 10.0)
            .ranking("D", "Neat", 5.0)
            .build()
            .await
            .expect("Failed to build test database");

        let desc = aggregate_rankings(&test_db.pool, sorted_by("Neat", "desc"))
            .await
            .expect("Failed to aggregate rankings");
        assert_eq!(names(&desc), vec!["B", "A", "D", "C"]);

        let asc = aggregate_rankings(&test_db.pool, sorted_by("Neat", "asc"))
            .await
            .expect("Failed to aggregate rankings");
        assert_eq!(names(&asc), vec!["C", "A", "D", "B"]);
        assert_eq!(asc.query.sort_by, SortKey::DrinkType(DrinkType::Neat));
    }

    #[test]
    fn test_query_defaults() {
        let query = RankingQuery::from_params(None, Some(""), Some("  "), "Scotch")
            .expect("Failed to build query");

        assert_eq!(query.spirit_type, "Scotch");
        assert_eq!(query.sort_by, SortKey::SpiritName);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_query_rejects_unknown_sort_key() {
        let result = RankingQuery::from_params(None, Some("proof"), None, DEFAULT_SPIRIT_TYPE);

        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("proof")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_query_rejects_unknown_sort_order() {
        let result =
            RankingQuery::from_params(None, Some("Neat"), Some("sideways"), DEFAULT_SPIRIT_TYPE);

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_query_serializes_sort_key_label() {
        let query = sorted_by("Old Fashioned", "desc");
        let json = serde_json::to_value(&query).expect("Failed to serialize query");

        assert_eq!(json["sort_by"], "Old Fashioned");
        assert_eq!(json["sort_order"], "desc");
    }
}
