//! SQLite-backed [`Store`] implementation.
//!
//! Timestamps are stored as RFC 3339 text with nanosecond precision in
//! UTC, so lexical order is chronological order. Ties are broken by
//! `rowid`, i.e. insertion order.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crop_advisor_core::models::{Farm, Feedback, FeedbackStats, RecommendationRecord, SoilReport};
use crop_advisor_core::store::{Store, StoreError, StoreResult};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp in database: {}", raw))
        .map_err(StoreError::Backend)
}

fn farm_from_row(row: &SqliteRow) -> StoreResult<Farm> {
    Ok(Farm {
        id: row.try_get("id").map_err(backend)?,
        farm_id: row.try_get("farm_id").map_err(backend)?,
        owner_name: row.try_get("owner_name").map_err(backend)?,
        location: row.try_get("location").map_err(backend)?,
        area_hectares: row.try_get("area_hectares").map_err(backend)?,
        created_at: parse_ts(row.try_get("created_at").map_err(backend)?)?,
    })
}

fn soil_report_from_row(row: &SqliteRow) -> StoreResult<SoilReport> {
    Ok(SoilReport {
        id: row.try_get("id").map_err(backend)?,
        farm_id: row.try_get("farm_id").map_err(backend)?,
        n: row.try_get("n").map_err(backend)?,
        p: row.try_get("p").map_err(backend)?,
        k: row.try_get("k").map_err(backend)?,
        ph: row.try_get("ph").map_err(backend)?,
        organic_matter: row.try_get("organic_matter").map_err(backend)?,
        test_date: parse_ts(row.try_get("test_date").map_err(backend)?)?,
    })
}

fn recommendation_from_row(row: &SqliteRow) -> StoreResult<RecommendationRecord> {
    let input_json: String = row.try_get("input_json").map_err(backend)?;
    let recs_json: String = row.try_get("recommendations_json").map_err(backend)?;
    Ok(RecommendationRecord {
        id: row.try_get("id").map_err(backend)?,
        farm_id: row.try_get("farm_id").map_err(backend)?,
        input: serde_json::from_str(&input_json)
            .context("invalid input_json")
            .map_err(StoreError::Backend)?,
        recommendations: serde_json::from_str(&recs_json)
            .context("invalid recommendations_json")
            .map_err(StoreError::Backend)?,
        season: row.try_get("season").map_err(backend)?,
        created_at: parse_ts(row.try_get("created_at").map_err(backend)?)?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_farm(&self, farm: &Farm) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO farms (id, farm_id, owner_name, location, area_hectares, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&farm.id)
        .bind(&farm.farm_id)
        .bind(&farm.owner_name)
        .bind(&farm.location)
        .bind(farm.area_hectares)
        .bind(format_ts(&farm.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                StoreError::Conflict(format!("farm {} already exists", farm.farm_id)),
            ),
            Err(e) => Err(backend(e)),
        }
    }

    async fn get_farm(&self, farm_id: &str) -> StoreResult<Option<Farm>> {
        let row = sqlx::query("SELECT * FROM farms WHERE farm_id = ?")
            .bind(farm_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(farm_from_row).transpose()
    }

    async fn create_soil_report(&self, report: &SoilReport) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO soil_reports (id, farm_id, n, p, k, ph, organic_matter, test_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.id)
        .bind(&report.farm_id)
        .bind(report.n)
        .bind(report.p)
        .bind(report.k)
        .bind(report.ph)
        .bind(report.organic_matter)
        .bind(format_ts(&report.test_date))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn latest_soil_report(&self, farm_id: &str) -> StoreResult<Option<SoilReport>> {
        let row = sqlx::query(
            "SELECT * FROM soil_reports WHERE farm_id = ? ORDER BY test_date DESC, rowid DESC LIMIT 1",
        )
        .bind(farm_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(soil_report_from_row).transpose()
    }

    async fn create_recommendation(&self, record: &RecommendationRecord) -> StoreResult<()> {
        let input_json = serde_json::to_string(&record.input)
            .map_err(|e| StoreError::Backend(e.into()))?;
        let recs_json = serde_json::to_string(&record.recommendations)
            .map_err(|e| StoreError::Backend(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO recommendations (id, farm_id, input_json, recommendations_json, season, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.farm_id)
        .bind(input_json)
        .bind(recs_json)
        .bind(&record.season)
        .bind(format_ts(&record.created_at))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn latest_recommendation(&self, farm_id: &str) -> StoreResult<Option<RecommendationRecord>> {
        let row = sqlx::query(
            "SELECT * FROM recommendations WHERE farm_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(farm_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(recommendation_from_row).transpose()
    }

    async fn recommendation_history(
        &self,
        farm_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<RecommendationRecord>> {
        let limit = i64::try_from(limit).map_err(|_| StoreError::Backend(anyhow!("limit too large")))?;
        let rows = sqlx::query(
            "SELECT * FROM recommendations WHERE farm_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(farm_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(recommendation_from_row).collect()
    }

    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (id, farm_id, recommendation_id, crop, accepted, rating, comments, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&feedback.id)
        .bind(&feedback.farm_id)
        .bind(&feedback.recommendation_id)
        .bind(&feedback.crop)
        .bind(feedback.accepted)
        .bind(feedback.rating.map(i64::from))
        .bind(&feedback.comments)
        .bind(format_ts(&feedback.created_at))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn feedback_stats(&self, crop: Option<&str>) -> StoreResult<FeedbackStats> {
        // `?1 IS NULL` disables the crop filter
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(accepted), 0) AS accepted,
                   AVG(rating) AS avg_rating
            FROM feedback
            WHERE ?1 IS NULL OR crop = ?1
            "#,
        )
        .bind(crop)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let total: i64 = row.try_get("total").map_err(backend)?;
        let accepted: i64 = row.try_get("accepted").map_err(backend)?;
        let average_rating: Option<f64> = row.try_get("avg_rating").map_err(backend)?;

        let crops: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT crop FROM feedback WHERE ?1 IS NULL OR crop = ?1 ORDER BY crop",
        )
        .bind(crop)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(FeedbackStats {
            total_feedback: total as u64,
            accepted_count: accepted as u64,
            acceptance_rate: if total == 0 {
                0.0
            } else {
                accepted as f64 / total as f64
            },
            average_rating,
            crops,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crop_advisor_core::models::{NewFarm, NewFeedback, NewSoilReport};
    use crop_advisor_core::{FeatureVector, Recommendation};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn farm(id: &str) -> Farm {
        Farm::new(NewFarm {
            farm_id: id.into(),
            owner_name: "Ravi".into(),
            location: "Pune".into(),
            area_hectares: 4.0,
        })
    }

    fn feedback(crop: &str, accepted: bool, rating: Option<u8>) -> Feedback {
        Feedback::new(NewFeedback {
            farm_id: "farm_1".into(),
            recommendation_id: None,
            crop: crop.into(),
            accepted,
            rating,
            comments: Some("ok".into()),
        })
    }

    #[tokio::test]
    async fn test_farm_roundtrip_and_conflict() {
        let store = store().await;
        let f = farm("farm_1");
        store.create_farm(&f).await.unwrap();
        assert_eq!(store.get_farm("farm_1").await.unwrap(), Some(f));

        let err = store.create_farm(&farm("farm_1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.get_farm("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_soil_report() {
        let store = store().await;
        let mut older = SoilReport::new(
            "farm_1",
            NewSoilReport {
                n: 10.0,
                p: 10.0,
                k: 10.0,
                ph: 5.5,
                organic_matter: Some(0.4),
            },
        );
        older.test_date = older.test_date - Duration::days(3);
        let newer = SoilReport::new(
            "farm_1",
            NewSoilReport {
                n: 90.0,
                p: 42.0,
                k: 43.0,
                ph: 6.5,
                organic_matter: None,
            },
        );
        store.create_soil_report(&newer).await.unwrap();
        store.create_soil_report(&older).await.unwrap();

        assert_eq!(store.latest_soil_report("farm_1").await.unwrap(), Some(newer));
        assert!(store.latest_soil_report("farm_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recommendation_history() {
        let store = store().await;
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..4 {
            let mut record = RecommendationRecord::new(
                "farm_1",
                FeatureVector::from_array([90.0, 42.0, 43.0, 25.0, 80.0, 6.5, 200.0]),
                vec![Recommendation {
                    crop: "rice".into(),
                    score: 0.25 * i as f64,
                    reason: "Suitable due to a and b".into(),
                }],
            );
            record.created_at = base + Duration::seconds(i);
            store.create_recommendation(&record).await.unwrap();
            ids.push(record.id);
        }

        let history = store.recommendation_history("farm_1", 3).await.unwrap();
        let got: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(got, vec![ids[3].as_str(), ids[2].as_str(), ids[1].as_str()]);
        assert_eq!(history[0].recommendations[0].score, 0.75);

        let latest = store.latest_recommendation("farm_1").await.unwrap().unwrap();
        assert_eq!(latest.id, ids[3]);
        assert!(store.recommendation_history("farm_9", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_stats() {
        let store = store().await;
        let empty = store.feedback_stats(None).await.unwrap();
        assert_eq!(empty.total_feedback, 0);
        assert_eq!(empty.acceptance_rate, 0.0);
        assert_eq!(empty.average_rating, None);

        store.create_feedback(&feedback("rice", true, Some(4))).await.unwrap();
        store.create_feedback(&feedback("rice", false, None)).await.unwrap();
        store.create_feedback(&feedback("maize", true, Some(2))).await.unwrap();

        let all = store.feedback_stats(None).await.unwrap();
        assert_eq!(all.total_feedback, 3);
        assert_eq!(all.accepted_count, 2);
        assert_eq!(all.average_rating, Some(3.0));
        assert_eq!(all.crops, vec!["maize", "rice"]);

        let rice = store.feedback_stats(Some("rice")).await.unwrap();
        assert_eq!(rice.total_feedback, 2);
        assert_eq!(rice.acceptance_rate, 0.5);
        assert_eq!(rice.average_rating, Some(4.0));
        assert_eq!(rice.crops, vec!["rice"]);
    }
}
