use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite};
use time::OffsetDateTime;

use super::dto::GlucoseReadings;
use crate::db::{RecordId, RecordStore};

/// One immutable set of readings as stored.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ReadingSnapshot {
    pub id: RecordId,
    pub user_id: String,
    pub fasting_sugar: f64,
    pub pre_meal_sugar: f64,
    pub post_meal_sugar: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ReadingSnapshot {
    pub fn readings(&self) -> GlucoseReadings {
        GlucoseReadings {
            fasting: self.fasting_sugar,
            pre_meal: self.pre_meal_sugar,
            post_meal: self.post_meal_sugar,
        }
    }
}

pub(crate) async fn insert_reading<'c, E>(
    executor: E,
    user_id: &str,
    readings: &GlucoseReadings,
    at: OffsetDateTime,
) -> Result<ReadingSnapshot, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, ReadingSnapshot>(
        r#"
        INSERT INTO readings (user_id, fasting_sugar, pre_meal_sugar, post_meal_sugar, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, user_id, fasting_sugar, pre_meal_sugar, post_meal_sugar, created_at
        "#,
    )
    .bind(user_id)
    .bind(readings.fasting)
    .bind(readings.pre_meal)
    .bind(readings.post_meal)
    .bind(at)
    .fetch_one(executor)
    .await
}

impl RecordStore {
    /// Appends a snapshot; snapshots are never updated.
    pub async fn save_reading(
        &self,
        user_id: &str,
        readings: &GlucoseReadings,
        at: OffsetDateTime,
    ) -> Result<ReadingSnapshot, sqlx::Error> {
        let snapshot = insert_reading(&self.pool, user_id, readings, at).await?;
        tracing::debug!(user_id, id = snapshot.id, "reading saved");
        Ok(snapshot)
    }

    /// Most recent first.
    pub async fn recent_readings(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ReadingSnapshot>, sqlx::Error> {
        sqlx::query_as::<_, ReadingSnapshot>(
            r#"
            SELECT id, user_id, fasting_sugar, pre_meal_sugar, post_meal_sugar, created_at
            FROM readings
            WHERE user_id = ?1
            ORDER BY julianday(created_at) DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
    }

    /// The latest `limit` snapshots, oldest first, for charting.
    pub async fn reading_series(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ReadingSnapshot>, sqlx::Error> {
        let mut rows = self.recent_readings(user_id, limit).await?;
        rows.reverse();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn readings(fasting: f64) -> GlucoseReadings {
        GlucoseReadings {
            fasting,
            pre_meal: 100.0,
            post_meal: 150.0,
        }
    }

    #[tokio::test]
    async fn recent_readings_are_newest_first_and_limited() {
        let store = RecordStore::open_in_memory().await.unwrap();
        for (i, at) in [
            datetime!(2024-01-01 08:00 UTC),
            datetime!(2024-01-03 08:00 UTC),
            datetime!(2024-01-02 08:00 UTC),
        ]
        .into_iter()
        .enumerate()
        {
            store
                .save_reading("alice", &readings(100.0 + i as f64), at)
                .await
                .unwrap();
        }

        let recent = store.recent_readings("alice", 2).await.unwrap();
        let days: Vec<u8> = recent.iter().map(|r| r.created_at.day()).collect();
        assert_eq!(days, vec![3, 2]);
    }

    #[tokio::test]
    async fn sub_second_timestamps_order_correctly() {
        let store = RecordStore::open_in_memory().await.unwrap();
        store
            .save_reading("alice", &readings(101.0), datetime!(2024-01-01 08:00:00.5 UTC))
            .await
            .unwrap();
        store
            .save_reading("alice", &readings(100.0), datetime!(2024-01-01 08:00:00 UTC))
            .await
            .unwrap();

        let recent = store.recent_readings("alice", 7).await.unwrap();
        assert_eq!(recent[0].fasting_sugar, 101.0);
    }

    #[tokio::test]
    async fn readings_are_scoped_per_user() {
        let store = RecordStore::open_in_memory().await.unwrap();
        let at = datetime!(2024-01-01 08:00 UTC);
        store.save_reading("alice", &readings(100.0), at).await.unwrap();
        store.save_reading("bob", &readings(200.0), at).await.unwrap();

        let alice = store.recent_readings("alice", 7).await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].readings(), readings(100.0));
    }

    #[tokio::test]
    async fn series_is_oldest_first() {
        let store = RecordStore::open_in_memory().await.unwrap();
        store
            .save_reading("alice", &readings(110.0), datetime!(2024-02-01 08:00 UTC))
            .await
            .unwrap();
        store
            .save_reading("alice", &readings(120.0), datetime!(2024-02-02 08:00 UTC))
            .await
            .unwrap();

        let series = store.reading_series("alice", 7).await.unwrap();
        let values: Vec<f64> = series.iter().map(|r| r.fasting_sugar).collect();
        assert_eq!(values, vec![110.0, 120.0]);
    }
}
