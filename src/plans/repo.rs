use serde::Serialize;
use sqlx::{Executor, FromRow, Sqlite};
use time::{OffsetDateTime, UtcOffset};

use crate::db::{RecordId, RecordStore};
use crate::readings::dto::GlucoseReadings;
use crate::readings::repo::{insert_reading, ReadingSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct MealPlanRecord {
    pub id: RecordId,
    pub user_id: String,
    pub plan_text: String,
    pub preference: Option<String>,
    pub is_favorite: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// How a single plan is addressed for deletion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanSelector {
    Id(RecordId),
    /// Every plan of the user stored at exactly this instant.
    At(OffsetDateTime),
}

/// A new plan row before insertion.
#[derive(Debug, Clone)]
pub struct NewPlan<'a> {
    pub plan_text: &'a str,
    pub preference: Option<&'a str>,
    pub is_favorite: bool,
}

async fn insert_plan<'c, E>(
    executor: E,
    user_id: &str,
    plan: &NewPlan<'_>,
    at: OffsetDateTime,
) -> Result<MealPlanRecord, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, MealPlanRecord>(
        r#"
        INSERT INTO meal_plans (user_id, plan_text, preference, is_favorite, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, user_id, plan_text, preference, is_favorite, created_at
        "#,
    )
    .bind(user_id)
    .bind(plan.plan_text)
    .bind(plan.preference)
    .bind(plan.is_favorite)
    .bind(at)
    .fetch_one(executor)
    .await
}

impl RecordStore {
    /// Appends a plan.
    pub async fn save_plan(
        &self,
        user_id: &str,
        plan: &NewPlan<'_>,
        at: OffsetDateTime,
    ) -> Result<MealPlanRecord, sqlx::Error> {
        let record = insert_plan(&self.pool, user_id, plan, at).await?;
        tracing::debug!(user_id, id = record.id, "plan saved");
        Ok(record)
    }

    /// Writes a snapshot and the plan it produced together. The plan is never
    /// stamped earlier than its snapshot, and a failed plan insert rolls the
    /// snapshot back.
    pub async fn save_generation(
        &self,
        user_id: &str,
        readings: &GlucoseReadings,
        plan: &NewPlan<'_>,
        at: OffsetDateTime,
    ) -> Result<(ReadingSnapshot, MealPlanRecord), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let snapshot = insert_reading(&mut *tx, user_id, readings, at).await?;
        let plan_at = OffsetDateTime::now_utc().max(snapshot.created_at);
        let record = insert_plan(&mut *tx, user_id, plan, plan_at).await?;
        tx.commit().await?;
        tracing::info!(
            user_id,
            reading_id = snapshot.id,
            plan_id = record.id,
            "generation persisted"
        );
        Ok((snapshot, record))
    }

    /// Sets the favorite flag on one plan addressed by id.
    /// Returns `false` when the user has no such plan.
    pub async fn set_favorite(
        &self,
        user_id: &str,
        id: RecordId,
        favorite: bool,
    ) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE meal_plans SET is_favorite = ?1 WHERE id = ?2 AND user_id = ?3")
            .bind(favorite)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn mark_favorite(&self, user_id: &str, id: RecordId) -> Result<bool, sqlx::Error> {
        self.set_favorite(user_id, id, true).await
    }

    /// Favorites the user's most recent plan. Plans sharing the newest
    /// timestamp are disambiguated by insertion order: only the last inserted
    /// one is marked. Prefer [`RecordStore::mark_favorite`] with the id
    /// returned at creation.
    pub async fn mark_latest_favorite(
        &self,
        user_id: &str,
    ) -> Result<Option<RecordId>, sqlx::Error> {
        let id: Option<RecordId> = sqlx::query_scalar(
            r#"
            UPDATE meal_plans SET is_favorite = 1
            WHERE id = (
                SELECT id FROM meal_plans
                WHERE user_id = ?1
                ORDER BY julianday(created_at) DESC, id DESC
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Returns the number of plans removed.
    pub async fn delete_plan(
        &self,
        user_id: &str,
        selector: PlanSelector,
    ) -> Result<u64, sqlx::Error> {
        let res = match selector {
            PlanSelector::Id(id) => {
                sqlx::query("DELETE FROM meal_plans WHERE id = ?1 AND user_id = ?2")
                    .bind(id)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            PlanSelector::At(at) => {
                sqlx::query(
                    "DELETE FROM meal_plans WHERE user_id = ?1 AND julianday(created_at) = julianday(?2)",
                )
                .bind(user_id)
                .bind(at.to_offset(UtcOffset::UTC))
                .execute(&self.pool)
                .await?
            }
        };
        Ok(res.rows_affected())
    }

    /// Most recent first.
    pub async fn all_plans(&self, user_id: &str) -> Result<Vec<MealPlanRecord>, sqlx::Error> {
        sqlx::query_as::<_, MealPlanRecord>(
            r#"
            SELECT id, user_id, plan_text, preference, is_favorite, created_at
            FROM meal_plans
            WHERE user_id = ?1
            ORDER BY julianday(created_at) DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn favorite_plans(&self, user_id: &str) -> Result<Vec<MealPlanRecord>, sqlx::Error> {
        sqlx::query_as::<_, MealPlanRecord>(
            r#"
            SELECT id, user_id, plan_text, preference, is_favorite, created_at
            FROM meal_plans
            WHERE user_id = ?1 AND is_favorite = 1
            ORDER BY julianday(created_at) DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn plan(text: &str) -> NewPlan<'_> {
        NewPlan {
            plan_text: text,
            preference: Some("vegetarian"),
            is_favorite: false,
        }
    }

    fn readings() -> GlucoseReadings {
        GlucoseReadings {
            fasting: 140.0,
            pre_meal: 150.0,
            post_meal: 190.0,
        }
    }

    async fn store() -> RecordStore {
        RecordStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn mark_latest_favorite_only_touches_newest_plan() {
        let store = store().await;
        let p1 = store
            .save_plan("alice", &plan("P1"), datetime!(2024-01-01 00:00:01 UTC))
            .await
            .unwrap();
        let p2 = store
            .save_plan("alice", &plan("P2"), datetime!(2024-01-01 00:00:02 UTC))
            .await
            .unwrap();

        assert_eq!(store.mark_latest_favorite("alice").await.unwrap(), Some(p2.id));

        let plans = store.all_plans("alice").await.unwrap();
        let flags: Vec<(RecordId, bool)> = plans.iter().map(|p| (p.id, p.is_favorite)).collect();
        assert_eq!(flags, vec![(p2.id, true), (p1.id, false)]);
    }

    #[tokio::test]
    async fn mark_latest_favorite_with_duplicate_timestamps_picks_last_inserted() {
        let store = store().await;
        let at = datetime!(2024-01-01 12:00 UTC);
        let first = store.save_plan("alice", &plan("first"), at).await.unwrap();
        let second = store.save_plan("alice", &plan("second"), at).await.unwrap();

        assert_eq!(store.mark_latest_favorite("alice").await.unwrap(), Some(second.id));
        let favs = store.favorite_plans("alice").await.unwrap();
        assert_eq!(favs.len(), 1);
        assert_ne!(favs[0].id, first.id);
    }

    #[tokio::test]
    async fn mark_latest_favorite_without_plans_is_none() {
        let store = store().await;
        assert_eq!(store.mark_latest_favorite("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn favorite_by_id_is_scoped_to_owner() {
        let store = store().await;
        let p = store
            .save_plan("alice", &plan("P1"), datetime!(2024-01-01 00:00 UTC))
            .await
            .unwrap();

        assert!(!store.mark_favorite("bob", p.id).await.unwrap());
        assert!(store.mark_favorite("alice", p.id).await.unwrap());
        assert!(store.set_favorite("alice", p.id, false).await.unwrap());
        assert!(store.favorite_plans("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_by_id_and_by_timestamp() {
        let store = store().await;
        let t1 = datetime!(2024-03-01 10:00 UTC);
        let t2 = datetime!(2024-03-02 10:00 UTC);
        let p1 = store.save_plan("alice", &plan("P1"), t1).await.unwrap();
        store.save_plan("alice", &plan("P2"), t2).await.unwrap();

        assert_eq!(store.delete_plan("alice", PlanSelector::Id(p1.id)).await.unwrap(), 1);
        assert_eq!(store.delete_plan("alice", PlanSelector::Id(p1.id)).await.unwrap(), 0);

        let t2_other_offset = t2.to_offset(time::macros::offset!(+2));
        assert_eq!(
            store
                .delete_plan("alice", PlanSelector::At(t2_other_offset))
                .await
                .unwrap(),
            1
        );
        assert!(store.all_plans("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_generation_stamps_plan_not_before_reading() {
        let store = store().await;
        let future = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let (snapshot, record) = store
            .save_generation("alice", &readings(), &plan("Plan A"), future)
            .await
            .unwrap();
        assert!(snapshot.created_at <= record.created_at);
        assert_eq!(record.preference.as_deref(), Some("vegetarian"));
    }

    #[tokio::test]
    async fn reset_all_clears_every_user() {
        let store = store().await;
        let now = OffsetDateTime::now_utc();
        for user in ["alice", "bob"] {
            store
                .save_generation(user, &readings(), &plan("Plan"), now)
                .await
                .unwrap();
        }

        store.reset_all().await.unwrap();

        for user in ["alice", "bob"] {
            assert!(store.recent_readings(user, 7).await.unwrap().is_empty());
            assert!(store.all_plans(user).await.unwrap().is_empty());
        }
    }
}
