use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Submission;

/// Insert a record unless its id already exists in the collection.
/// Returns `None` when the id was taken.
pub async fn insert_if_absent(
    pool: &PgPool,
    collection: &str,
    submission: &Submission,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "INSERT INTO submissions (collection, id, name, age, profession, experience, submitted_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (collection, id) DO NOTHING
         RETURNING id, name, age, profession, experience, submitted_at",
    )
    .bind(collection)
    .bind(submission.id)
    .bind(&submission.name)
    .bind(&submission.age)
    .bind(&submission.profession)
    .bind(&submission.experience)
    .bind(submission.timestamp)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    collection: &str,
    id: Uuid,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT id, name, age, profession, experience, submitted_at
         FROM submissions WHERE collection = $1 AND id = $2",
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Keyset page ordered by id.
pub async fn list_after(
    pool: &PgPool,
    collection: &str,
    after: Option<Uuid>,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "SELECT id, name, age, profession, experience, submitted_at
         FROM submissions
         WHERE collection = $1 AND ($2::uuid IS NULL OR id > $2)
         ORDER BY id ASC
         LIMIT $3",
    )
    .bind(collection)
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await
}
