use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Student;

pub(crate) const COLUMNS: &str = "id, account_id, full_name, organization, class_name, created_at";

pub(crate) async fn find_by_account(
    pool: &PgPool,
    account_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE account_id = $1"))
        .bind(account_id)
        .fetch_optional(pool)
        .await
}

/// Student ids matching the roster filter. `None` leaves that field unconstrained.
pub(crate) async fn list_roster_ids(
    pool: &PgPool,
    organization: Option<&str>,
    class_name: Option<&str>,
) -> Result<Vec<String>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM students WHERE TRUE");

    if let Some(organization) = organization {
        builder.push(" AND organization = ");
        builder.push_bind(organization);
    }
    if let Some(class_name) = class_name {
        builder.push(" AND class_name = ");
        builder.push_bind(class_name);
    }

    builder.push(" ORDER BY id");
    builder.build_query_scalar::<String>().fetch_all(pool).await
}

pub(crate) async fn existing_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM students WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}
