//! Race and meeting rows in `programmes_des_courses`, `reunion` and `courses`.
//!
//! The service reads races only through the participation join; these inserts exist to seed
//! databases.

use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::error;

use super::SqlResult;
use crate::{DataStoreError, Race};

fn log_failure(operation: &str, e: sqlx::Error) -> DataStoreError {
    error!(operation, error = %e, "database error writing races");
    e.into()
}

/// Inserts a race programme and one meeting on it.
pub async fn insert_meeting(
    conn: &mut PgConnection,
    programme_id: i32,
    date: NaiveDate,
    meeting_id: &str,
) -> SqlResult<()> {
    sqlx::query(
        r#"
        INSERT INTO programmes_des_courses (id_programme, date_programme)
        VALUES ($1, $2)
        ON CONFLICT (id_programme) DO NOTHING
        "#,
    )
    .bind(programme_id)
    .bind(date)
    .execute(&mut *conn)
    .await
    .map_err(|e| log_failure("insert_programme", e))?;

    sqlx::query(
        r#"
        INSERT INTO reunion (id_reunion, id_programme)
        VALUES ($1, $2)
        ON CONFLICT (id_reunion) DO NOTHING
        "#,
    )
    .bind(meeting_id)
    .bind(programme_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| log_failure("insert_meeting", e))?;
    Ok(())
}

/// Inserts a race held at `meeting_id`.
pub async fn insert(conn: &mut PgConnection, race: &Race, meeting_id: &str) -> SqlResult<()> {
    let [first, second, third, fourth, fifth] = race.prizes;
    sqlx::query(
        r#"
        INSERT INTO courses
            (id_course, id_reunion, libelle, distance, distance_unit,
             montant_offert_1er, montant_offert_2eme, montant_offert_3eme,
             montant_offert_4eme, montant_offert_5eme)
        VALUES ($1, $2, $3, $4, 'm', $5, $6, $7, $8, $9)
        "#,
    )
    .bind(race.id)
    .bind(meeting_id)
    .bind(race.label.as_deref())
    .bind(race.distance)
    .bind(first)
    .bind(second)
    .bind(third)
    .bind(fourth)
    .bind(fifth)
    .execute(&mut *conn)
    .await
    .map_err(|e| log_failure("insert", e))?;
    Ok(())
}
