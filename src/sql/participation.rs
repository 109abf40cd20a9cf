//! Race participation lookups against `participations_aux_courses`.

use sqlx::PgConnection;
use tracing::error;

use super::SqlResult;
use crate::{DataStoreError, HorseName, ParticipationRecord, RaceResult};

fn log_failure(operation: &str, e: sqlx::Error) -> DataStoreError {
    error!(operation, error = %e, "database error reading participations");
    e.into()
}

/// Retrieves the most recent participation for `name`.
///
/// Recency is the participation id, not the race date: ids grow with insertion order while
/// dates are not guaranteed to.
pub async fn find_latest_by_name(
    conn: &mut PgConnection,
    name: &HorseName,
) -> SqlResult<Option<ParticipationRecord>> {
    sqlx::query_as::<_, ParticipationRecord>(
        r#"
        SELECT id_participation AS participation_id,
               id_course AS race_id,
               nom AS name,
               sexe AS sex,
               race AS breed,
               libelle_long_robe AS coat,
               nombre_courses AS race_count,
               nom_pere AS father,
               nom_mere AS mother,
               place_dans_la_course AS place,
               temps_obtenu_en_minute AS finish_time
        FROM participations_aux_courses
        WHERE nom = $1
        ORDER BY id_participation DESC
        LIMIT 1
        "#,
    )
    .bind(name.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| log_failure("find_latest_by_name", e))
}

/// Counts the participations stored for `name`.
pub async fn count_by_name(conn: &mut PgConnection, name: &HorseName) -> SqlResult<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM participations_aux_courses
        WHERE nom = $1
        "#,
    )
    .bind(name.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| log_failure("count_by_name", e))
}

/// Lists every participation of `name` joined with its race.
pub async fn list_results_by_name(
    conn: &mut PgConnection,
    name: &HorseName,
) -> SqlResult<Vec<RaceResult>> {
    sqlx::query_as::<_, RaceResult>(
        r#"
        SELECT p.id_participation AS participation_id,
               c.id_course AS race_id,
               c.distance AS distance,
               p.temps_obtenu_en_minute AS finish_time,
               p.place_dans_la_course AS place,
               c.montant_offert_1er AS prize_first,
               c.montant_offert_2eme AS prize_second,
               c.montant_offert_3eme AS prize_third,
               c.montant_offert_4eme AS prize_fourth,
               c.montant_offert_5eme AS prize_fifth
        FROM courses c
        JOIN participations_aux_courses p ON c.id_course = p.id_course
        WHERE p.nom = $1
        ORDER BY p.id_participation
        "#,
    )
    .bind(name.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| log_failure("list_results_by_name", e))
}

/// Inserts a participation, keeping its id. The referenced race must exist.
pub async fn insert(conn: &mut PgConnection, record: &ParticipationRecord) -> SqlResult<()> {
    sqlx::query(
        r#"
        INSERT INTO participations_aux_courses
            (id_participation, id_course, nom, sexe, race, libelle_long_robe, nombre_courses,
             nom_pere, nom_mere, place_dans_la_course, temps_obtenu_en_minute)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(record.participation_id)
    .bind(record.race_id)
    .bind(record.name.trim().to_uppercase())
    .bind(record.sex.as_deref())
    .bind(record.breed.as_deref())
    .bind(record.coat.as_deref())
    .bind(record.race_count)
    .bind(record.father.as_deref())
    .bind(record.mother.as_deref())
    .bind(record.place)
    .bind(record.finish_time.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| log_failure("insert", e))?;
    Ok(())
}
