//! Canonical pedigree lookups against `chevaux_trotteur_francais`.

use sqlx::PgConnection;
use tracing::error;

use super::SqlResult;
use crate::{DataStoreError, HorseName, PedigreeRecord};

macro_rules! select_pedigree {
    () => {
        r#"
        SELECT id_tf AS id,
               nom_tf AS name,
               sexe_tf AS sex,
               couleur_tf AS color,
               annee_naissance_tf AS birth_year,
               pere_tf AS father,
               mere_tf AS mother,
               date_decee_tf AS death_date,
               naisseur_tf AS breeder,
               lien_ifce_tf AS reference_link
        FROM chevaux_trotteur_francais
        "#
    };
}

fn log_failure(operation: &str, e: sqlx::Error) -> DataStoreError {
    error!(operation, error = %e, "database error reading pedigree");
    e.into()
}

/// Retrieves the canonical record carrying `name`.
///
/// # Returns
/// * `Ok(Some(PedigreeRecord))` - The lowest-id record with this name
/// * `Ok(None)` - No record has this name
/// * `Err(DataStoreError)` - Database error
pub async fn find_by_name(
    conn: &mut PgConnection,
    name: &HorseName,
) -> SqlResult<Option<PedigreeRecord>> {
    sqlx::query_as::<_, PedigreeRecord>(concat!(
        select_pedigree!(),
        "WHERE nom_tf = $1 ORDER BY id_tf LIMIT 1"
    ))
    .bind(name.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| log_failure("find_by_name", e))
}

/// Retrieves the canonical record carrying both `name` and `id`.
pub async fn find_by_name_and_id(
    conn: &mut PgConnection,
    name: &HorseName,
    id: i32,
) -> SqlResult<Option<PedigreeRecord>> {
    sqlx::query_as::<_, PedigreeRecord>(concat!(
        select_pedigree!(),
        "WHERE nom_tf = $1 AND id_tf = $2"
    ))
    .bind(name.as_str())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| log_failure("find_by_name_and_id", e))
}

/// Retrieves the canonical record carrying `name` born between `min_year` and `max_year`
/// inclusive.
pub async fn find_by_name_and_age_window(
    conn: &mut PgConnection,
    name: &HorseName,
    min_year: i32,
    max_year: i32,
) -> SqlResult<Option<PedigreeRecord>> {
    sqlx::query_as::<_, PedigreeRecord>(concat!(
        select_pedigree!(),
        "WHERE nom_tf = $1 AND annee_naissance_tf BETWEEN $2 AND $3 ORDER BY id_tf LIMIT 1"
    ))
    .bind(name.as_str())
    .bind(min_year)
    .bind(max_year)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| log_failure("find_by_name_and_age_window", e))
}

/// Retrieves a canonical record by primary key.
pub async fn find_by_id(conn: &mut PgConnection, id: i32) -> SqlResult<Option<PedigreeRecord>> {
    sqlx::query_as::<_, PedigreeRecord>(concat!(select_pedigree!(), "WHERE id_tf = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| log_failure("find_by_id", e))
}

/// Returns the sex and birth year of `record`, which the table requires.
fn required_columns(record: &PedigreeRecord) -> SqlResult<(&str, i32)> {
    let missing = |column: &str| {
        DataStoreError::Internal(format!("pedigree {} has no {}", record.name, column))
    };
    let sex = record.sex.as_deref().ok_or_else(|| missing("sexe_tf"))?;
    let birth_year = record.birth_year.ok_or_else(|| missing("annee_naissance_tf"))?;
    Ok((sex, birth_year))
}

/// Inserts a canonical record, keeping its id.
///
/// Used to seed databases; the service itself never writes. Records without a sex or birth
/// year are rejected before touching the database.
pub async fn insert(conn: &mut PgConnection, record: &PedigreeRecord) -> SqlResult<()> {
    let (sex, birth_year) = required_columns(record)?;
    sqlx::query(
        r#"
        INSERT INTO chevaux_trotteur_francais
            (id_tf, nom_tf, sexe_tf, couleur_tf, annee_naissance_tf, pere_tf, mere_tf,
             date_decee_tf, naisseur_tf, lien_ifce_tf)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(record.id)
    .bind(record.name.trim().to_uppercase())
    .bind(sex)
    .bind(record.color.as_deref())
    .bind(birth_year)
    .bind(record.father.as_deref())
    .bind(record.mother.as_deref())
    .bind(record.death_date)
    .bind(record.breeder.as_deref())
    .bind(record.reference_link.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| log_failure("insert", e))?;
    Ok(())
}
