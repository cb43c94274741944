use adaptiq_algo::{running_average, BloomsProgress, ABILITY_MAX, ABILITY_MIN};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::{decode_json, encode_json, now_millis, DatabaseProxy};

/// Per-subject ability snapshot kept on the profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPerformance {
    pub subject: String,
    pub ability_level: f64,
    pub blooms_progress: BloomsProgress,
    pub last_updated: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileRecord {
    pub user_id: String,
    pub ability_level: f64,
    pub blooms_levels: BloomsProgress,
    pub subject_performance: Vec<SubjectPerformance>,
    pub total_quizzes_taken: i64,
    pub average_score: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

fn map_row(row: &SqliteRow) -> Result<StudentProfileRecord, sqlx::Error> {
    let blooms_raw: String = row.try_get("bloomsLevels")?;
    let subjects_raw: String = row.try_get("subjectPerformance")?;
    Ok(StudentProfileRecord {
        user_id: row.try_get("userId")?,
        ability_level: row.try_get("abilityLevel")?,
        blooms_levels: decode_json("bloomsLevels", &blooms_raw)?,
        subject_performance: decode_json("subjectPerformance", &subjects_raw)?,
        total_quizzes_taken: row.try_get("totalQuizzesTaken")?,
        average_score: row.try_get("averageScore")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

pub async fn get_profile(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Option<StudentProfileRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "userId","abilityLevel","bloomsLevels","subjectPerformance",
               "totalQuizzesTaken","averageScore","createdAt","updatedAt"
        FROM "student_profiles"
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(proxy.pool())
    .await?;

    row.as_ref().map(map_row).transpose()
}

/// Fetch the profile, creating a default one on first contact.
pub async fn get_or_create_profile(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<StudentProfileRecord, sqlx::Error> {
    if let Some(profile) = get_profile(proxy, user_id).await? {
        return Ok(profile);
    }

    let now = now_millis();
    let blooms = encode_json(&BloomsProgress::default())?;
    let subjects = encode_json(&Vec::<SubjectPerformance>::new())?;

    sqlx::query(
        r#"
        INSERT INTO "student_profiles"
          ("userId","abilityLevel","bloomsLevels","subjectPerformance",
           "totalQuizzesTaken","averageScore","createdAt","updatedAt")
        VALUES ($1, 0, $2, $3, 0, 0, $4, $4)
        ON CONFLICT ("userId") DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(blooms)
    .bind(subjects)
    .bind(now)
    .execute(proxy.pool())
    .await?;

    Ok(StudentProfileRecord {
        user_id: user_id.to_string(),
        ability_level: 0.0,
        blooms_levels: BloomsProgress::default(),
        subject_performance: Vec::new(),
        total_quizzes_taken: 0,
        average_score: 0.0,
        created_at: now,
        updated_at: now,
    })
}

/// Persist the post-response ability and Bloom's progress. Runs inside the
/// attempt transaction so the profile never drifts from the response log.
pub async fn save_ability(
    conn: &mut SqliteConnection,
    user_id: &str,
    ability_level: f64,
    blooms_levels: &BloomsProgress,
    subject_performance: &[SubjectPerformance],
) -> Result<(), sqlx::Error> {
    let ability = ability_level.clamp(ABILITY_MIN, ABILITY_MAX);
    let blooms = encode_json(blooms_levels)?;
    let subjects = encode_json(&subject_performance)?;

    sqlx::query(
        r#"
        UPDATE "student_profiles"
        SET "abilityLevel" = $2,
            "bloomsLevels" = $3,
            "subjectPerformance" = $4,
            "updatedAt" = $5
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .bind(ability)
    .bind(blooms)
    .bind(subjects)
    .bind(now_millis())
    .execute(conn)
    .await?;

    Ok(())
}

/// Fold a completed quiz score into the profile's running aggregate.
pub async fn record_quiz_completion(
    conn: &mut SqliteConnection,
    user_id: &str,
    score: f64,
) -> Result<(), sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "totalQuizzesTaken","averageScore" FROM "student_profiles" WHERE "userId" = $1"#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(());
    };

    let taken: i64 = row.try_get("totalQuizzesTaken")?;
    let old_average: f64 = row.try_get("averageScore")?;
    let n = (taken + 1) as u64;
    let new_average = running_average(old_average, n, score);

    sqlx::query(
        r#"
        UPDATE "student_profiles"
        SET "totalQuizzesTaken" = $2, "averageScore" = $3, "updatedAt" = $4
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .bind(taken + 1)
    .bind(new_average)
    .bind(now_millis())
    .execute(conn)
    .await?;

    Ok(())
}
