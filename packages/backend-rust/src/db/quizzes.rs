use adaptiq_algo::{running_average, BloomsLevel, ItemParams};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::db::{decode_json, encode_json, now_millis, DatabaseProxy};

/// Target Bloom's level with its selection weight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetBloomsLevel {
    pub level: BloomsLevel,
    pub weight: f64,
}

/// Adaptive termination configuration. Only `fixed-length` is enforced by
/// the response flow; the other criteria are stored for future use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveSettings {
    pub termination_criteria: String,
    pub standard_error_threshold: f64,
    pub confidence_level: f64,
    pub min_questions: u32,
    pub max_questions: u32,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            termination_criteria: "fixed-length".to_string(),
            standard_error_threshold: 0.3,
            confidence_level: 0.95,
            min_questions: 5,
            max_questions: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub topic: String,
    pub created_by: String,
    pub is_adaptive: bool,
    pub initial_difficulty: String,
    pub target_blooms_levels: Vec<TargetBloomsLevel>,
    pub adaptive_settings: AdaptiveSettings,
    pub total_attempts: i64,
    pub average_score: f64,
    pub average_time: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: String,
    pub quiz_id: String,
    pub index: i64,
    pub question_text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: f64,
    pub discrimination: f64,
    pub guessing: f64,
    pub blooms_level: BloomsLevel,
    pub cognitive_complexity: i64,
    pub subject: String,
    pub topic: String,
    pub keywords: Vec<String>,
    pub times_asked: i64,
    pub correct_responses: i64,
    pub average_response_time: f64,
}

impl QuestionRecord {
    pub fn item_params(&self) -> ItemParams {
        ItemParams {
            difficulty: self.difficulty,
            discrimination: self.discrimination,
            guessing: self.guessing,
        }
        .clamped()
    }
}

/// A question as it arrives for insertion (from the upstream generator)
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: f64,
    pub discrimination: f64,
    pub guessing: f64,
    pub blooms_level: BloomsLevel,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub topic: String,
    pub created_by: String,
    pub initial_difficulty: String,
    pub target_blooms_levels: Vec<TargetBloomsLevel>,
    pub adaptive_settings: AdaptiveSettings,
    pub questions: Vec<NewQuestion>,
}

fn map_quiz_row(row: &SqliteRow) -> Result<QuizRecord, sqlx::Error> {
    let targets_raw: String = row.try_get("targetBloomsLevels")?;
    let settings_raw: String = row.try_get("adaptiveSettings")?;
    Ok(QuizRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        subject: row.try_get("subject")?,
        topic: row.try_get("topic")?,
        created_by: row.try_get("createdBy")?,
        is_adaptive: row.try_get::<i64, _>("isAdaptive")? != 0,
        initial_difficulty: row.try_get("initialDifficulty")?,
        target_blooms_levels: decode_json("targetBloomsLevels", &targets_raw)?,
        adaptive_settings: decode_json("adaptiveSettings", &settings_raw)?,
        total_attempts: row.try_get("totalAttempts")?,
        average_score: row.try_get("averageScore")?,
        average_time: row.try_get("averageTime")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

fn map_question_row(row: &SqliteRow) -> Result<QuestionRecord, sqlx::Error> {
    let options_raw: String = row.try_get("options")?;
    let keywords_raw: String = row.try_get("keywords")?;
    let level_raw: String = row.try_get("bloomsLevel")?;
    let blooms_level =
        BloomsLevel::from_str(&level_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "bloomsLevel".to_string(),
            source: format!("unknown blooms level: {level_raw}").into(),
        })?;

    Ok(QuestionRecord {
        id: row.try_get("id")?,
        quiz_id: row.try_get("quizId")?,
        index: row.try_get("idx")?,
        question_text: row.try_get("questionText")?,
        question_type: row.try_get("questionType")?,
        options: decode_json("options", &options_raw)?,
        correct_answer: row.try_get("correctAnswer")?,
        explanation: row.try_get("explanation")?,
        difficulty: row.try_get("difficulty")?,
        discrimination: row.try_get("discrimination")?,
        guessing: row.try_get("guessing")?,
        blooms_level,
        cognitive_complexity: row.try_get("cognitiveComplexity")?,
        subject: row.try_get("subject")?,
        topic: row.try_get("topic")?,
        keywords: decode_json("keywords", &keywords_raw)?,
        times_asked: row.try_get("timesAsked")?,
        correct_responses: row.try_get("correctResponses")?,
        average_response_time: row.try_get("averageResponseTime")?,
    })
}

/// Insert a quiz and its question list in one transaction. Returns the id.
pub async fn insert_quiz(proxy: &DatabaseProxy, quiz: &NewQuiz) -> Result<String, sqlx::Error> {
    let quiz_id = Uuid::new_v4().to_string();
    let now = now_millis();
    let targets = encode_json(&quiz.target_blooms_levels)?;
    let settings = encode_json(&quiz.adaptive_settings)?;

    let mut tx = proxy.pool().begin().await?;

    sqlx::query(
        r#"
        INSERT INTO "quizzes"
          ("id","title","description","subject","topic","createdBy","isAdaptive",
           "initialDifficulty","targetBloomsLevels","adaptiveSettings",
           "totalAttempts","averageScore","averageTime","createdAt","updatedAt")
        VALUES ($1,$2,$3,$4,$5,$6,1,$7,$8,$9,0,0,0,$10,$10)
        "#,
    )
    .bind(&quiz_id)
    .bind(&quiz.title)
    .bind(&quiz.description)
    .bind(&quiz.subject)
    .bind(&quiz.topic)
    .bind(&quiz.created_by)
    .bind(&quiz.initial_difficulty)
    .bind(targets)
    .bind(settings)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (index, question) in quiz.questions.iter().enumerate() {
        let options = encode_json(&question.options)?;
        let keywords = encode_json(&question.keywords)?;
        sqlx::query(
            r#"
            INSERT INTO "questions"
              ("id","quizId","idx","questionText","questionType","options",
               "correctAnswer","explanation","difficulty","discrimination","guessing",
               "bloomsLevel","cognitiveComplexity","subject","topic","keywords",
               "timesAsked","correctResponses","averageResponseTime")
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,0,0,0)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&quiz_id)
        .bind(index as i64)
        .bind(&question.question_text)
        .bind(&question.question_type)
        .bind(options)
        .bind(&question.correct_answer)
        .bind(&question.explanation)
        .bind(question.difficulty)
        .bind(question.discrimination)
        .bind(question.guessing)
        .bind(question.blooms_level.as_str())
        .bind(i64::from(question.blooms_level.complexity()))
        .bind(&quiz.subject)
        .bind(&quiz.topic)
        .bind(keywords)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(quiz_id)
}

pub async fn get_quiz(
    proxy: &DatabaseProxy,
    quiz_id: &str,
) -> Result<Option<QuizRecord>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "quizzes" WHERE "id" = $1"#)
        .bind(quiz_id)
        .fetch_optional(proxy.pool())
        .await?;
    row.as_ref().map(map_quiz_row).transpose()
}

pub async fn list_questions(
    proxy: &DatabaseProxy,
    quiz_id: &str,
) -> Result<Vec<QuestionRecord>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT * FROM "questions" WHERE "quizId" = $1 ORDER BY "idx""#)
        .bind(quiz_id)
        .fetch_all(proxy.pool())
        .await?;
    rows.iter().map(map_question_row).collect()
}

pub async fn get_question(
    proxy: &DatabaseProxy,
    question_id: &str,
) -> Result<Option<QuestionRecord>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "questions" WHERE "id" = $1"#)
        .bind(question_id)
        .fetch_optional(proxy.pool())
        .await?;
    row.as_ref().map(map_question_row).transpose()
}

/// Bump the per-question usage counters with explicit running averages.
pub async fn update_question_usage(
    conn: &mut SqliteConnection,
    question_id: &str,
    is_correct: bool,
    response_time: f64,
) -> Result<(), sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "timesAsked","correctResponses","averageResponseTime"
           FROM "questions" WHERE "id" = $1"#,
    )
    .bind(question_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(());
    };

    let times_asked: i64 = row.try_get("timesAsked")?;
    let correct_responses: i64 = row.try_get("correctResponses")?;
    let old_average: f64 = row.try_get("averageResponseTime")?;

    let n = (times_asked + 1) as u64;
    let new_average = running_average(old_average, n, response_time);

    sqlx::query(
        r#"
        UPDATE "questions"
        SET "timesAsked" = $2, "correctResponses" = $3, "averageResponseTime" = $4
        WHERE "id" = $1
        "#,
    )
    .bind(question_id)
    .bind(times_asked + 1)
    .bind(correct_responses + i64::from(is_correct))
    .bind(new_average)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fold one completed attempt into the quiz-level aggregate counters.
pub async fn update_quiz_analytics(
    conn: &mut SqliteConnection,
    quiz_id: &str,
    score: f64,
    total_time: f64,
) -> Result<(), sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "totalAttempts","averageScore","averageTime" FROM "quizzes" WHERE "id" = $1"#,
    )
    .bind(quiz_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(());
    };

    let attempts: i64 = row.try_get("totalAttempts")?;
    let old_score: f64 = row.try_get("averageScore")?;
    let old_time: f64 = row.try_get("averageTime")?;

    let n = (attempts + 1) as u64;
    let new_score = running_average(old_score, n, score);
    let new_time = running_average(old_time, n, total_time);

    sqlx::query(
        r#"
        UPDATE "quizzes"
        SET "totalAttempts" = $2, "averageScore" = $3, "averageTime" = $4, "updatedAt" = $5
        WHERE "id" = $1
        "#,
    )
    .bind(quiz_id)
    .bind(attempts + 1)
    .bind(new_score)
    .bind(new_time)
    .bind(now_millis())
    .execute(conn)
    .await?;

    Ok(())
}
