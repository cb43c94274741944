use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS "student_profiles" (
      "userId"             TEXT PRIMARY KEY,
      "abilityLevel"       REAL NOT NULL DEFAULT 0,
      "bloomsLevels"       TEXT NOT NULL,
      "subjectPerformance" TEXT NOT NULL,
      "totalQuizzesTaken"  INTEGER NOT NULL DEFAULT 0,
      "averageScore"       REAL NOT NULL DEFAULT 0,
      "createdAt"          INTEGER NOT NULL,
      "updatedAt"          INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "quizzes" (
      "id"                 TEXT PRIMARY KEY,
      "title"              TEXT NOT NULL,
      "description"        TEXT NOT NULL DEFAULT '',
      "subject"            TEXT NOT NULL,
      "topic"              TEXT NOT NULL DEFAULT '',
      "createdBy"          TEXT NOT NULL,
      "isAdaptive"         INTEGER NOT NULL DEFAULT 1,
      "initialDifficulty"  TEXT NOT NULL DEFAULT 'medium',
      "targetBloomsLevels" TEXT NOT NULL,
      "adaptiveSettings"   TEXT NOT NULL,
      "totalAttempts"      INTEGER NOT NULL DEFAULT 0,
      "averageScore"       REAL NOT NULL DEFAULT 0,
      "averageTime"        REAL NOT NULL DEFAULT 0,
      "createdAt"          INTEGER NOT NULL,
      "updatedAt"          INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "questions" (
      "id"                  TEXT PRIMARY KEY,
      "quizId"              TEXT NOT NULL,
      "idx"                 INTEGER NOT NULL,
      "questionText"        TEXT NOT NULL,
      "questionType"        TEXT NOT NULL DEFAULT 'multiple-choice',
      "options"             TEXT NOT NULL,
      "correctAnswer"       TEXT NOT NULL DEFAULT '',
      "explanation"         TEXT NOT NULL DEFAULT '',
      "difficulty"          REAL NOT NULL,
      "discrimination"      REAL NOT NULL DEFAULT 1,
      "guessing"            REAL NOT NULL DEFAULT 0,
      "bloomsLevel"         TEXT NOT NULL,
      "cognitiveComplexity" INTEGER NOT NULL,
      "subject"             TEXT NOT NULL DEFAULT '',
      "topic"               TEXT NOT NULL DEFAULT '',
      "keywords"            TEXT NOT NULL,
      "timesAsked"          INTEGER NOT NULL DEFAULT 0,
      "correctResponses"    INTEGER NOT NULL DEFAULT 0,
      "averageResponseTime" REAL NOT NULL DEFAULT 0
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS "questions_quiz_idx" ON "questions" ("quizId", "idx")"#,
    r#"
    CREATE TABLE IF NOT EXISTS "quiz_attempts" (
      "id"                TEXT PRIMARY KEY,
      "userId"            TEXT NOT NULL,
      "quizId"            TEXT NOT NULL,
      "status"            TEXT NOT NULL DEFAULT 'in-progress',
      "startTime"         INTEGER NOT NULL,
      "endTime"           INTEGER,
      "totalTime"         REAL,
      "score"             REAL,
      "isPassed"          INTEGER,
      "correctAnswers"    INTEGER NOT NULL DEFAULT 0,
      "totalQuestions"    INTEGER NOT NULL DEFAULT 0,
      "initialAbility"    REAL NOT NULL DEFAULT 0,
      "finalAbility"      REAL NOT NULL DEFAULT 0,
      "abilityChange"     REAL NOT NULL DEFAULT 0,
      "bloomsPerformance" TEXT NOT NULL,
      "feedback"          TEXT,
      "createdAt"         INTEGER NOT NULL,
      "updatedAt"         INTEGER NOT NULL
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS "attempts_user_quiz_status_idx" ON "quiz_attempts" ("userId", "quizId", "status")"#,
    r#"
    CREATE TABLE IF NOT EXISTS "attempt_responses" (
      "id"                  TEXT PRIMARY KEY,
      "attemptId"           TEXT NOT NULL,
      "seq"                 INTEGER NOT NULL,
      "questionId"          TEXT NOT NULL,
      "userAnswer"          TEXT NOT NULL,
      "correctAnswer"       TEXT NOT NULL DEFAULT '',
      "isCorrect"           INTEGER NOT NULL,
      "responseTime"        REAL NOT NULL DEFAULT 0,
      "difficulty"          REAL NOT NULL DEFAULT 0,
      "bloomsLevel"         TEXT NOT NULL,
      "expectedProbability" REAL NOT NULL,
      "abilityEstimate"     REAL NOT NULL,
      "createdAt"           INTEGER NOT NULL
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS "responses_attempt_idx" ON "attempt_responses" ("attemptId", "seq")"#,
];

pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
