//! End-to-end adaptive quiz flow against a stub AI collaborator.
//!
//! The flow test runs as a single test function: the stub's address goes
//! into process-global env vars, so parallel tests would race on it.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn spawn_stub_ai() -> std::net::SocketAddr {
    let app = Router::new().route("/api/process", post(process));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub AI listener");
    let addr = listener.local_addr().expect("stub AI local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub AI server");
    });
    addr
}

async fn process(Json(payload): Json<Value>) -> Json<Value> {
    let data = match payload["type"].as_str() {
        Some("quiz/adaptive/generate") => generate_payload(&payload["data"]),
        Some("quiz/adaptive/response") => grade_payload(&payload["data"]),
        Some("quiz/adaptive/analyze") => json!({
            "bloomsAnalysis": { "strongest": "apply" },
            "recommendations": ["practice analysis questions"],
            "nextSteps": ["attempt a harder quiz"],
        }),
        _ => return Json(json!({ "success": false, "message": "unknown type" })),
    };
    Json(json!({ "success": true, "data": data }))
}

fn generate_payload(data: &Value) -> Value {
    let num = data["numQuestions"].as_u64().unwrap_or(10);
    let questions: Vec<Value> = (0..num)
        .map(|i| {
            json!({
                "text": format!("Question {i}"),
                "type": "multiple-choice",
                "options": ["correct", "wrong-a", "wrong-b", "wrong-c"],
                "correctAnswer": "correct",
                "explanation": "because",
                "difficulty": 0.0,
                "bloomsLevel": "apply",
            })
        })
        .collect();
    json!({ "title": "Stub Quiz", "questions": questions })
}

fn grade_payload(data: &Value) -> Value {
    let is_correct = data["answer"].as_str() == Some("correct");
    json!({ "isCorrect": is_correct, "correctAnswer": "correct" })
}

async fn post_json(app: &Router, uri: &str, auth: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("authorization", auth)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_full_adaptive_quiz_flow() {
    let addr = spawn_stub_ai().await;
    std::env::set_var("AI_SERVICE_URL", format!("http://{addr}/api"));

    let app = common::create_test_app().await;
    let auth = common::bearer_token("student-flow", "user");

    // Generate a 10-question quiz through the stub
    let (status, body) = post_json(
        &app,
        "/api/quiz/adaptive/generate",
        &auth,
        json!({ "subject": "math", "topic": "algebra", "numQuestions": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["totalQuestions"], json!(10));

    let quiz_id = body["data"]["quizId"].as_str().unwrap().to_string();
    let question_ids: Vec<String> = body["data"]["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(question_ids.len(), 10);

    // Answer 7 correctly and 3 incorrectly
    let mut last = Value::Null;
    for (i, question_id) in question_ids.iter().enumerate() {
        let answer = if i < 7 { "correct" } else { "wrong-a" };
        let (status, body) = post_json(
            &app,
            "/api/quiz/adaptive/response",
            &auth,
            json!({
                "quizId": quiz_id,
                "questionId": question_id,
                "answer": answer,
                "responseTime": 4.2,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isCorrect"], json!(i < 7));
        last = body;
    }

    // Ability should have moved up from the default of 0 after 7/10
    let final_ability = last["data"]["updatedAbility"].as_f64().unwrap();
    assert!(final_ability > 0.0);
    assert_eq!(last["data"]["currentScore"], json!(70.0));

    // Complete: 70% is exactly the pass threshold
    let (status, body) = post_json(
        &app,
        "/api/quiz/adaptive/complete",
        &auth,
        json!({ "quizId": quiz_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["score"], json!(70.0));
    assert_eq!(body["data"]["summary"]["isPassed"], json!(true));
    assert_eq!(body["data"]["summary"]["correctAnswers"], json!(7));
    assert_eq!(body["data"]["attempt"]["status"], json!("completed"));
    assert_eq!(
        body["data"]["analysis"]["recommendations"][0],
        json!("practice analysis questions")
    );

    // A second completion has no in-progress attempt to act on
    let (status, _) = post_json(
        &app,
        "/api/quiz/adaptive/complete",
        &auth,
        json!({ "quizId": quiz_id }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Profile reflects the completed quiz
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/profile")
                .header("authorization", auth.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let profile: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(profile["data"]["totalQuizzesTaken"], json!(1));
    assert_eq!(profile["data"]["averageScore"], json!(70.0));
    assert!(profile["data"]["abilityLevel"].as_f64().unwrap() > 0.0);

    // Creator can read quiz analytics for the finished attempt
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/quiz/{quiz_id}/analytics"))
                .header("authorization", auth.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let analytics: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(analytics["data"]["aggregate"]["totalAttempts"], json!(1));
    assert_eq!(analytics["data"]["aggregate"]["passRate"], json!(1.0));

    // A different non-admin user is refused analytics
    let other_auth = common::bearer_token("student-other", "user");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/quiz/{quiz_id}/analytics"))
                .header("authorization", other_auth.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
