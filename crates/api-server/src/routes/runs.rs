//! Run API routes
//!
//! Each handler resolves a store, performs one runtime call and returns the
//! run as stored. Store credentials may ride along in the body (or query for
//! GET); environment values take priority.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use relay_core::agent::AgentDefinition;
use relay_core::run::Run;
use relay_core::store::StoreConfig;

use super::{missing_fields, required, run_not_found, runtime_error, store_error, RouteError};
use crate::state::AppState;

/// Agent fields shared by every request that advances a run
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentFields {
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
}

impl AgentFields {
    fn definition(&self) -> Option<AgentDefinition> {
        let agent_id = required(&self.agent_id)?;
        let model = required(&self.model)?;
        let mut def = AgentDefinition::new(agent_id, model);
        if let Some(prompt) = &self.system_prompt {
            def = def.with_system_prompt(prompt.as_str());
        }
        Some(def)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRunRequest {
    #[serde(flatten)]
    agent: AgentFields,
    #[serde(default)]
    user_input: Option<String>,
    #[serde(flatten)]
    store: StoreConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResumeRunRequest {
    #[serde(flatten)]
    agent: AgentFields,
    #[serde(flatten)]
    store: StoreConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostMessageRequest {
    #[serde(flatten)]
    agent: AgentFields,
    #[serde(default)]
    user_input: Option<String>,
    #[serde(flatten)]
    store: StoreConfig,
}

/// Start a run with the given user input
async fn start_run(
    State(state): State<AppState>,
    Json(req): Json<StartRunRequest>,
) -> Result<Json<Run>, RouteError> {
    let (Some(def), Some(user_input)) = (req.agent.definition(), required(&req.user_input)) else {
        return Err(missing_fields());
    };

    let runtime = state.runtime(&req.store).map_err(store_error)?;
    let run = runtime
        .start_run(&def, user_input)
        .await
        .map_err(runtime_error)?;

    Ok(Json(run))
}

/// Get a run by ID
async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(store): Query<StoreConfig>,
) -> Result<Json<Run>, RouteError> {
    let run = state
        .run_store(&store)
        .map_err(store_error)?
        .get_run(&id)
        .await
        .map_err(store_error)?
        .ok_or_else(run_not_found)?;

    Ok(Json(run))
}

/// Advance a run by one step
async fn resume_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResumeRunRequest>,
) -> Result<Json<Run>, RouteError> {
    let def = req.agent.definition().ok_or_else(missing_fields)?;

    let runtime = state.runtime(&req.store).map_err(store_error)?;
    let run = runtime.resume(&def, &id).await.map_err(runtime_error)?;

    Ok(Json(run))
}

/// Append a user message and advance the run
async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<Run>, RouteError> {
    let (Some(def), Some(user_input)) = (req.agent.definition(), required(&req.user_input)) else {
        return Err(missing_fields());
    };

    let runtime = state.runtime(&req.store).map_err(store_error)?;
    let run = runtime
        .post_message(&def, &id, user_input)
        .await
        .map_err(runtime_error)?;

    Ok(Json(run))
}

/// Create the runs router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/runs", post(start_run))
        .route("/api/runs/{id}", get(get_run))
        .route("/api/runs/{id}/resume", post(resume_run))
        .route("/api/runs/{id}/messages", post(post_message))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{json_body, memory_state, EchoProvider};

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, json_body(response).await)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, json_body(response).await)
    }

    fn start_body() -> Value {
        json!({
            "agentId": "helper",
            "model": "gpt-4o-mini",
            "systemPrompt": "be terse",
            "userInput": "hi"
        })
    }

    #[tokio::test]
    async fn start_run_returns_running_run() {
        let app = router().with_state(memory_state());

        let (status, run) = post_json(app, "/api/runs", start_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], "running");
        assert_eq!(run["agentId"], "helper");
        assert_eq!(run["messages"].as_array().unwrap().len(), 2);
        assert_eq!(run["messages"][0]["role"], "system");
        assert_eq!(run["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn start_run_requires_fields() {
        let app = router().with_state(memory_state());

        let (status, body) = post_json(
            app,
            "/api/runs",
            json!({ "agentId": "helper", "userInput": "hi" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn start_run_without_store_is_bad_request() {
        let state = AppState::new(StoreConfig::default(), Arc::new(EchoProvider));
        let app = router().with_state(state);

        let (status, body) = post_json(app, "/api/runs", start_body()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn resume_completes_run_and_get_reflects_it() {
        let app = router().with_state(memory_state());
        let (_, started) = post_json(app.clone(), "/api/runs", start_body()).await;
        let run_id = started["runId"].as_str().unwrap().to_string();

        let (status, resumed) = post_json(
            app.clone(),
            &format!("/api/runs/{}/resume", run_id),
            json!({ "agentId": "helper", "model": "gpt-4o-mini", "systemPrompt": "be terse" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resumed["status"], "completed");
        assert_eq!(resumed["messages"][2]["role"], "assistant");
        assert_eq!(resumed["messages"][2]["content"], "echo: hi");
        assert_eq!(resumed["steps"][0]["nextAction"], "finish");
        assert_eq!(resumed["steps"][0]["modelCall"]["provider"], "echo");

        let (status, fetched) = get_json(app, &format!("/api/runs/{}", run_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, resumed);
    }

    #[tokio::test]
    async fn post_message_appends_and_replies() {
        let app = router().with_state(memory_state());
        let (_, started) = post_json(app.clone(), "/api/runs", start_body()).await;
        let run_id = started["runId"].as_str().unwrap().to_string();

        let (status, run) = post_json(
            app,
            &format!("/api/runs/{}/messages", run_id),
            json!({ "agentId": "helper", "model": "gpt-4o-mini", "userInput": "and more" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let contents: Vec<&str> = run["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(
            contents,
            vec!["be terse", "hi", "and more", "echo: and more"]
        );
        assert_eq!(run["status"], "completed");
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let app = router().with_state(memory_state());
        let advance = json!({ "agentId": "helper", "model": "gpt-4o-mini", "userInput": "hello" });

        let (status, body) = get_json(app.clone(), "/api/runs/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Run not found");

        for uri in ["/api/runs/missing/resume", "/api/runs/missing/messages"] {
            let (status, _) = post_json(app.clone(), uri, advance.clone()).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let app = router().with_state(memory_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/runs/some-id/resume")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
