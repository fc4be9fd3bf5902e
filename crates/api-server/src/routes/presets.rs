//! Preset API routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use relay_core::preset::Preset;
use relay_core::store::StoreConfig;

use super::{missing_fields, required, store_error, RouteError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct PresetListResponse {
    presets: Vec<Preset>,
}

#[derive(Debug, Serialize)]
struct PresetResponse {
    preset: Preset,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePresetRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    tools: Option<serde_json::Value>,
    #[serde(flatten)]
    store: StoreConfig,
}

/// List presets, newest first
async fn list_presets(
    State(state): State<AppState>,
    Query(store): Query<StoreConfig>,
) -> Result<Json<PresetListResponse>, RouteError> {
    let presets = state
        .preset_catalog(&store)
        .map_err(store_error)?
        .list()
        .await
        .map_err(store_error)?;

    Ok(Json(PresetListResponse { presets }))
}

/// Save a new preset
async fn create_preset(
    State(state): State<AppState>,
    Json(req): Json<CreatePresetRequest>,
) -> Result<(StatusCode, Json<PresetResponse>), RouteError> {
    let (Some(name), Some(agent_id), Some(model)) = (
        required(&req.name),
        required(&req.agent_id),
        required(&req.model),
    ) else {
        return Err(missing_fields());
    };

    let mut preset = Preset::new(name, agent_id, model);
    preset.system_prompt = req.system_prompt.clone();
    preset.tools = req.tools.clone();

    let preset = state
        .preset_catalog(&req.store)
        .map_err(store_error)?
        .add(preset)
        .await
        .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(PresetResponse { preset })))
}

/// Create the presets router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/presets", get(list_presets).post(create_preset))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::{json_body, memory_state};

    fn create_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/presets")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn presets_are_listed_newest_first() {
        let app = router().with_state(memory_state());

        for name in ["Terse", "Verbose"] {
            let request = create_request(json!({
                "name": name,
                "agentId": "helper",
                "model": "gpt-4o-mini",
                "systemPrompt": "be helpful",
                "tools": [{ "name": "search" }]
            }));
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let created = json_body(response).await;
            assert_eq!(created["preset"]["name"], name);
            assert_eq!(created["preset"]["agent_id"], "helper");
        }

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/presets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let listed = json_body(response).await;
        let presets = listed["presets"].as_array().unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0]["name"], "Verbose");
        assert_eq!(presets[1]["name"], "Terse");
        assert_eq!(presets[1]["tools"][0]["name"], "search");
    }

    #[tokio::test]
    async fn create_preset_requires_fields() {
        let app = router().with_state(memory_state());

        let request = create_request(json!({ "name": "Terse", "model": "gpt-4o-mini" }));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn presets_reject_other_methods() {
        let app = router().with_state(memory_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/presets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
