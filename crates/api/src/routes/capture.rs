//! Capture Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use capture::{CaptureResult, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::AppState;

/// Body of `POST /insta360/capture`
#[derive(Debug, Default, Deserialize)]
pub struct CaptureRequest {
    pub car_code: Option<String>,
    #[serde(rename = "carCode")]
    pub car_code_camel: Option<String>,
}

impl CaptureRequest {
    /// Artifact label: `car_code`, else `carCode`, ignoring empty values
    pub fn label(&self) -> Option<&str> {
        [&self.car_code, &self.car_code_camel]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|code| !code.is_empty())
    }
}

/// Successful capture response
#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub ok: bool,
    /// Reference path the artifact is served under
    pub url: String,
    pub path: String,
    pub option_set: capture::OptionSet,
    pub info: Value,
    pub state: Value,
}

impl From<CaptureResult> for CaptureResponse {
    fn from(result: CaptureResult) -> Self {
        Self {
            ok: true,
            url: result.public_ref,
            path: result.path.display().to_string(),
            option_set: result.option_set,
            info: result.info.unwrap_or(Value::Null),
            state: result.state.unwrap_or(Value::Null),
        }
    }
}

/// Failed capture response
#[derive(Debug, Serialize)]
pub struct CaptureFailure {
    pub ok: bool,
    pub error: String,
    pub stage: Stage,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Body rejected before any device call
#[derive(Debug, Serialize)]
pub struct CaptureRejected {
    pub ok: bool,
    pub error: String,
}

/// Capture one image
///
/// Captures are serialized per camera: a second request waits for the first
/// to finish instead of racing it for the shutter. A request without a JSON
/// content type captures with the default label; a JSON body that does not
/// parse is refused before the camera is touched.
pub async fn capture(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CaptureRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => CaptureRequest::default(),
        Err(rejection) => {
            warn!("Rejected capture request body: {}", rejection.body_text());
            let rejected = CaptureRejected {
                ok: false,
                error: rejection.body_text(),
            };
            return (StatusCode::BAD_REQUEST, Json(rejected)).into_response();
        }
    };
    let label = request.label();

    let _camera = state.camera_lock.lock().await;
    info!("Capture requested (label: {:?})", label);

    match state.orchestrator.capture_single_image(label).await {
        Ok(result) => (StatusCode::OK, Json(CaptureResponse::from(result))).into_response(),
        Err(e) => {
            warn!("Capture request failed: {}", e);
            let failure = CaptureFailure {
                ok: false,
                error: e.to_string(),
                stage: e.stage(),
                kind: e.kind(),
                status: e.status(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_precedence() {
        let both = CaptureRequest {
            car_code: Some("SNAKE".to_string()),
            car_code_camel: Some("CAMEL".to_string()),
        };
        assert_eq!(both.label(), Some("SNAKE"));

        let camel: CaptureRequest = serde_json::from_str(r#"{"carCode": "12AB"}"#).unwrap();
        assert_eq!(camel.label(), Some("12AB"));

        let empty: CaptureRequest =
            serde_json::from_str(r#"{"car_code": "", "carCode": "X"}"#).unwrap();
        assert_eq!(empty.label(), Some("X"));

        assert_eq!(CaptureRequest::default().label(), None);
    }
}
