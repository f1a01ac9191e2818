use axum::{extract::State, http::StatusCode, Extension, Json};
use presswatch_pipeline::StatusSnapshot;
use serde::Serialize;

use crate::middleware::RequestId;
use crate::runs::run_verification;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct RunAccepted {
    started: bool,
    status: StatusSnapshot,
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<StatusSnapshot>> {
    Json(ApiResponse {
        data: state.status.snapshot(),
        meta: ResponseMeta::new(req_id.0),
    })
}

/// Starts a verification pass in the background and returns immediately.
pub(super) async fn start_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<RunAccepted>>), ApiError> {
    if let Err(e) = state.status.try_begin() {
        return Err(ApiError::new(req_id.0, "conflict", e.to_string()));
    }

    tracing::info!(request_id = %req_id.0, "verification run requested");
    let data = RunAccepted {
        started: true,
        status: state.status.snapshot(),
    };

    tokio::spawn(async move {
        run_verification(&state).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
