//! HTTP routes and handlers.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/rooms` | Create a room |
//! | GET | `/api/v1/rooms` | List public rooms |
//! | GET | `/api/v1/rooms/{code}` | Look up one room |
//! | GET | `/healthz` | Liveness |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use roomforge_backend::{Launcher, StatusProbe};
use roomforge_protocol::{CreateRoom, Room};
use roomforge_registry::Registry;
use roomforge_room::{RoomError, RoomOrchestrator};
use serde_json::json;

type Shared<L, R, P> = Arc<RoomOrchestrator<L, R, P>>;

/// Builds the API router around a shared orchestrator.
pub fn build_router<L, R, P>(orchestrator: Shared<L, R, P>) -> Router
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    let api = Router::new()
        .route(
            "/rooms",
            get(list_rooms::<L, R, P>).post(create_room::<L, R, P>),
        )
        .route("/rooms/{code}", get(get_room::<L, R, P>))
        .with_state(orchestrator);

    Router::new()
        .nest("/api/v1", api)
        .route("/healthz", get(healthz))
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// A [`RoomError`] on its way to becoming an HTTP response.
///
/// Validation failures are 400, unknown rooms 404, anything else 500.
/// The body is always `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub RoomError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RoomError::Validation(_) => StatusCode::BAD_REQUEST,
            RoomError::NotFound(_) => StatusCode::NOT_FOUND,
            RoomError::Allocation(_)
            | RoomError::Spawn(_)
            | RoomError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_room<L, R, P>(
    State(orchestrator): State<Shared<L, R, P>>,
    Json(request): Json<CreateRoom>,
) -> Result<Json<Room>, ApiError>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    Ok(Json(orchestrator.create_room(request).await?))
}

async fn list_rooms<L, R, P>(
    State(orchestrator): State<Shared<L, R, P>>,
) -> Result<Json<Vec<Room>>, ApiError>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    Ok(Json(orchestrator.list_rooms().await?))
}

async fn get_room<L, R, P>(
    State(orchestrator): State<Shared<L, R, P>>,
    Path(code): Path<String>,
) -> Result<Json<Room>, ApiError>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    Ok(Json(orchestrator.get_room(&code).await?))
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use roomforge_backend::LaunchError;
    use roomforge_protocol::ProtocolError;
    use roomforge_registry::RegistryError;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                RoomError::Validation(ProtocolError::Validation("name".into())),
                StatusCode::BAD_REQUEST,
            ),
            (RoomError::NotFound("abc".into()), StatusCode::NOT_FOUND),
            (
                RoomError::Spawn(LaunchError::Spawn("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RoomError::Persistence(RegistryError::Write("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_into_response_uses_status() {
        let resp = ApiError(RoomError::NotFound("abc".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
