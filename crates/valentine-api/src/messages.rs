//! Handlers for `/messages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/messages` | Exactly one of `?sender=<fid>` or `?recipient=<fid>`; must be the viewer |
//! | `POST` | `/messages` | Body: [`CreateBody`]; returns 201 + [`Created`] |
//! | `GET`  | `/messages/:id` | The viewer's [`ViewState`] for the message |
//! | `POST` | `/messages/:id/respond` | Body: `{"response":"yes"\|"no"}` |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use valentine_core::{
  Error as CoreError,
  identity::IdentityProvider,
  lifecycle::{MessageController, ViewState},
  message::{Answer, Fid, Message, NewMessage},
  repository::generate_id,
  store::RecordStore,
};

use crate::{
  ApiState,
  error::ApiError,
  identity::{Viewer, profile},
};

/// Fresh ids collide only by chance; give up after this many tries.
const CREATE_ATTEMPTS: usize = 3;

/// HTTP status for a derived view state.
pub fn status_for(state: &ViewState) -> StatusCode {
  match state {
    ViewState::NotFound => StatusCode::NOT_FOUND,
    ViewState::Unauthenticated => StatusCode::UNAUTHORIZED,
    ViewState::Forbidden { .. } => StatusCode::FORBIDDEN,
    ViewState::Loading
    | ViewState::AwaitingResponse { .. }
    | ViewState::Responded { .. } => StatusCode::OK,
  }
}

fn state_response(state: ViewState) -> (StatusCode, Json<ViewState>) {
  (status_for(&state), Json(state))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub sender:    Option<Fid>,
  pub recipient: Option<Fid>,
}

/// `GET /messages?sender=<fid>` or `GET /messages?recipient=<fid>`
pub async fn list<S, I>(
  State(state): State<ApiState<S, I>>,
  viewer: Viewer,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  let fid = viewer.require()?;
  let Query(params) = params?;

  let messages = match (params.sender, params.recipient) {
    (Some(sender), None) if sender == fid => state.repo.get_by_sender(sender).await,
    (None, Some(recipient)) if recipient == fid => {
      state.repo.get_by_recipient(recipient).await
    }
    (Some(_), None) | (None, Some(_)) => {
      return Err(ApiError::Forbidden(
        "only your own messages can be listed".into(),
      ));
    }
    _ => {
      return Err(ApiError::BadRequest(
        "exactly one of `sender` or `recipient` is required".into(),
      ));
    }
  };

  Ok(Json(messages))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /messages`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub recipient_id: Option<Fid>,
  pub body:         Option<String>,
}

/// Response to `POST /messages`: the stored record and its shareable link.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
  pub message: Message,
  pub link:    String,
}

/// `POST /messages` — the authoring flow. The viewer is the sender.
pub async fn create<S, I>(
  State(state): State<ApiState<S, I>>,
  viewer: Viewer,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  let sender = viewer.require()?;
  let Json(body) = body?;
  let recipient = body
    .recipient_id
    .ok_or_else(|| ApiError::BadRequest("recipientId is required".into()))?;
  let text = body
    .body
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| ApiError::BadRequest("body is required".into()))?
    .to_owned();

  let sender_profile = profile(state.identity.as_ref(), sender).await?;

  let mut attempt = 0;
  let message = loop {
    attempt += 1;
    let mut input = NewMessage::new(generate_id(), recipient, sender, text.clone());
    input.sender_display_name = Some(sender_profile.username.clone());

    match state.repo.create(input).await {
      Ok(message) => break message,
      Err(CoreError::DuplicateId(_)) if attempt < CREATE_ATTEMPTS => continue,
      Err(e) => return Err(e.into()),
    }
  };

  info!(id = %message.id, %sender, %recipient, "valentine created");
  let link = state.message_link(&message.id);
  Ok((StatusCode::CREATED, Json(Created { message, link })))
}

// ─── View ─────────────────────────────────────────────────────────────────────

/// `GET /messages/:id` — load the message and authorise the viewer.
///
/// The body is always the derived [`ViewState`]; the status mirrors it.
pub async fn view<S, I>(
  State(state): State<ApiState<S, I>>,
  Path(id): Path<String>,
  viewer: Viewer,
) -> (StatusCode, Json<ViewState>)
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  let mut controller = MessageController::new(&state.repo, id, viewer.0);
  controller.load().await;
  state_response(controller.into_state())
}

// ─── Respond ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RespondBody {
  pub response: Answer,
}

/// `POST /messages/:id/respond` — record the recipient's one-time answer.
pub async fn respond<S, I>(
  State(state): State<ApiState<S, I>>,
  Path(id): Path<String>,
  viewer: Viewer,
  body: Result<Json<RespondBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ViewState>), ApiError>
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  let Json(body) = body?;
  let mut controller = MessageController::new(&state.repo, id.clone(), viewer.0);

  match controller.load().await {
    ViewState::AwaitingResponse { .. } => {}
    ViewState::Responded { .. } => {
      return Err(ApiError::Conflict(format!(
        "message {id:?} already has a response"
      )));
    }
    _ => return Ok(state_response(controller.into_state())),
  }

  controller.respond(body.response).await?;
  Ok(state_response(controller.into_state()))
}
