//! JSON REST API for Valentine messages.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`] and
//! [`IdentityProvider`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", valentine_api::api_router(state))
//! ```

pub mod dashboard;
pub mod error;
pub mod identity;
pub mod messages;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use valentine_core::{
  identity::IdentityProvider, repository::MessageRepository, store::RecordStore,
};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, I> {
  pub repo:       MessageRepository<S>,
  pub identity:   Arc<I>,
  /// Base URL used to build shareable message links.
  pub public_url: Arc<str>,
}

impl<S: Clone, I> Clone for ApiState<S, I> {
  fn clone(&self) -> Self {
    Self {
      repo:       self.repo.clone(),
      identity:   Arc::clone(&self.identity),
      public_url: Arc::clone(&self.public_url),
    }
  }
}

impl<S: RecordStore, I: IdentityProvider> ApiState<S, I> {
  pub fn new(store: S, identity: I, public_url: impl Into<String>) -> Self {
    let public_url: String = public_url.into();
    Self {
      repo:       MessageRepository::new(store),
      identity:   Arc::new(identity),
      public_url: Arc::from(public_url),
    }
  }

  /// The page a recipient opens to read message `id`.
  pub fn message_link(&self, id: &str) -> String {
    format!("{}/message/{id}", self.public_url.trim_end_matches('/'))
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, I>(state: ApiState<S, I>) -> Router<()>
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  Router::new()
    .route("/users/me", get(identity::me::<S, I>))
    .route("/dashboard", get(dashboard::handler::<S, I>))
    .route(
      "/messages",
      get(messages::list::<S, I>).post(messages::create::<S, I>),
    )
    .route("/messages/{id}", get(messages::view::<S, I>))
    .route("/messages/{id}/respond", post(messages::respond::<S, I>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use valentine_core::{
    identity::StubIdentityProvider,
    message::{Answer, Fid, NewMessage},
    store::MemoryStore,
  };

  use super::*;
  use crate::identity::FID_HEADER;

  fn make_state() -> ApiState<MemoryStore, StubIdentityProvider> {
    ApiState::new(MemoryStore::new(), StubIdentityProvider, "https://valentine.example/")
  }

  async fn call(
    state: ApiState<MemoryStore, StubIdentityProvider>,
    method: &str,
    uri: &str,
    fid: Option<u64>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(fid) = fid {
      builder = builder.header(FID_HEADER, fid.to_string());
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };

    let resp = api_router(state)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn seed(state: &ApiState<MemoryStore, StubIdentityProvider>) {
    state
      .repo
      .create(NewMessage::new("m1", Fid(42), Fid(7), "Be my valentine?"))
      .await
      .unwrap();
  }

  // ── Identity ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn me_returns_stub_profile() {
    let (status, body) = call(make_state(), "GET", "/users/me", Some(3621), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fid"], 3621);
    assert_eq!(body["username"], "fid-3621");
    assert_eq!(body["display_name"], "User 3621");
    assert_eq!(body["verifications"], json!([]));
  }

  #[tokio::test]
  async fn me_without_header_is_401() {
    let (status, body) = call(make_state(), "GET", "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn non_numeric_fid_is_400() {
    let req = Request::builder()
      .uri("/users/me")
      .header(FID_HEADER, "alice")
      .body(Body::empty())
      .unwrap();
    let resp = api_router(make_state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Create ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_returns_link_and_stores_message() {
    let state = make_state();
    let (status, body) = call(
      state.clone(),
      "POST",
      "/messages",
      Some(7),
      Some(json!({ "recipientId": 42, "body": "  Be my valentine?  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = body["message"]["id"].as_str().unwrap().to_owned();
    assert_eq!(
      body["link"],
      format!("https://valentine.example/message/{id}")
    );
    assert_eq!(body["message"]["body"], "Be my valentine?");
    assert_eq!(body["message"]["senderDisplayName"], "fid-7");
    assert!(body["message"]["response"].is_null());

    let stored = state.repo.get_by_id(&id).await.unwrap();
    assert_eq!(stored.recipient_id, Fid(42));
    assert_eq!(stored.sender_id, Fid(7));
  }

  #[tokio::test]
  async fn create_requires_sign_in() {
    let (status, _) = call(
      make_state(),
      "POST",
      "/messages",
      None,
      Some(json!({ "recipientId": 42, "body": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn create_rejects_blank_body_and_missing_recipient() {
    let state = make_state();
    let (status, _) = call(
      state.clone(),
      "POST",
      "/messages",
      Some(7),
      Some(json!({ "recipientId": 42, "body": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
      state.clone(),
      "POST",
      "/messages",
      Some(7),
      Some(json!({ "body": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.repo.all().await.is_empty());
  }

  // ── View ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn view_unknown_message_is_404() {
    let (status, body) = call(make_state(), "GET", "/messages/nope", Some(42), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["state"], "not_found");
  }

  #[tokio::test]
  async fn view_without_identity_is_401() {
    let state = make_state();
    seed(&state).await;
    let (status, body) = call(state, "GET", "/messages/m1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["state"], "unauthenticated");
  }

  #[tokio::test]
  async fn view_by_other_user_is_403_and_reveals_only_recipient() {
    let state = make_state();
    seed(&state).await;
    let (status, body) = call(state, "GET", "/messages/m1", Some(8), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "state": "forbidden", "recipient_id": 42 }));
  }

  #[tokio::test]
  async fn view_by_recipient_awaits_response() {
    let state = make_state();
    seed(&state).await;
    let (status, body) = call(state, "GET", "/messages/m1", Some(42), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "awaiting_response");
    assert_eq!(body["message"]["body"], "Be my valentine?");
  }

  // ── Respond ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn respond_then_reload_is_stable() {
    let state = make_state();
    seed(&state).await;

    let (status, body) = call(
      state.clone(),
      "POST",
      "/messages/m1/respond",
      Some(42),
      Some(json!({ "response": "yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "responded");
    assert_eq!(body["answer"], "yes");
    assert!(body["message"]["respondedAt"].is_number());

    for _ in 0..2 {
      let (status, reloaded) =
        call(state.clone(), "GET", "/messages/m1", Some(42), None).await;
      assert_eq!(status, StatusCode::OK);
      assert_eq!(reloaded, body);
    }
  }

  #[tokio::test]
  async fn second_response_is_409() {
    let state = make_state();
    seed(&state).await;
    call(
      state.clone(),
      "POST",
      "/messages/m1/respond",
      Some(42),
      Some(json!({ "response": "no" })),
    )
    .await;

    let (status, _) = call(
      state.clone(),
      "POST",
      "/messages/m1/respond",
      Some(42),
      Some(json!({ "response": "yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
      state.repo.get_by_id("m1").await.unwrap().response,
      Some(Answer::No)
    );
  }

  #[tokio::test]
  async fn respond_by_other_user_is_403_and_unchanged() {
    let state = make_state();
    seed(&state).await;
    let (status, _) = call(
      state.clone(),
      "POST",
      "/messages/m1/respond",
      Some(8),
      Some(json!({ "response": "yes" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(state.repo.get_by_id("m1").await.unwrap().response.is_none());
  }

  // ── Malformed input ─────────────────────────────────────────────────────────

  async fn post_raw(
    state: ApiState<MemoryStore, StubIdentityProvider>,
    uri: &str,
    fid: u64,
    raw: &str,
  ) -> (StatusCode, Value) {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header(FID_HEADER, fid.to_string())
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(raw.to_owned()))
      .unwrap();
    let resp = api_router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn malformed_json_body_is_400_with_json_error() {
    let state = make_state();
    let (status, body) = post_raw(state.clone(), "/messages", 7, "{recipientId: 42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(state.repo.all().await.is_empty());
  }

  #[tokio::test]
  async fn wrong_field_type_is_400_with_json_error() {
    let (status, body) = call(
      make_state(),
      "POST",
      "/messages",
      Some(7),
      Some(json!({ "recipientId": "42", "body": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("recipientId"));
  }

  #[tokio::test]
  async fn unknown_answer_is_400_and_unchanged() {
    let state = make_state();
    seed(&state).await;
    let (status, body) = call(
      state.clone(),
      "POST",
      "/messages/m1/respond",
      Some(42),
      Some(json!({ "response": "maybe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(state.repo.get_by_id("m1").await.unwrap().response.is_none());
  }

  #[tokio::test]
  async fn non_numeric_list_filter_is_400_with_json_error() {
    let (status, body) =
      call(make_state(), "GET", "/messages?sender=abc", Some(7), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  // ── Listing and dashboard ───────────────────────────────────────────────────

  #[tokio::test]
  async fn list_requires_own_fid_and_one_filter() {
    let state = make_state();
    seed(&state).await;

    let (status, body) =
      call(state.clone(), "GET", "/messages?recipient=42", Some(42), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) =
      call(state.clone(), "GET", "/messages?recipient=42", Some(7), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(state, "GET", "/messages", Some(42), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn dashboard_splits_sent_and_received() {
    let state = make_state();
    seed(&state).await;
    state
      .repo
      .create(NewMessage::new("m2", Fid(7), Fid(42), "Yes, and you?"))
      .await
      .unwrap();

    let (status, body) = call(state, "GET", "/dashboard", Some(7), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["username"], "fid-7");
    assert_eq!(body["sent"][0]["id"], "m1");
    assert_eq!(body["received"][0]["id"], "m2");
    assert_eq!(body["sent"].as_array().unwrap().len(), 1);
    assert_eq!(body["received"].as_array().unwrap().len(), 1);
  }
}
