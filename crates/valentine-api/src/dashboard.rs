//! Handler for `GET /dashboard` — the signed-in home screen.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use valentine_core::{
  identity::{IdentityProvider, UserProfile},
  message::Message,
  store::RecordStore,
};

use crate::{
  ApiState,
  error::ApiError,
  identity::{Viewer, profile},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
  pub profile:  UserProfile,
  /// Messages the viewer wrote, oldest first.
  pub sent:     Vec<Message>,
  /// Messages addressed to the viewer's FID, oldest first.
  pub received: Vec<Message>,
}

/// `GET /dashboard`
pub async fn handler<S, I>(
  State(state): State<ApiState<S, I>>,
  viewer: Viewer,
) -> Result<Json<Dashboard>, ApiError>
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  let fid = viewer.require()?;
  let profile = profile(state.identity.as_ref(), fid).await?;

  Ok(Json(Dashboard {
    profile,
    sent: state.repo.get_by_sender(fid).await,
    received: state.repo.get_by_recipient(fid).await,
  }))
}
