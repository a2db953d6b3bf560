//! Viewer identity and the `GET /users/me` handler.
//!
//! The viewer's FID arrives in the `x-user-fid` header. The header is
//! asserted by the caller and nothing here verifies it; a deployment that
//! needs real access control must authenticate it upstream.

use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, request::Parts},
};
use valentine_core::{
  identity::{IdentityProvider, UserProfile},
  message::Fid,
  store::RecordStore,
};

use crate::{ApiState, error::ApiError};

/// Header carrying the caller's FID.
pub const FID_HEADER: &str = "x-user-fid";

/// The viewer identity of a request, if one was supplied.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<Fid>);

impl Viewer {
  /// Read the viewer from `headers`. A present but non-numeric header is a
  /// bad request rather than an anonymous viewer.
  pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
    let Some(raw) = headers.get(FID_HEADER) else {
      return Ok(Viewer(None));
    };
    let fid = raw
      .to_str()
      .ok()
      .and_then(|s| s.parse::<Fid>().ok())
      .ok_or_else(|| {
        ApiError::BadRequest(format!("{FID_HEADER} must be a numeric FID"))
      })?;
    Ok(Viewer(Some(fid)))
  }

  /// The viewer's FID, or [`ApiError::Unauthenticated`].
  pub fn require(self) -> Result<Fid, ApiError> {
    self.0.ok_or(ApiError::Unauthenticated)
  }
}

impl<St: Send + Sync> FromRequestParts<St> for Viewer {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    Viewer::from_headers(&parts.headers)
  }
}

/// Look `fid` up through the configured provider.
pub(crate) async fn profile<I: IdentityProvider>(
  identity: &I,
  fid: Fid,
) -> Result<UserProfile, ApiError> {
  identity
    .lookup(fid)
    .await
    .map_err(|e| ApiError::Identity(Box::new(e)))
}

/// `GET /users/me` — the viewer's profile.
pub async fn me<S, I>(
  State(state): State<ApiState<S, I>>,
  viewer: Viewer,
) -> Result<Json<UserProfile>, ApiError>
where
  S: RecordStore + Clone + 'static,
  I: IdentityProvider + 'static,
{
  let fid = viewer.require()?;
  Ok(Json(profile(state.identity.as_ref(), fid).await?))
}
