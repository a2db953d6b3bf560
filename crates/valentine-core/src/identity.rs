//! The identity provider port.
//!
//! The provider resolves a numeric identity into a public profile. The
//! message layer only ever reads the FID and the username from it.

use std::{convert::Infallible, future::Future};

use serde::{Deserialize, Serialize};

use crate::message::Fid;

/// Public profile of a user, as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub fid:             Fid,
  pub username:        String,
  pub display_name:    String,
  pub pfp_url:         String,
  pub custody_address: String,
  pub verifications:   Vec<String>,
}

impl UserProfile {
  /// A profile built from the FID alone, with no upstream lookup.
  pub fn placeholder(fid: Fid) -> Self {
    Self {
      fid,
      username: format!("fid-{fid}"),
      display_name: format!("User {fid}"),
      pfp_url: String::new(),
      custody_address: String::new(),
      verifications: Vec::new(),
    }
  }
}

/// Resolves FIDs into profiles.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn lookup(
    &self,
    fid: Fid,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;
}

/// Fabricates [`UserProfile::placeholder`] profiles locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubIdentityProvider;

impl IdentityProvider for StubIdentityProvider {
  type Error = Infallible;

  async fn lookup(&self, fid: Fid) -> Result<UserProfile, Infallible> {
    Ok(UserProfile::placeholder(fid))
  }
}
