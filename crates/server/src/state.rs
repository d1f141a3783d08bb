//! Shared application state and the signed-in user type.

use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use splatkit::{AccountDetails, Auth, Authenticator, Profile, Theme};

/// The user stored in the session after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    /// `<provider>:<provider user id>`
    pub id: String,
    pub provider: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<Profile> for AppUser {
    fn from(profile: Profile) -> Self {
        let name = profile
            .display_name
            .clone()
            .or_else(|| profile.email.clone())
            .unwrap_or_else(|| profile.id.clone());

        Self {
            id: format!("{}:{}", profile.provider, profile.id),
            provider: profile.provider,
            name,
            email: profile.email,
            avatar_url: profile.avatar_url,
        }
    }
}

impl AppUser {
    pub fn details(&self) -> AccountDetails {
        AccountDetails {
            username: self.name.clone(),
            profile_picture: self.avatar_url.clone().unwrap_or_default(),
        }
    }
}

/// A provider button on the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginLink {
    pub name: String,
    pub provider: String,
    /// Public path the login form posts to.
    pub action: String,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth<AppUser>>,
    pub theme: Theme,
    pub login_links: Arc<[LoginLink]>,
}

impl FromRef<AppState> for Authenticator<AppUser> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.authenticator().clone()
    }
}
