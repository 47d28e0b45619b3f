//! User profile service
//!
//! Profile view/update and password change. Validation mirrors the
//! registration rules and runs before any network call.

use std::sync::Arc;

use crate::api::{ApiClient, ChangePasswordRequest, UpdateProfileRequest, UserProfile};
use crate::session::SessionStore;

use super::errors::ProfileError;
use super::notify::NoticeKind;
use super::report_api_failure;
use super::state::SharedState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct ProfileService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: SharedState,
}

impl ProfileService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>, state: SharedState) -> Self {
        Self {
            api,
            session,
            state,
        }
    }

    fn token(&self) -> Result<String, ProfileError> {
        self.session.token().ok_or(ProfileError::NotAuthenticated)
    }

    pub async fn fetch(&self) -> Result<UserProfile, ProfileError> {
        let token = self.token()?;
        match self.api.get("/api/user/profile", Some(&token)).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                report_api_failure(&self.session, &self.state, &err, "Failed to load profile.");
                Err(err.into())
            }
        }
    }

    pub async fn update(&self, username: &str, email: Option<&str>) -> Result<(), ProfileError> {
        let token = self.token()?;
        let username = username.trim();
        if username.len() < 3 {
            return Err(ProfileError::Validation(
                "Username must be at least 3 characters".to_string(),
            ));
        }
        let email = email.map(str::trim).filter(|e| !e.is_empty());

        if let Err(err) = self
            .api
            .put_unit(
                "/api/user/profile",
                &UpdateProfileRequest { username, email },
                Some(&token),
            )
            .await
        {
            report_api_failure(&self.session, &self.state, &err, "Failed to update profile.");
            return Err(err.into());
        }
        self.state
            .announce(NoticeKind::Success, "Profile updated.");
        Ok(())
    }

    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), ProfileError> {
        let token = self.token()?;
        if current.is_empty() {
            return Err(ProfileError::Validation(
                "Current password is required".to_string(),
            ));
        }
        if new.len() < MIN_PASSWORD_LEN {
            return Err(ProfileError::Validation(format!(
                "New password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if new != confirm {
            return Err(ProfileError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        if let Err(err) = self
            .api
            .put_unit(
                "/api/user/password",
                &ChangePasswordRequest {
                    current_password: current,
                    new_password: new,
                },
                Some(&token),
            )
            .await
        {
            report_api_failure(&self.session, &self.state, &err, "Failed to change password.");
            return Err(err.into());
        }
        self.state
            .announce(NoticeKind::Success, "Password changed.");
        Ok(())
    }
}
