//! Access onboarding: turns a Telegram-originated request
//! into a `PENDING` `AccessRequest`, then moderates it into an approved
//! `User` with a default `TECHNICIAN` role, or a permanent rejection.

use uuid::Uuid;

use crate::db::models::{AccessRequest, User};
use crate::errors::{AppError, AppResult};
use crate::repo::{AccessRequestRepo, UserRepo};
use crate::types::{AccessRequestStatus, Role};

#[derive(Clone)]
pub struct AccessOnboardingService {
    access_requests: AccessRequestRepo,
    users: UserRepo,
}

impl AccessOnboardingService {
    pub fn new(access_requests: AccessRequestRepo, users: UserRepo) -> Self {
        Self {
            access_requests,
            users,
        }
    }

    pub async fn request_access(
        &self,
        telegram_id: i64,
        telegram_username: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        phone: &str,
    ) -> AppResult<AccessRequest> {
        if first_name.trim().is_empty() || phone.trim().is_empty() {
            return Err(AppError::validation("first_name and phone are required"));
        }
        self.access_requests
            .create(telegram_id, telegram_username, first_name, last_name, phone)
            .await
    }

    /// Approval is idempotent: locates or creates the `User` by phone,
    /// binds the Telegram identity if unbound, and activates the default
    /// TECHNICIAN role; notifying the user over Telegram is the caller's
    /// responsibility as a best-effort side effect.
    pub async fn approve(&self, request_id: Uuid) -> AppResult<User> {
        let request = self
            .access_requests
            .finalize(request_id, AccessRequestStatus::Approved)
            .await?;

        let user = match self.users.find_by_phone(&request.phone).await? {
            Some(user) => user,
            None => self.users.create(&request.phone).await?,
        };

        let user = self
            .users
            .bind_telegram_identity(
                user.id,
                request.telegram_id,
                request.telegram_username.as_deref(),
            )
            .await?;

        self.users.grant_role(user.id, Role::Technician).await?;

        Ok(user)
    }

    pub async fn reject(&self, request_id: Uuid) -> AppResult<AccessRequest> {
        self.access_requests
            .finalize(request_id, AccessRequestStatus::Rejected)
            .await
    }
}
