//! The process-wide service registry, with explicit init and teardown.
//! Constructed once during bootstrap and cloned cheaply (every field is
//! an `Arc`-backed handle) into the HTTP router and the bot dispatcher.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::rbac::RbacEngine;
use crate::repo::{
    AccessRequestRepo, AuditRepo, InventoryRepo, TicketRepo, UserRepo, WorkSessionRepo,
    XpLedgerRepo,
};
use crate::services::{
    AccessOnboardingService, AuthService, InventoryService, TicketEngine, WorkSessionService,
    XpLedgerService,
};
use crate::telegram_verify::TelegramVerifier;

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    pub users: UserRepo,
    pub access_onboarding: AccessOnboardingService,
    pub inventory: InventoryService,
    pub tickets: TicketEngine,
    pub work_sessions: WorkSessionService,
    pub xp_ledger: XpLedgerService,
    pub auth: AuthService,
    pub rbac: RbacEngine,
    pub telegram_verifier: Option<TelegramVerifier>,
    pub pool: PgPool,
    pub bot: Option<teloxide::Bot>,
    pub bot_webhook_secret: Option<String>,
}

impl AppState {
    pub fn build(pool: PgPool, config: &Config) -> Self {
        let users = UserRepo::new(pool.clone());
        let access_requests = AccessRequestRepo::new(pool.clone());
        let inventory_repo = InventoryRepo::new(pool.clone());
        let tickets_repo = TicketRepo::new(pool.clone());
        let work_sessions_repo = WorkSessionRepo::new(pool.clone());
        let audit_repo = AuditRepo::new(pool.clone());
        let xp_ledger_repo = XpLedgerRepo::new(pool.clone());

        let access_onboarding =
            AccessOnboardingService::new(access_requests, users.clone());
        let inventory = InventoryService::new(inventory_repo.clone());
        let tickets = TicketEngine::new(
            tickets_repo.clone(),
            inventory_repo,
            work_sessions_repo.clone(),
            audit_repo.clone(),
            xp_ledger_repo.clone(),
            users.clone(),
            config.first_pass_bonus_xp,
        );
        let work_sessions =
            WorkSessionService::new(work_sessions_repo, tickets_repo, audit_repo);
        let xp_ledger = XpLedgerService::new(xp_ledger_repo, config.punctuality_base_xp);
        let auth = AuthService::new(
            config.jwt_signing_key.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        let telegram_verifier = config.bot_token.as_ref().map(|token| {
            TelegramVerifier::new(token.clone(), config.bot_tma_max_age, config.bot_tma_replay_ttl)
        });
        let bot = config.bot_token.as_ref().map(|token| teloxide::Bot::new(token));

        Self(Arc::new(Inner {
            users,
            access_onboarding,
            inventory,
            tickets,
            work_sessions,
            xp_ledger,
            auth,
            rbac: RbacEngine::new(),
            telegram_verifier,
            pool,
            bot,
            bot_webhook_secret: config.bot_webhook_secret.clone(),
        }))
    }

    pub fn bot(&self) -> Option<&teloxide::Bot> {
        self.0.bot.as_ref()
    }

    pub fn bot_webhook_secret(&self) -> Option<&str> {
        self.0.bot_webhook_secret.as_deref()
    }

    pub async fn db_is_healthy(&self) -> bool {
        sqlx::query_scalar::<_, i32>("select 1")
            .fetch_one(&self.0.pool)
            .await
            .is_ok()
    }

    pub fn users(&self) -> &UserRepo {
        &self.0.users
    }

    pub fn access_onboarding(&self) -> &AccessOnboardingService {
        &self.0.access_onboarding
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.0.inventory
    }

    pub fn tickets(&self) -> &TicketEngine {
        &self.0.tickets
    }

    pub fn work_sessions(&self) -> &WorkSessionService {
        &self.0.work_sessions
    }

    pub fn xp_ledger(&self) -> &XpLedgerService {
        &self.0.xp_ledger
    }

    pub fn auth(&self) -> &AuthService {
        &self.0.auth
    }

    pub fn rbac(&self) -> &RbacEngine {
        &self.0.rbac
    }

    pub fn telegram_verifier(&self) -> Option<&TelegramVerifier> {
        self.0.telegram_verifier.as_ref()
    }
}
