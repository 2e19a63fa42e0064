//! Service layer: one module per core domain concern, each a pure
//! function of (repositories, caller, input) into (effects, typed
//! result). Every capability check happens here, once, so the HTTP and
//! bot edges can never diverge on an invariant.

pub mod access_onboarding;
pub mod auth;
pub mod inventory;
pub mod ticket_engine;
pub mod work_session;
pub mod xp_ledger;

pub use access_onboarding::AccessOnboardingService;
pub use auth::AuthService;
pub use inventory::InventoryService;
pub use ticket_engine::TicketEngine;
pub use work_session::WorkSessionService;
pub use xp_ledger::XpLedgerService;
