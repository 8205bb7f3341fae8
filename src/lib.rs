//! Field submission dashboard client.
//!
//! Logs in against the tenant-scoped backend, caches the submission list once
//! and filters it locally by user, crop, crop status and sown date.

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod filter;
pub mod login;
pub mod models;
pub mod repository;
pub mod session;

pub use dashboard::{DashboardController, FetchOutcome};
pub use errors::{AppError, AppResult};
pub use login::LoginController;
pub use models::{FilterOptions, FilterSpec, LoginState, SessionCredentials, Submission, UiState};
pub use repository::{HttpSubmissionRepository, SubmissionRepository};
pub use session::SessionStore;
