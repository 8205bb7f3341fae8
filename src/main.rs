use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agromo_reader::config::Settings;
use agromo_reader::{
    DashboardController, HttpSubmissionRepository, LoginController, LoginState, SessionStore, UiState,
};

// ==============================================================================
// HEADLESS DASHBOARD
// ==============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging (LOG_FORMAT=json for machine-readable output)
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reqwest=warn".to_string()),
        ))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!("Starting AGROMO READER");

    let settings = Settings::new().context("Failed to load configuration")?;
    info!(base_url = %settings.api.base_url, "Configuration loaded successfully");

    let repository = Arc::new(HttpSubmissionRepository::new(&settings.api)?);
    let session = SessionStore::new();

    let login = LoginController::new(repository.clone(), session.clone());
    let credentials = &settings.login;
    if let LoginState::Error(message) = login
        .login(&credentials.tenant, &credentials.email, &credentials.password, &credentials.api_key)
        .await
    {
        bail!(message);
    }

    let dashboard = DashboardController::new(repository, session);
    dashboard.initialize().await;
    if let UiState::Error(message) = dashboard.state() {
        bail!(message);
    }

    let options = dashboard.filter_options();
    info!(
        users = ?options.user_ids,
        crops = ?options.crop_types,
        statuses = ?options.crop_statuses,
        "Available filter options"
    );

    let spec = settings.filter.to_spec();
    if !spec.is_unconstrained() {
        dashboard.on_filter_change(spec);
        dashboard.apply_filters();
    }

    match dashboard.state() {
        UiState::Success(submissions) => {
            info!(count = submissions.len(), "Submissions matching filters");
            for s in &submissions {
                info!(
                    id = s.id,
                    crop = %s.cultivo,
                    user = ?s.user_id,
                    sown = s.fecha_siembra.as_deref().unwrap_or("-"),
                    status = s.crop_status().unwrap_or("-"),
                    "Submission"
                );
            }
        }
        UiState::Empty => warn!("No submissions match the configured filters"),
        UiState::Loading | UiState::Error(_) => {}
    }

    login.logout();
    Ok(())
}
