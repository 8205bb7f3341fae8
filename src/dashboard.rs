//! Submission dashboard state machine.
//!
//! The controller owns the master cache and the current [`FilterSpec`], and
//! publishes every state change through `tokio::sync::watch` channels so a
//! presentation layer can subscribe without polling.

use crate::errors::AppError;
use crate::filter;
use crate::models::{FilterOptions, FilterSpec, Submission, SubmissionQuery, UiState};
use crate::repository::SubmissionRepository;
use crate::session::SessionStore;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Result of asking the controller to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The fetch ran and its terminal state was published.
    Completed,
    /// Another fetch was still in flight; nothing was published.
    Rejected,
}

pub struct DashboardController {
    repository: Arc<dyn SubmissionRepository>,
    session: SessionStore,
    master: Mutex<Vec<Submission>>,
    fetch_gate: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<UiState>,
    filter_tx: watch::Sender<FilterSpec>,
    options_tx: watch::Sender<FilterOptions>,
}

impl DashboardController {
    pub fn new(repository: Arc<dyn SubmissionRepository>, session: SessionStore) -> Self {
        Self {
            repository,
            session,
            master: Mutex::new(Vec::new()),
            fetch_gate: tokio::sync::Mutex::new(()),
            state_tx: watch::Sender::new(UiState::Loading),
            filter_tx: watch::Sender::new(FilterSpec::default()),
            options_tx: watch::Sender::new(FilterOptions::default()),
        }
    }

    // --- Observation --- //

    pub fn state(&self) -> UiState {
        self.state_tx.borrow().clone()
    }

    pub fn filter_spec(&self) -> FilterSpec {
        self.filter_tx.borrow().clone()
    }

    pub fn filter_options(&self) -> FilterOptions {
        self.options_tx.borrow().clone()
    }

    pub fn master(&self) -> Vec<Submission> {
        self.master.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<UiState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_filters(&self) -> watch::Receiver<FilterSpec> {
        self.filter_tx.subscribe()
    }

    pub fn subscribe_options(&self) -> watch::Receiver<FilterOptions> {
        self.options_tx.subscribe()
    }

    // --- Event Handlers --- //

    /// Fetches the full tenant-scoped set and resets the filters.
    ///
    /// Only one fetch runs at a time; a call made while another is in flight
    /// returns [`FetchOutcome::Rejected`] and leaves the state alone.
    pub async fn initialize(&self) -> FetchOutcome {
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            warn!("Fetch already in flight, ignoring request");
            return FetchOutcome::Rejected;
        };

        self.publish(UiState::Loading);

        let Some(credentials) = self.session.credentials() else {
            warn!("Dashboard requested without a complete session");
            self.publish(UiState::Error(AppError::NotAuthenticated.to_string()));
            return FetchOutcome::Completed;
        };

        match self
            .repository
            .fetch_submissions(&credentials, &SubmissionQuery::default())
            .await
        {
            Ok(records) => {
                info!(count = records.len(), tenant = %credentials.tenant, "Master submissions cached");
                self.options_tx.send_replace(filter::derive_options(&records));
                *self.master.lock().unwrap_or_else(PoisonError::into_inner) = records;
                self.clear_filters();
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch submissions");
                self.publish(UiState::Error(format!("Failed to fetch submissions: {}", e)));
            }
        }

        FetchOutcome::Completed
    }

    /// Stores an edited filter without re-filtering.
    pub fn on_filter_change(&self, spec: FilterSpec) {
        debug!(?spec, "Filter edited");
        self.filter_tx.send_replace(spec);
    }

    /// Filters the cached master set with the current spec.
    pub fn apply_filters(&self) {
        let spec = self.filter_spec();
        let filtered = {
            let master = self.master.lock().unwrap_or_else(PoisonError::into_inner);
            filter::apply(&master, &spec)
        };
        info!(matched = filtered.len(), "Filters applied");
        self.publish(UiState::from_records(filtered));
    }

    /// Drops every constraint and shows the full master set again.
    pub fn clear_filters(&self) {
        self.filter_tx.send_replace(FilterSpec::unconstrained());
        let master = self.master();
        self.publish(UiState::from_records(master));
    }

    fn publish(&self, state: UiState) {
        debug!(state = state.label(), records = state.records().len(), "Dashboard state changed");
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppResult;
    use crate::models::{LoginRequest, LoginResponse, SessionCredentials};
    use crate::repository::MockSubmissionRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn record(id: i64, crop: &str, user: Option<i32>, status: Option<&str>, sown: &str) -> Submission {
        let mut s = Submission::new(id, crop);
        s.user_id = user;
        s.estado_follaje = status.map(str::to_string);
        s.fecha_siembra = Some(sown.to_string());
        s
    }

    fn sample() -> Vec<Submission> {
        vec![
            record(1, "Maize", Some(3), Some("Sano"), "2024-01-10"),
            record(2, "Rice", Some(7), None, "15/03/2024"),
            record(3, "Maize", None, Some("Marchito"), "sin fecha"),
        ]
    }

    fn signed_in() -> SessionStore {
        let session = SessionStore::new();
        session.start_session("north", "tok-1", "key-1");
        session
    }

    fn returning(records: Vec<Submission>) -> MockSubmissionRepository {
        let mut repo = MockSubmissionRepository::new();
        repo.expect_fetch_submissions()
            .withf(|creds, query| creds.tenant == "north" && creds.token == "tok-1" && query.is_empty())
            .times(1)
            .returning(move |_, _| Ok(records.clone()));
        repo
    }

    #[tokio::test]
    async fn starts_in_loading() {
        let controller = DashboardController::new(Arc::new(MockSubmissionRepository::new()), signed_in());
        assert_eq!(controller.state(), UiState::Loading);
    }

    #[tokio::test]
    async fn initialize_without_session_skips_fetch() {
        let mut repo = MockSubmissionRepository::new();
        repo.expect_fetch_submissions().times(0);
        let controller = DashboardController::new(Arc::new(repo), SessionStore::new());

        assert_eq!(controller.initialize().await, FetchOutcome::Completed);
        assert_eq!(controller.state(), UiState::Error("not authenticated".to_string()));
    }

    #[tokio::test]
    async fn initialize_with_blank_api_key_skips_fetch() {
        let mut repo = MockSubmissionRepository::new();
        repo.expect_fetch_submissions().times(0);
        let session = SessionStore::new();
        session.start_session("north", "tok-1", "");
        let controller = DashboardController::new(Arc::new(repo), session);

        controller.initialize().await;
        assert_eq!(controller.state(), UiState::Error("not authenticated".to_string()));
    }

    #[tokio::test]
    async fn empty_fetch_publishes_empty() {
        let controller = DashboardController::new(Arc::new(returning(Vec::new())), signed_in());
        controller.initialize().await;

        assert_eq!(controller.state(), UiState::Empty);
        assert_eq!(controller.filter_options(), FilterOptions::default());
    }

    #[tokio::test]
    async fn successful_fetch_caches_master_and_options() {
        let controller = DashboardController::new(Arc::new(returning(sample())), signed_in());
        controller.on_filter_change(FilterSpec::unconstrained().with_crop_types(["Rice"]));
        controller.initialize().await;

        assert_eq!(controller.state(), UiState::Success(sample()));
        assert_eq!(controller.master(), sample());
        assert!(controller.filter_spec().is_unconstrained());

        let options = controller.filter_options();
        assert_eq!(options.user_ids, vec!["3", "7"]);
        assert_eq!(options.crop_types, vec!["Maize", "Rice"]);
        assert_eq!(options.crop_statuses, vec!["Marchito", "Sano"]);
    }

    #[tokio::test]
    async fn transport_failure_publishes_error() {
        let mut repo = MockSubmissionRepository::new();
        repo.expect_fetch_submissions()
            .times(1)
            .returning(|_, _| Err(AppError::Transport("connection refused".into())));
        let controller = DashboardController::new(Arc::new(repo), signed_in());
        controller.initialize().await;

        assert_eq!(
            controller.state(),
            UiState::Error("Failed to fetch submissions: Transport error: connection refused".to_string())
        );
        assert!(controller.master().is_empty());
    }

    #[tokio::test]
    async fn filter_change_alone_does_not_refilter() {
        let controller = DashboardController::new(Arc::new(returning(sample())), signed_in());
        controller.initialize().await;
        let states = controller.subscribe_state();
        let mut filters = controller.subscribe_filters();

        let spec = FilterSpec::unconstrained().with_crop_types(["Rice"]);
        controller.on_filter_change(spec.clone());

        assert_eq!(*filters.borrow_and_update(), spec);
        assert_eq!(controller.filter_spec(), spec);
        assert!(!states.has_changed().unwrap());
        assert_eq!(controller.state(), UiState::Success(sample()));
    }

    #[tokio::test]
    async fn apply_filters_narrows_cached_master() {
        let controller = DashboardController::new(Arc::new(returning(sample())), signed_in());
        controller.initialize().await;

        controller.on_filter_change(FilterSpec::unconstrained().with_start_date("2024-01-01"));
        controller.apply_filters();

        let state = controller.state();
        let ids: Vec<i64> = state.records().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn apply_filters_with_no_match_publishes_empty() {
        let controller = DashboardController::new(Arc::new(returning(sample())), signed_in());
        controller.initialize().await;

        controller.on_filter_change(FilterSpec::unconstrained().with_crop_types(["Wheat"]));
        controller.apply_filters();
        assert_eq!(controller.state(), UiState::Empty);
    }

    #[tokio::test]
    async fn clear_filters_restores_master() {
        let controller = DashboardController::new(Arc::new(returning(sample())), signed_in());
        controller.initialize().await;

        controller.on_filter_change(FilterSpec::unconstrained().with_user_ids(["7"]));
        controller.apply_filters();
        assert_eq!(controller.state().records().len(), 1);

        controller.clear_filters();
        assert_eq!(controller.state(), UiState::Success(sample()));
        assert!(controller.filter_spec().is_unconstrained());
    }

    #[tokio::test]
    async fn clear_filters_on_empty_master_is_empty() {
        let controller = DashboardController::new(Arc::new(returning(Vec::new())), signed_in());
        controller.initialize().await;
        controller.clear_filters();
        assert_eq!(controller.state(), UiState::Empty);
    }

    #[tokio::test]
    async fn subscribers_observe_terminal_state() {
        let controller = DashboardController::new(Arc::new(returning(sample())), signed_in());
        let mut states = controller.subscribe_state();
        let mut options = controller.subscribe_options();

        controller.initialize().await;

        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), UiState::Success(sample()));
        assert_eq!(options.borrow_and_update().crop_types, vec!["Maize", "Rice"]);
    }

    #[tokio::test]
    async fn refetch_replaces_master() {
        let mut repo = MockSubmissionRepository::new();
        let mut calls = 0;
        repo.expect_fetch_submissions().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(sample())
            } else {
                Ok(vec![record(9, "Sorghum", Some(1), None, "2024-05-05")])
            }
        });
        let controller = DashboardController::new(Arc::new(repo), signed_in());

        controller.initialize().await;
        controller.initialize().await;

        assert_eq!(controller.master().len(), 1);
        assert_eq!(controller.filter_options().crop_types, vec!["Sorghum"]);
    }

    /// Answers the first `open_calls` fetches at once with `sample()`; later
    /// fetches wait for `release` and answer with `harvest()`.
    struct GatedRepository {
        open_calls: usize,
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    impl GatedRepository {
        fn new(open_calls: usize) -> Self {
            Self {
                open_calls,
                calls: AtomicUsize::new(0),
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    fn harvest() -> Vec<Submission> {
        vec![
            record(10, "Sorghum", Some(5), Some("Sano"), "2024-07-01"),
            record(11, "Rice", Some(5), None, "2024-07-02"),
        ]
    }

    #[async_trait]
    impl SubmissionRepository for GatedRepository {
        async fn login(&self, _: &str, _: &str, _: &LoginRequest) -> AppResult<LoginResponse> {
            unreachable!("dashboard never logs in")
        }

        async fn fetch_submissions(
            &self,
            _: &SessionCredentials,
            _: &SubmissionQuery,
        ) -> AppResult<Vec<Submission>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.open_calls {
                return Ok(sample());
            }
            self.entered.notify_one();
            self.release.notified().await;
            Ok(harvest())
        }
    }

    #[tokio::test]
    async fn second_fetch_while_in_flight_is_rejected() {
        let repo = Arc::new(GatedRepository::new(0));
        let controller = Arc::new(DashboardController::new(repo.clone(), signed_in()));

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.initialize().await }
        });
        repo.entered.notified().await;

        assert_eq!(controller.initialize().await, FetchOutcome::Rejected);
        assert_eq!(controller.state(), UiState::Loading);

        repo.release.notify_one();
        assert_eq!(first.await.unwrap(), FetchOutcome::Completed);
        assert_eq!(controller.state(), UiState::Success(harvest()));
    }

    #[tokio::test]
    async fn filtering_during_refetch_uses_last_completed_master() {
        let repo = Arc::new(GatedRepository::new(1));
        let controller = Arc::new(DashboardController::new(repo.clone(), signed_in()));
        controller.initialize().await;
        assert_eq!(controller.master(), sample());

        let refetch = tokio::spawn({
            let controller = controller.clone();
            async move { controller.initialize().await }
        });
        repo.entered.notified().await;
        assert_eq!(controller.state(), UiState::Loading);

        controller.on_filter_change(FilterSpec::unconstrained().with_crop_types(["Rice"]));
        controller.apply_filters();
        let ids: Vec<i64> = controller.state().records().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2]);

        controller.clear_filters();
        assert_eq!(controller.state(), UiState::Success(sample()));

        repo.release.notify_one();
        assert_eq!(refetch.await.unwrap(), FetchOutcome::Completed);
        assert_eq!(controller.state(), UiState::Success(harvest()));
        assert_eq!(controller.master(), harvest());
        assert_eq!(controller.filter_options().crop_types, vec!["Rice", "Sorghum"]);

        controller.on_filter_change(FilterSpec::unconstrained().with_crop_types(["Rice"]));
        controller.apply_filters();
        let ids: Vec<i64> = controller.state().records().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![11]);
    }
}
