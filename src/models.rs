use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::{Validate, ValidationError};

// ==============================================================================
// RECORDS
// ==============================================================================

/// A single AGROMO_FORM_1 field submission.
///
/// Only `id` and `cultivo` are guaranteed by the backend. Every other field is
/// kept as `None` when absent so that "unknown" never turns into a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: i64,
    #[serde(rename = "id_usuario")]
    pub user_id: Option<i32>,
    pub cultivo: String,
    pub fecha_siembra: Option<String>,
    pub humedad: Option<i32>,
    pub metodo_humedad: Option<String>,
    pub ph: Option<i32>,
    pub metodo_ph: Option<String>,
    pub altura_planta: Option<f64>,
    pub metodo_altura: Option<String>,
    pub estado_fenologico: Option<String>,
    pub densidad_follaje: Option<String>,
    pub color_follaje: Option<String>,
    pub estado_follaje: Option<String>,
    pub observaciones: Option<String>,
    pub estado: Option<i32>,
    pub localizacion: Option<String>,
    pub image_url: Option<String>,
}

impl Submission {
    /// Minimal record with only the required fields set.
    pub fn new(id: i64, cultivo: impl Into<String>) -> Self {
        Self {
            id,
            user_id: None,
            cultivo: cultivo.into(),
            fecha_siembra: None,
            humedad: None,
            metodo_humedad: None,
            ph: None,
            metodo_ph: None,
            altura_planta: None,
            metodo_altura: None,
            estado_fenologico: None,
            densidad_follaje: None,
            color_follaje: None,
            estado_follaje: None,
            observaciones: None,
            estado: None,
            localizacion: None,
            image_url: None,
        }
    }

    pub fn user_id_string(&self) -> Option<String> {
        self.user_id.map(|id| id.to_string())
    }

    /// Crop status as shown in the dashboard (foliage state).
    pub fn crop_status(&self) -> Option<&str> {
        self.estado_follaje.as_deref()
    }
}

// ==============================================================================
// SESSION
// ==============================================================================

/// The credential triple required by every authenticated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub tenant: String,
    pub api_key: String,
    pub token: String,
}

impl SessionCredentials {
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// ==============================================================================
// FILTERS
// ==============================================================================

/// User-chosen filter constraints. An empty set or an absent date leaves that
/// dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub selected_user_ids: BTreeSet<String>,
    pub selected_crop_types: BTreeSet<String>,
    pub selected_crop_status: BTreeSet<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterSpec {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn with_user_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_user_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_crop_types<I, S>(mut self, crops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_crop_types = crops.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_crop_status<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_crop_status = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    /// True when no dimension carries a constraint as written. Blank or
    /// unparsable dates still count as written here; see `filter::parse_bound`.
    pub fn is_unconstrained(&self) -> bool {
        self.selected_user_ids.is_empty()
            && self.selected_crop_types.is_empty()
            && self.selected_crop_status.is_empty()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// Distinct values available for each filterable dimension, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub user_ids: Vec<String>,
    pub crop_types: Vec<String>,
    pub crop_statuses: Vec<String>,
}

// ==============================================================================
// UI STATE
// ==============================================================================

/// Observable state of the submission dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum UiState {
    Loading,
    Success(Vec<Submission>),
    Empty,
    Error(String),
}

impl UiState {
    pub fn from_records(records: Vec<Submission>) -> Self {
        if records.is_empty() {
            UiState::Empty
        } else {
            UiState::Success(records)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UiState::Loading => "loading",
            UiState::Success(_) => "success",
            UiState::Empty => "empty",
            UiState::Error(_) => "error",
        }
    }

    pub fn records(&self) -> &[Submission] {
        match self {
            UiState::Success(records) => records,
            _ => &[],
        }
    }
}

/// Observable state of the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Loading,
    Success,
    Error(String),
}

// ==============================================================================
// DTOs (Data Transfer Objects)
// ==============================================================================

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Everything the login screen collects. Validated locally before any call.
#[derive(Debug, Clone, Validate)]
pub struct LoginForm {
    #[validate(custom(function = "not_blank"))]
    pub tenant: String,
    #[validate(custom(function = "not_blank"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
    #[validate(custom(function = "not_blank"))]
    pub api_key: String,
}

impl LoginForm {
    pub fn request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "user_email")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub message: String,
    pub user: LoginUser,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    #[serde(rename = "user_email")]
    pub email: String,
    pub tenant: String,
}

// API Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionsResponse {
    pub data: Vec<Submission>,
}

/// Server-side constraints accepted by the forms endpoint. The dashboard
/// always sends the default (all absent) and filters locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_status: Option<String>,
}

impl SubmissionQuery {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
