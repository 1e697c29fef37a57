//! SBI Response Utilities
//!
//! Operations hand back a `(headers, body, problem)` triple; this module
//! renders it into an HTTP response and builds the ProblemDetails values the
//! UDM services answer with.

use std::collections::HashMap;

use ogs_sbi::message::{ProblemDetails, SbiResponse};
use ogs_sbi::server::{send_internal_error, send_problem};
use ogs_sbi::types::SbiAppError;
use serde::Serialize;

/// How an empty result is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// GET of a stored record
    Read,
    /// Create, update or delete
    Mutate,
}

/// Result triple of a UDM operation
#[derive(Debug, Clone, PartialEq)]
pub struct UdmResponse<T> {
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<T>,
    pub problem: Option<ProblemDetails>,
}

impl<T> Default for UdmResponse<T> {
    fn default() -> Self {
        Self {
            headers: None,
            body: None,
            problem: None,
        }
    }
}

impl<T: Serialize> UdmResponse<T> {
    /// Body plus a Location header
    pub fn created(location: impl Into<String>, body: T) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Location".to_string(), location.into());
        Self {
            headers: Some(headers),
            body: Some(body),
            problem: None,
        }
    }

    pub fn ok(body: T) -> Self {
        Self {
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn problem(problem: ProblemDetails) -> Self {
        Self {
            problem: Some(problem),
            ..Default::default()
        }
    }

    /// Neither body nor problem
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_result(result: Result<Option<T>, ProblemDetails>) -> Self {
        match result {
            Ok(Some(body)) => Self::ok(body),
            Ok(None) => Self::empty(),
            Err(problem) => Self::problem(problem),
        }
    }

    /// Map the triple to an HTTP response
    pub fn render(self, kind: OperationKind) -> SbiResponse {
        match (self.body, self.headers, self.problem) {
            (Some(body), Some(headers), _) => {
                match SbiResponse::created().with_json_body(&body) {
                    Ok(response) => headers
                        .into_iter()
                        .fold(response, |r, (k, v)| r.with_header(k, v)),
                    Err(e) => send_internal_error(&format!("Cannot encode response: {e}")),
                }
            }
            (Some(body), None, _) => SbiResponse::ok()
                .with_json_body(&body)
                .unwrap_or_else(|e| send_internal_error(&format!("Cannot encode response: {e}"))),
            (None, _, Some(problem)) => send_problem(&problem),
            (None, _, None) => match kind {
                OperationKind::Mutate => SbiResponse::no_content(),
                OperationKind::Read => send_problem(&forbidden_unspecified()),
            },
        }
    }
}

fn app_problem(status: i32, cause: SbiAppError) -> ProblemDetails {
    ProblemDetails::with_status(status).with_app_error(cause)
}

/// 404 USER_NOT_FOUND
pub fn user_not_found() -> ProblemDetails {
    app_problem(404, SbiAppError::UserNotFound)
}

/// 404 SUBSCRIPTION_NOT_FOUND
pub fn subscription_not_found() -> ProblemDetails {
    app_problem(404, SbiAppError::SubscriptionNotFound)
}

/// 404 CONTEXT_NOT_FOUND
pub fn context_not_found() -> ProblemDetails {
    app_problem(404, SbiAppError::ContextNotFound)
}

/// 400 MANDATORY_IE_INCORRECT naming the offending parameter
pub fn mandatory_ie_incorrect(param: &str) -> ProblemDetails {
    app_problem(400, SbiAppError::MandatoryIeIncorrect).with_invalid_param(param, "incorrect format")
}

/// 500 UNSPECIFIED_NF_FAILURE
pub fn unspecified_nf_failure() -> ProblemDetails {
    app_problem(500, SbiAppError::UnspecifiedNfFailure)
}

/// 403 INVALID_GUAMI
pub fn invalid_guami() -> ProblemDetails {
    app_problem(403, SbiAppError::InvalidGuami)
}

pub fn modification_not_allowed(detail: impl Into<String>) -> ProblemDetails {
    app_problem(403, SbiAppError::ModificationNotAllowed).with_detail(detail)
}

/// 403 UNSPECIFIED, answered to a GET with nothing stored
pub fn forbidden_unspecified() -> ProblemDetails {
    app_problem(403, SbiAppError::Unspecified)
}

pub fn malformed_request(detail: impl Into<String>) -> ProblemDetails {
    ProblemDetails::with_status(400)
        .with_title("Malformed request syntax")
        .with_detail(detail)
}
