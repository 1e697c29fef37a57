//! UDM Notification Delivery
//!
//! Data change notifications go to every SDM subscription of a UE in order;
//! deregistration notifications go to a single AMF callback. Every delivery
//! gets its own SBI client which is closed once the delivery is over.

use async_trait::async_trait;
use ogs_sbi::client::SbiClient;
use ogs_sbi::error::SbiResult;
use ogs_sbi::message::{ProblemDetails, SbiRequest, SbiResponse};
use ogs_sbi::oauth::OAuth2Client;
use ogs_sbi::types::{NfType, SbiAppError, SbiServiceType};

use crate::context::{ue_read, UdmContext};
use crate::models::{DeregistrationData, ModificationNotification, NotifyItem};

/// Credentials attached to an outbound notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenContext {
    /// Authorization header value, when OAuth2 is in use
    pub authorization: Option<String>,
}

/// Outbound side of the notification dispatcher
#[async_trait]
pub trait NotificationClient: Send + Sync {
    /// Credentials for calling `service` on behalf of `target`
    async fn token_context(
        &self,
        service: SbiServiceType,
        target: NfType,
    ) -> Result<TokenContext, ProblemDetails>;

    /// POST a JSON body to a callback URI. Any HTTP status is `Ok`; `Err`
    /// means no response was received.
    async fn send_notification(
        &self,
        token: &TokenContext,
        uri: &str,
        body: &serde_json::Value,
    ) -> SbiResult<SbiResponse>;
}

/// HTTP/2 notification client, optionally fetching NRF tokens
pub struct SbiNotificationClient {
    oauth: Option<OAuth2Client>,
}

impl SbiNotificationClient {
    pub fn new(oauth: Option<OAuth2Client>) -> Self {
        Self { oauth }
    }
}

#[async_trait]
impl NotificationClient for SbiNotificationClient {
    async fn token_context(
        &self,
        service: SbiServiceType,
        target: NfType,
    ) -> Result<TokenContext, ProblemDetails> {
        let Some(oauth) = &self.oauth else {
            return Ok(TokenContext::default());
        };

        match oauth.authorization_header(target, service).await {
            Ok(header) => Ok(TokenContext {
                authorization: Some(header),
            }),
            Err(e) => {
                log::error!("Cannot get access token for {} ({}): {}", service, target, e);
                Err(ProblemDetails::with_status(500)
                    .with_app_error(SbiAppError::SystemFailure)
                    .with_detail(e.to_string()))
            }
        }
    }

    async fn send_notification(
        &self,
        token: &TokenContext,
        uri: &str,
        body: &serde_json::Value,
    ) -> SbiResult<SbiResponse> {
        let client = SbiClient::from_uri(uri)?;

        let mut request = SbiRequest::post(uri).with_json_body(body)?;
        if let Some(authorization) = &token.authorization {
            request = request.with_header("Authorization", authorization);
        }

        let result = client.send_request(request).await;
        client.close().await;
        result
    }
}

/// Result of one data change delivery
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub callback_uri: String,
    pub result: Result<(), ProblemDetails>,
}

/// Per-target outcomes of a data change fan-out, in delivery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataChangeReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DataChangeReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ProblemDetails)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(()) => None,
            Err(problem) => Some((o.callback_uri.as_str(), problem)),
        })
    }

    pub fn last_failure(&self) -> Option<&ProblemDetails> {
        self.failures().last().map(|(_, problem)| problem)
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Problem summarizing every failed delivery, carrying the status of the
    /// most recent one
    pub fn to_problem(&self) -> Option<ProblemDetails> {
        let last = self.last_failure()?;
        let failed: Vec<String> = self
            .failures()
            .map(|(uri, problem)| format!("{} ({})", uri, problem.status_code()))
            .collect();

        let mut problem = last.clone();
        problem.detail = Some(format!(
            "{} of {} data change notifications failed: {}",
            failed.len(),
            self.outcomes.len(),
            failed.join(", ")
        ));
        Some(problem)
    }
}

/// Notify every SDM subscriber of `supi` about changed data
pub async fn notify_data_change(
    context: &UdmContext,
    client: &dyn NotificationClient,
    supi: &str,
    notify_items: Vec<NotifyItem>,
) -> Result<DataChangeReport, ProblemDetails> {
    let token = client
        .token_context(SbiServiceType::NudmSdm, NfType::Udm)
        .await?;

    let targets: Vec<String> = match context.get(supi) {
        Some(ue) => ue_read(&ue)
            .sdm_subscriptions
            .iter()
            .map(|s| s.callback_reference.clone())
            .collect(),
        None => {
            log::warn!("[{}] Data change for unknown UE", supi);
            Vec::new()
        }
    };

    let body = serde_json::to_value(ModificationNotification { notify_items }).map_err(|e| {
        ProblemDetails::with_status(500)
            .with_app_error(SbiAppError::SystemFailure)
            .with_detail(e.to_string())
    })?;

    let mut report = DataChangeReport::default();
    for uri in targets {
        let result = match client.send_notification(&token, &uri, &body).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => {
                log::error!("[{}] Data change notification to {} rejected: HTTP {}", supi, uri, response.status);
                Err(ProblemDetails::with_status(response.status as i32)
                    .with_detail(format!("HTTP {}", response.status)))
            }
            Err(e) => {
                log::error!("[{}] Data change notification to {} failed: {}", supi, uri, e);
                Err(ProblemDetails::with_status(403).with_detail(e.to_string()))
            }
        };
        report.outcomes.push(DeliveryOutcome {
            callback_uri: uri,
            result,
        });
    }

    log::debug!("[{}] Data change delivered to {} targets", supi, report.outcomes.len());
    Ok(report)
}

/// Send a deregistration notification to one AMF callback
pub async fn notify_deregistration(
    client: &dyn NotificationClient,
    supi: &str,
    callback_uri: &str,
    data: &DeregistrationData,
) -> Result<(), ProblemDetails> {
    let token = client
        .token_context(SbiServiceType::NudmUecm, NfType::Udm)
        .await?;

    let problem = |status: u16, detail: String| {
        ProblemDetails::with_status(status as i32)
            .with_app_error(SbiAppError::DeregistrationNotificationError)
            .with_detail(detail)
    };

    let body = serde_json::to_value(data).map_err(|e| problem(500, e.to_string()))?;
    match client.send_notification(&token, callback_uri, &body).await {
        Ok(response) if response.is_success() => {
            log::info!("[{}] Deregistration notification sent to {}", supi, callback_uri);
            Ok(())
        }
        Ok(response) => {
            log::error!("[{}] Deregistration notification rejected: HTTP {}", supi, response.status);
            Err(problem(response.status, format!("HTTP {}", response.status)))
        }
        Err(e) => {
            log::error!("[{}] Deregistration notification failed: {}", supi, e);
            Err(problem(500, e.to_string()))
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use ogs_sbi::error::SbiError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records deliveries; answers per URI with a status or a transport error
    #[derive(Default)]
    pub struct MockNotificationClient {
        pub sent: Mutex<Vec<(String, serde_json::Value, TokenContext)>>,
        pub statuses: HashMap<String, u16>,
        pub unreachable: Vec<String>,
        pub token_failure: bool,
    }

    impl MockNotificationClient {
        pub fn sent_uris(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(uri, _, _)| uri.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationClient for MockNotificationClient {
        async fn token_context(
            &self,
            service: SbiServiceType,
            _target: NfType,
        ) -> Result<TokenContext, ProblemDetails> {
            if self.token_failure {
                return Err(ProblemDetails::with_status(401));
            }
            Ok(TokenContext {
                authorization: Some(format!("Bearer {}", service.to_name())),
            })
        }

        async fn send_notification(
            &self,
            token: &TokenContext,
            uri: &str,
            body: &serde_json::Value,
        ) -> SbiResult<SbiResponse> {
            self.sent
                .lock()
                .unwrap()
                .push((uri.to_string(), body.clone(), token.clone()));

            if self.unreachable.iter().any(|u| u == uri) {
                return Err(SbiError::Connection("connection refused".into()));
            }
            Ok(SbiResponse::with_status(*self.statuses.get(uri).unwrap_or(&204)))
        }
    }
}
