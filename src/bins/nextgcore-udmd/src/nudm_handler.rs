//! UDM SBI Request Handling
//!
//! Routes Nudm_UECM, Nudm_EE, Nudm_SDM and the data-change callback to the
//! operations of the UDM core and renders their results.

use std::sync::Arc;

use ogs_sbi::message::{SbiRequest, SbiResponse};
use ogs_sbi::server::{send_method_not_allowed, send_problem};
use serde::de::DeserializeOwned;

use crate::context::{ue_write, UdmContext};
use crate::models::{
    AmfRegistrationModification, EeSubscription, NotifyItem, PatchItem, SdmSubscription,
    SmfRegistration,
};
use crate::notifier::{notify_data_change, notify_deregistration, NotificationClient};
use crate::nudm_ee::{
    create_ee_subscription, delete_ee_subscription, ee_subscription_location, update_ee_subscription,
};
use crate::nudm_uecm::{
    amf_takeover_notice, deregister_smf, get_registration, parse_pdu_session_id, register,
    register_smf, update_amf_registration, AccessSlot, Amf3GppAccess, AmfNon3GppAccess, AmfSlot,
    Smsf3GppAccess, SmsfNon3GppAccess,
};
use crate::sbi_response::{
    malformed_request, subscription_not_found, user_not_found, OperationKind, UdmResponse,
};

/// Shared state behind the SBI server
pub struct UdmServices {
    pub context: Arc<UdmContext>,
    pub notifier: Arc<dyn NotificationClient>,
}

impl UdmServices {
    pub fn new(context: Arc<UdmContext>, notifier: Arc<dyn NotificationClient>) -> Self {
        Self { context, notifier }
    }
}

/// SBI request handler for UDM
pub async fn udm_sbi_request_handler(services: Arc<UdmServices>, request: SbiRequest) -> SbiResponse {
    let method = request.header.method.to_uppercase();
    let service = request.header.service_name.clone().unwrap_or_default();
    let resource: Vec<&str> = request.header.resource.iter().map(String::as_str).collect();

    log::debug!("UDM SBI request: {} {}", method, request.header.uri);

    match (service.as_str(), method.as_str(), resource.as_slice()) {
        // Nudm_UECM
        ("nudm-uecm", "GET", [supi, "registrations", slot]) => match *slot {
            Amf3GppAccess::RESOURCE => handle_get::<Amf3GppAccess>(&services, supi, &request),
            AmfNon3GppAccess::RESOURCE => handle_get::<AmfNon3GppAccess>(&services, supi, &request),
            Smsf3GppAccess::RESOURCE => handle_get::<Smsf3GppAccess>(&services, supi, &request),
            SmsfNon3GppAccess::RESOURCE => handle_get::<SmsfNon3GppAccess>(&services, supi, &request),
            _ => send_method_not_allowed(&method, &request.header.uri),
        },
        ("nudm-uecm", "PUT", [supi, "registrations", slot]) => match *slot {
            Amf3GppAccess::RESOURCE => handle_amf_3gpp_registration(&services, supi, &request),
            AmfNon3GppAccess::RESOURCE => handle_put::<AmfNon3GppAccess>(&services, supi, &request),
            Smsf3GppAccess::RESOURCE => handle_put::<Smsf3GppAccess>(&services, supi, &request),
            SmsfNon3GppAccess::RESOURCE => handle_put::<SmsfNon3GppAccess>(&services, supi, &request),
            _ => send_method_not_allowed(&method, &request.header.uri),
        },
        ("nudm-uecm", "PATCH", [supi, "registrations", slot]) => match *slot {
            Amf3GppAccess::RESOURCE => handle_patch::<Amf3GppAccess>(&services, supi, &request),
            AmfNon3GppAccess::RESOURCE => handle_patch::<AmfNon3GppAccess>(&services, supi, &request),
            _ => send_method_not_allowed(&method, &request.header.uri),
        },
        ("nudm-uecm", "PUT", [supi, "registrations", "smf-registrations", pdu_session_id]) => {
            handle_smf_registration(&services, supi, pdu_session_id, &request)
        }
        ("nudm-uecm", "DELETE", [supi, "registrations", "smf-registrations", pdu_session_id]) => {
            handle_smf_deregistration(&services, supi, pdu_session_id)
        }

        // Nudm_EE
        ("nudm-ee", "POST", [ue_identity, "ee-subscriptions"]) => {
            handle_ee_subscribe(&services, ue_identity, &request)
        }
        ("nudm-ee", "PATCH", [ue_identity, "ee-subscriptions", subscription_id]) => {
            handle_ee_update(&services, ue_identity, subscription_id, &request)
        }
        ("nudm-ee", "DELETE", [ue_identity, "ee-subscriptions", subscription_id]) => {
            mutate_response(delete_ee_subscription(&services.context, ue_identity, subscription_id))
        }

        // Nudm_SDM subscriptions
        ("nudm-sdm", "POST", [supi, "sdm-subscriptions"]) => {
            handle_sdm_subscribe(&services, supi, &request)
        }
        ("nudm-sdm", "DELETE", [supi, "sdm-subscriptions", subscription_id]) => {
            handle_sdm_unsubscribe(&services, supi, subscription_id)
        }

        // Data change trigger
        ("nudm-callback", "POST", [supi, "data-change"]) => {
            handle_data_change(&services, supi, &request).await
        }

        _ => {
            log::warn!("Unknown UDM request: {} {}", method, request.header.uri);
            send_method_not_allowed(&method, &request.header.uri)
        }
    }
}

/// Decode a JSON request body, or the 400 response to answer with
fn json_body<T: DeserializeOwned>(request: &SbiRequest) -> Result<T, SbiResponse> {
    let content = request.http.content.as_deref().unwrap_or_default();
    serde_json::from_str(content).map_err(|e| {
        log::error!("Malformed request body for {}: {}", request.header.uri, e);
        send_problem(&malformed_request(e.to_string()))
    })
}

fn mutate_response(result: Result<(), ogs_sbi::message::ProblemDetails>) -> SbiResponse {
    UdmResponse::<()>::from_result(result.map(|()| None)).render(OperationKind::Mutate)
}

fn handle_get<S: AccessSlot>(services: &UdmServices, supi: &str, request: &SbiRequest) -> SbiResponse {
    let supported_features = request.http.get_param("supported-features").map(String::as_str);
    let record = get_registration::<S>(&services.context, supi, supported_features);
    UdmResponse::from_result(Ok(record)).render(OperationKind::Read)
}

fn handle_put<S: AccessSlot>(services: &UdmServices, supi: &str, request: &SbiRequest) -> SbiResponse {
    let record = match json_body::<S::Record>(request) {
        Ok(record) => record,
        Err(response) => return response,
    };

    match register::<S>(&services.context, supi, record) {
        Ok(registered) => registered.into_response().render(OperationKind::Mutate),
        Err(problem) => send_problem(&problem),
    }
}

/// AMF 3GPP registration; a takeover by another AMF notifies the old one
fn handle_amf_3gpp_registration(services: &UdmServices, supi: &str, request: &SbiRequest) -> SbiResponse {
    let record = match json_body(request) {
        Ok(record) => record,
        Err(response) => return response,
    };

    let registered = match register::<Amf3GppAccess>(&services.context, supi, record) {
        Ok(registered) => registered,
        Err(problem) => return send_problem(&problem),
    };

    if let Some((callback_uri, data)) =
        amf_takeover_notice(registered.displaced.as_ref(), &registered.record)
    {
        log::info!("[{}] AMF changed, notifying {}", supi, callback_uri);
        let notifier = services.notifier.clone();
        let supi = supi.to_string();
        tokio::spawn(async move {
            if let Err(problem) =
                notify_deregistration(notifier.as_ref(), &supi, &callback_uri, &data).await
            {
                log::warn!("[{}] Old AMF not notified: {:?}", supi, problem.detail);
            }
        });
    }

    registered.into_response().render(OperationKind::Mutate)
}

fn handle_patch<S: AmfSlot>(services: &UdmServices, supi: &str, request: &SbiRequest) -> SbiResponse {
    let modification: AmfRegistrationModification = match json_body(request) {
        Ok(modification) => modification,
        Err(response) => return response,
    };
    mutate_response(update_amf_registration::<S>(&services.context, supi, &modification))
}

fn handle_smf_registration(
    services: &UdmServices,
    supi: &str,
    pdu_session_id: &str,
    request: &SbiRequest,
) -> SbiResponse {
    let pdu_session_id = match parse_pdu_session_id(pdu_session_id) {
        Ok(id) => id,
        Err(problem) => return send_problem(&problem),
    };
    let record: SmfRegistration = match json_body(request) {
        Ok(record) => record,
        Err(response) => return response,
    };

    match register_smf(&services.context, supi, pdu_session_id, record) {
        Ok(registered) => registered.into_response().render(OperationKind::Mutate),
        Err(problem) => send_problem(&problem),
    }
}

fn handle_smf_deregistration(services: &UdmServices, supi: &str, pdu_session_id: &str) -> SbiResponse {
    let result = parse_pdu_session_id(pdu_session_id)
        .and_then(|id| deregister_smf(&services.context, supi, id));
    mutate_response(result)
}

fn handle_ee_subscribe(services: &UdmServices, ue_identity: &str, request: &SbiRequest) -> SbiResponse {
    let subscription: EeSubscription = match json_body(request) {
        Ok(subscription) => subscription,
        Err(response) => return response,
    };

    match create_ee_subscription(&services.context, ue_identity, subscription) {
        Ok((created, subscription_id)) => {
            UdmResponse::created(ee_subscription_location(ue_identity, &subscription_id), created)
                .render(OperationKind::Mutate)
        }
        Err(problem) => send_problem(&problem),
    }
}

fn handle_ee_update(
    services: &UdmServices,
    ue_identity: &str,
    subscription_id: &str,
    request: &SbiRequest,
) -> SbiResponse {
    let patch_list: Vec<PatchItem> = match json_body(request) {
        Ok(items) => items,
        Err(response) => return response,
    };
    mutate_response(update_ee_subscription(
        &services.context,
        ue_identity,
        subscription_id,
        &patch_list,
    ))
}

fn handle_sdm_subscribe(services: &UdmServices, supi: &str, request: &SbiRequest) -> SbiResponse {
    let mut subscription: SdmSubscription = match json_body(request) {
        Ok(subscription) => subscription,
        Err(response) => return response,
    };
    let Some(ue) = services.context.get(supi) else {
        return send_problem(&user_not_found());
    };

    let id = ue_write(&ue).sdm_subscription_add(subscription.clone());
    subscription.subscription_id = Some(id.clone());
    log::info!("[{}] SDM subscription {} for {}", supi, id, subscription.callback_reference);

    UdmResponse::created(format!("/nudm-sdm/v2/{supi}/sdm-subscriptions/{id}"), subscription)
        .render(OperationKind::Mutate)
}

fn handle_sdm_unsubscribe(services: &UdmServices, supi: &str, subscription_id: &str) -> SbiResponse {
    let Some(ue) = services.context.get(supi) else {
        return send_problem(&user_not_found());
    };
    let removed = ue_write(&ue).sdm_subscription_remove(subscription_id);
    mutate_response(removed.map(|_| ()).ok_or_else(subscription_not_found))
}

async fn handle_data_change(services: &UdmServices, supi: &str, request: &SbiRequest) -> SbiResponse {
    let notify_items: Vec<NotifyItem> = match json_body(request) {
        Ok(items) => items,
        Err(response) => return response,
    };

    match notify_data_change(&services.context, services.notifier.as_ref(), supi, notify_items).await {
        Ok(report) => match report.to_problem() {
            Some(problem) => send_problem(&problem),
            None => SbiResponse::no_content(),
        },
        Err(problem) => send_problem(&problem),
    }
}
