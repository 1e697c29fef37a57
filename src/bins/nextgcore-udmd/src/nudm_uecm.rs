//! Nudm_UECM Registration Handling
//!
//! Access-type registrations (AMF, SMSF) are singletons per UE and are only
//! ever replaced. SMF registrations are keyed by PDU session ID and may be
//! deleted one at a time.

use ogs_sbi::message::ProblemDetails;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::{ue_read, ue_write, UdmContext, UdmUe};
use crate::models::{
    AccessType, Amf3GppAccessRegistration, AmfNon3GppAccessRegistration, AmfRegistrationModification,
    DeregistrationData, DeregistrationReason, Guami, PatchItem, SmfRegistration, SmsfRegistration,
};
use crate::patch::patch_record;
use crate::sbi_response::{
    context_not_found, invalid_guami, mandatory_ie_incorrect, modification_not_allowed,
    user_not_found, UdmResponse,
};

/// Highest PDU session identity (TS 24.007 11.2.3.1b)
pub const MAX_PDU_SESSION_ID: i32 = 255;

/// Registration slot of a UE, one record per access type
pub trait AccessSlot {
    type Record: Clone + Serialize + DeserializeOwned;

    /// Last resource component under `registrations/`
    const RESOURCE: &'static str;

    fn slot(ue: &mut UdmUe) -> &mut Option<Self::Record>;
    fn get(ue: &UdmUe) -> Option<&Self::Record>;
}

/// AMF slot whose record carries a GUAMI
pub trait AmfSlot: AccessSlot {
    fn guami(record: &Self::Record) -> &Guami;
}

pub struct Amf3GppAccess;
pub struct AmfNon3GppAccess;
pub struct Smsf3GppAccess;
pub struct SmsfNon3GppAccess;

impl AccessSlot for Amf3GppAccess {
    type Record = Amf3GppAccessRegistration;
    const RESOURCE: &'static str = "amf-3gpp-access";

    fn slot(ue: &mut UdmUe) -> &mut Option<Self::Record> {
        &mut ue.amf_3gpp_access_registration
    }
    fn get(ue: &UdmUe) -> Option<&Self::Record> {
        ue.amf_3gpp_access_registration.as_ref()
    }
}

impl AmfSlot for Amf3GppAccess {
    fn guami(record: &Self::Record) -> &Guami {
        &record.guami
    }
}

impl AccessSlot for AmfNon3GppAccess {
    type Record = AmfNon3GppAccessRegistration;
    const RESOURCE: &'static str = "amf-non-3gpp-access";

    fn slot(ue: &mut UdmUe) -> &mut Option<Self::Record> {
        &mut ue.amf_non_3gpp_access_registration
    }
    fn get(ue: &UdmUe) -> Option<&Self::Record> {
        ue.amf_non_3gpp_access_registration.as_ref()
    }
}

impl AmfSlot for AmfNon3GppAccess {
    fn guami(record: &Self::Record) -> &Guami {
        &record.guami
    }
}

impl AccessSlot for Smsf3GppAccess {
    type Record = SmsfRegistration;
    const RESOURCE: &'static str = "smsf-3gpp-access";

    fn slot(ue: &mut UdmUe) -> &mut Option<Self::Record> {
        &mut ue.smsf_3gpp_access_registration
    }
    fn get(ue: &UdmUe) -> Option<&Self::Record> {
        ue.smsf_3gpp_access_registration.as_ref()
    }
}

impl AccessSlot for SmsfNon3GppAccess {
    type Record = SmsfRegistration;
    const RESOURCE: &'static str = "smsf-non-3gpp-access";

    fn slot(ue: &mut UdmUe) -> &mut Option<Self::Record> {
        &mut ue.smsf_non_3gpp_access_registration
    }
    fn get(ue: &UdmUe) -> Option<&Self::Record> {
        ue.smsf_non_3gpp_access_registration.as_ref()
    }
}

/// Outcome of a registration upsert
#[derive(Debug, Clone, PartialEq)]
pub struct Registered<R> {
    /// No record existed before
    pub created: bool,
    pub location: String,
    pub record: R,
    /// Record replaced by this registration
    pub displaced: Option<R>,
}

impl<R: Serialize> Registered<R> {
    /// Created with Location when new, plain success when replacing
    pub fn into_response(self) -> UdmResponse<R> {
        if self.created {
            UdmResponse::created(self.location, self.record)
        } else {
            UdmResponse::ok(self.record)
        }
    }
}

pub fn registration_location(supi: &str, resource: &str) -> String {
    format!("/nudm-uecm/v1/{supi}/registrations/{resource}")
}

/// Create or replace the access-type registration of a UE
pub fn register<S: AccessSlot>(
    context: &UdmContext,
    supi: &str,
    record: S::Record,
) -> Result<Registered<S::Record>, ProblemDetails> {
    let ue = context.get(supi).ok_or_else(|| {
        log::error!("[{}] Registration for unknown UE ({})", supi, S::RESOURCE);
        user_not_found()
    })?;

    let displaced = S::slot(&mut ue_write(&ue)).replace(record.clone());
    let created = displaced.is_none();
    log::info!(
        "[{}] {} registration {}",
        supi,
        S::RESOURCE,
        if created { "created" } else { "replaced" }
    );

    Ok(Registered {
        created,
        location: registration_location(supi, S::RESOURCE),
        record,
        displaced,
    })
}

/// Read the access-type registration of a UE; absent for unknown UEs too
pub fn get_registration<S: AccessSlot>(
    context: &UdmContext,
    supi: &str,
    supported_features: Option<&str>,
) -> Option<S::Record> {
    if let Some(features) = supported_features {
        log::debug!("[{}] GET {} supported-features={}", supi, S::RESOURCE, features);
    }

    let ue = context.get(supi)?;
    let ue = ue_read(&ue);
    S::get(&ue).cloned()
}

/// Turn an AMF registration modification into patch items.
///
/// A GUAMI must equal the stored one and then marks the registration as purged.
pub fn modification_patch_items(
    stored_guami: &Guami,
    modification: &AmfRegistrationModification,
) -> Result<Vec<PatchItem>, ProblemDetails> {
    let mut items = Vec::new();
    let mut purge = modification.purge_flag.unwrap_or(false);

    if let Some(guami) = &modification.guami {
        if guami != stored_guami {
            return Err(invalid_guami());
        }
        purge = true;
        items.push(PatchItem::replace("/guami", to_json(guami)?));
    }
    if purge {
        items.push(PatchItem::add("/purgeFlag", serde_json::Value::Bool(true)));
    }
    if let Some(pei) = &modification.pei {
        items.push(PatchItem::add("/pei", serde_json::Value::String(pei.clone())));
    }
    if let Some(ims_vo_ps) = &modification.ims_vo_ps {
        items.push(PatchItem::add("/imsVoPs", serde_json::Value::String(ims_vo_ps.clone())));
    }
    if let Some(backup) = &modification.backup_amf_info {
        items.push(PatchItem::add("/backupAmfInfo", to_json(backup)?));
    }

    Ok(items)
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ProblemDetails> {
    serde_json::to_value(value).map_err(|e| modification_not_allowed(e.to_string()))
}

/// Apply a modification to the stored AMF registration
pub fn update_amf_registration<S: AmfSlot>(
    context: &UdmContext,
    supi: &str,
    modification: &AmfRegistrationModification,
) -> Result<(), ProblemDetails> {
    let ue = context.get(supi).ok_or_else(context_not_found)?;
    let mut ue = ue_write(&ue);
    let slot = S::slot(&mut ue);

    let current = slot.as_ref().ok_or_else(|| {
        log::warn!("[{}] No {} registration to update", supi, S::RESOURCE);
        context_not_found()
    })?;

    let items = modification_patch_items(S::guami(current), modification)?;
    let patched = patch_record(current, &items).map_err(|e| {
        log::error!("[{}] {} patch failed: {}", supi, S::RESOURCE, e);
        modification_not_allowed(e.to_string())
    })?;
    *slot = Some(patched);

    log::info!("[{}] {} registration updated ({} items)", supi, S::RESOURCE, items.len());
    Ok(())
}

/// Deregistration to send to an AMF whose 3GPP registration was taken over
pub fn amf_takeover_notice(
    displaced: Option<&Amf3GppAccessRegistration>,
    current: &Amf3GppAccessRegistration,
) -> Option<(String, DeregistrationData)> {
    let old = displaced?;
    if old.guami == current.guami || old.dereg_callback_uri.is_empty() {
        return None;
    }

    Some((
        old.dereg_callback_uri.clone(),
        DeregistrationData {
            dereg_reason: DeregistrationReason::SubscriptionWithdrawn,
            access_type: Some(AccessType::ThreeGppAccess),
            pdu_session_id: None,
        },
    ))
}

/// Parse the pduSessionId path parameter
pub fn parse_pdu_session_id(value: &str) -> Result<i32, ProblemDetails> {
    value
        .parse::<i32>()
        .ok()
        .filter(|id| (0..=MAX_PDU_SESSION_ID).contains(id))
        .ok_or_else(|| mandatory_ie_incorrect("pduSessionId"))
}

/// Create or replace the SMF registration of one PDU session
pub fn register_smf(
    context: &UdmContext,
    supi: &str,
    pdu_session_id: i32,
    mut record: SmfRegistration,
) -> Result<Registered<SmfRegistration>, ProblemDetails> {
    let ue = context.get(supi).ok_or_else(|| {
        log::error!("[{}] SMF registration for unknown UE", supi);
        user_not_found()
    })?;

    record.pdu_session_id = pdu_session_id;
    let displaced = ue_write(&ue)
        .smf_registrations
        .insert(pdu_session_id, record.clone());
    let created = displaced.is_none();
    log::info!("[{}:{}] SMF registration {}", supi, pdu_session_id, if created { "created" } else { "replaced" });

    Ok(Registered {
        created,
        location: registration_location(supi, &format!("smf-registrations/{pdu_session_id}")),
        record,
        displaced,
    })
}

/// Delete the SMF registration of one PDU session
pub fn deregister_smf(context: &UdmContext, supi: &str, pdu_session_id: i32) -> Result<(), ProblemDetails> {
    let ue = context.get(supi).ok_or_else(user_not_found)?;

    let removed = ue_write(&ue).smf_registrations.remove(&pdu_session_id);
    match removed {
        Some(_) => {
            log::info!("[{}:{}] SMF registration deleted", supi, pdu_session_id);
            Ok(())
        }
        None => Err(context_not_found()),
    }
}
