//! UDM OpenAPI Models
//!
//! Wire structures of the Nudm_UECM, Nudm_EE and Nudm_SDM services
//! (TS 29.503) in their JSON camelCase representation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// PLMN ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlmnId {
    /// Mobile Country Code
    pub mcc: String,
    /// Mobile Network Code
    pub mnc: String,
}

/// GUAMI (Globally Unique AMF Identifier)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guami {
    pub plmn_id: PlmnId,
    /// AMF Region ID, Set ID and Pointer as 6 hex digits
    pub amf_id: String,
}

/// Single NSSAI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snssai {
    pub sst: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupAmfInfo {
    pub backup_amf: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guami_list: Option<Vec<Guami>>,
}

/// Access type of a registration or deregistration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    #[serde(rename = "3GPP_ACCESS")]
    ThreeGppAccess,
    #[serde(rename = "NON_3GPP_ACCESS")]
    Non3GppAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeregistrationReason {
    UeInitialRegistration,
    UeRegistrationAreaChange,
    SubscriptionWithdrawn,
    #[serde(rename = "5GS_TO_EPS_MOBILITY")]
    FiveGsToEpsMobility,
    #[serde(rename = "5GS_TO_EPS_MOBILITY_UE_INITIAL_REGISTRATION")]
    FiveGsToEpsMobilityUeInitialRegistration,
    ReregistrationRequired,
    SmfContextTransferred,
}

/// Amf3GppAccessRegistration (TS 29.503 6.2.6.2.2)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amf3GppAccessRegistration {
    pub amf_instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purge_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ims_vo_ps: Option<String>,
    pub dereg_callback_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcscf_restoration_callback_uri: Option<String>,
    pub guami: Guami,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_amf_info: Option<Vec<BackupAmfInfo>>,
    pub rat_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_registration_ind: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_time: Option<String>,
}

/// AmfNon3GppAccessRegistration (TS 29.503 6.2.6.2.3)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfNon3GppAccessRegistration {
    pub amf_instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purge_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pei: Option<String>,
    pub ims_vo_ps: String,
    pub dereg_callback_uri: String,
    pub guami: Guami,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_amf_info: Option<Vec<BackupAmfInfo>>,
    pub rat_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_time: Option<String>,
}

/// Amf3GppAccessRegistrationModification / AmfNon3GppAccessRegistrationModification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfRegistrationModification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guami: Option<Guami>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purge_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ims_vo_ps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_amf_info: Option<Vec<BackupAmfInfo>>,
}

/// SmfRegistration (TS 29.503 6.2.6.2.4)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmfRegistration {
    pub smf_instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smf_set_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    pub pdu_session_id: i32,
    pub single_nssai: Snssai,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_services: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcscf_restoration_callback_uri: Option<String>,
    pub plmn_id: PlmnId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgw_fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_time: Option<String>,
}

/// SmsfRegistration (TS 29.503 6.2.6.2.5)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsfRegistration {
    pub smsf_instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smsf_set_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    pub plmn_id: PlmnId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smsf_map_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smsf_diameter_address: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_time: Option<String>,
}

/// DeregistrationData sent to the AMF deregistration callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeregistrationData {
    pub dereg_reason: DeregistrationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_type: Option<AccessType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdu_session_id: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfiguration {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immediate_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_reporting_configuration: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_num_of_reports: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

/// EeSubscription (TS 29.503 6.4.6.2.2)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EeSubscription {
    pub callback_reference: String,
    pub monitoring_configurations: BTreeMap<String, MonitoringConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_options: Option<ReportingOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scef_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEeSubscription {
    pub ee_subscription: EeSubscription,
}

/// SdmSubscription (TS 29.503 6.1.6.2.3); the UDM keeps these as data-change notification targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdmSubscription {
    pub nf_instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit_unsubscribe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    pub callback_reference: String,
    #[serde(default)]
    pub monitored_resource_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
}

/// JSON patch operation (RFC 6902)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Copy,
    Move,
    Remove,
    Replace,
    Test,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchItem {
    pub op: PatchOperation,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl PatchItem {
    pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOperation::Add,
            path: path.into(),
            from: None,
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOperation::Replace,
            path: path.into(),
            from: None,
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Add,
    Move,
    Remove,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    pub op: ChangeType,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyItem {
    pub resource_id: String,
    #[serde(default)]
    pub changed_items: Vec<ChangeItem>,
}

/// Body of a data change notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationNotification {
    pub notify_items: Vec<NotifyItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amf_registration_wire_names() {
        let registration: Amf3GppAccessRegistration = serde_json::from_value(json!({
            "amfInstanceId": "amf-1",
            "deregCallbackUri": "http://127.0.0.5:7777/namf-callback/v1/imsi-001/dereg-notify",
            "guami": { "plmnId": { "mcc": "001", "mnc": "01" }, "amfId": "020040" },
            "ratType": "NR",
            "initialRegistrationInd": true
        }))
        .unwrap();

        assert_eq!(registration.guami.amf_id, "020040");
        assert_eq!(registration.initial_registration_ind, Some(true));

        let value = serde_json::to_value(&registration).unwrap();
        assert!(value.get("purgeFlag").is_none());
        assert_eq!(value["guami"]["plmnId"]["mcc"], "001");
    }

    #[test]
    fn test_deregistration_data_enums() {
        let data = DeregistrationData {
            dereg_reason: DeregistrationReason::SubscriptionWithdrawn,
            access_type: Some(AccessType::ThreeGppAccess),
            pdu_session_id: None,
        };
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({ "deregReason": "SUBSCRIPTION_WITHDRAWN", "accessType": "3GPP_ACCESS" })
        );
    }

    #[test]
    fn test_patch_item_ops() {
        let item: PatchItem =
            serde_json::from_value(json!({ "op": "replace", "path": "/callbackReference", "value": "x" }))
                .unwrap();
        assert_eq!(item.op, PatchOperation::Replace);
        assert_eq!(item, PatchItem::replace("/callbackReference", json!("x")));
    }
}
