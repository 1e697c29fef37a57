//! NextGCore UDM (Unified Data Management) Library
//!
//! This crate implements the subscriber registration and event exposure core
//! of the UDM network function for 5G core network: UE context management
//! (AMF/SMF/SMSF registration), EE subscriptions addressed by GPSI, external
//! group or any UE, and notification delivery to subscribed NFs.

pub mod config;
pub mod context;
pub mod id_generator;
pub mod models;
pub mod notifier;
pub mod nudm_ee;
pub mod nudm_handler;
pub mod nudm_uecm;
pub mod patch;
pub mod sbi_response;
pub mod ue_identity;

mod property_tests;

// Re-export commonly used types
pub use config::{ConfigError, UdmConfig};
pub use context::{ContextError, UdmContext, UdmUe, UdmUeRef};
pub use id_generator::IdGenerator;
pub use notifier::{
    notify_data_change, notify_deregistration, DataChangeReport, NotificationClient,
    SbiNotificationClient, TokenContext,
};
pub use nudm_handler::{udm_sbi_request_handler, UdmServices};
pub use sbi_response::{OperationKind, UdmResponse};
pub use ue_identity::{ResolveError, Resolved, UeIdentity};
