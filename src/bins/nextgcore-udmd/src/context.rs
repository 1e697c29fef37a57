//! UDM Context Management
//!
//! Subscriber context registry: one [`UdmUe`] per SUPI behind its own lock,
//! a GPSI alias hash, the EE subscription ID generator and the index of
//! live EE subscription ids.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::id_generator::IdGenerator;
use crate::models::{
    Amf3GppAccessRegistration, AmfNon3GppAccessRegistration, EeSubscription, SdmSubscription,
    SmfRegistration, SmsfRegistration,
};
use crate::ue_identity::UeIdentity;

/// Registry and allocator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Maximum number of UEs [{0}] reached")]
    UeCapacity(usize),

    #[error("Subscription ID space [{min}..={max}] exhausted")]
    IdExhausted { min: i64, max: i64 },

    #[error("Invalid subscription ID range [{min}..={max}]")]
    InvalidIdRange { min: i64, max: i64 },
}

/// UDM UE context
#[derive(Debug, Clone, Default)]
pub struct UdmUe {
    /// SUPI (registry key)
    pub supi: String,
    /// GPSIs (msisdn-/extid- aliases)
    pub gpsis: Vec<String>,
    /// External group identifier (extgroupid-...)
    pub external_group_id: Option<String>,
    pub amf_3gpp_access_registration: Option<Amf3GppAccessRegistration>,
    pub amf_non_3gpp_access_registration: Option<AmfNon3GppAccessRegistration>,
    pub smsf_3gpp_access_registration: Option<SmsfRegistration>,
    pub smsf_non_3gpp_access_registration: Option<SmsfRegistration>,
    /// SMF registrations by PDU session ID
    pub smf_registrations: HashMap<i32, SmfRegistration>,
    /// EE subscriptions by subscription ID
    pub ee_subscriptions: HashMap<String, EeSubscription>,
    /// Data change notification targets, in subscription order
    pub sdm_subscriptions: Vec<SdmSubscription>,
}

impl UdmUe {
    pub fn new(supi: impl Into<String>) -> Self {
        Self {
            supi: supi.into(),
            ..Default::default()
        }
    }

    pub fn with_gpsi(mut self, gpsi: impl Into<String>) -> Self {
        self.gpsis.push(gpsi.into());
        self
    }

    pub fn with_external_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.external_group_id = Some(group_id.into());
        self
    }

    /// Check whether the UE belongs to the given external group
    pub fn in_group(&self, group_id: &str) -> bool {
        self.external_group_id.as_deref() == Some(group_id)
    }

    /// Add an SDM subscription, returning its ID
    pub fn sdm_subscription_add(&mut self, mut subscription: SdmSubscription) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        subscription.subscription_id = Some(id.clone());
        self.sdm_subscriptions.push(subscription);
        log::debug!("[{}] SDM subscription added (id={})", self.supi, id);
        id
    }

    /// Remove an SDM subscription by ID
    pub fn sdm_subscription_remove(&mut self, id: &str) -> Option<SdmSubscription> {
        let pos = self
            .sdm_subscriptions
            .iter()
            .position(|s| s.subscription_id.as_deref() == Some(id))?;
        log::debug!("[{}] SDM subscription removed (id={})", self.supi, id);
        Some(self.sdm_subscriptions.remove(pos))
    }
}

/// Shared handle to a UE context
pub type UdmUeRef = Arc<RwLock<UdmUe>>;

/// Read-lock a UE context
pub fn ue_read(ue: &UdmUeRef) -> RwLockReadGuard<'_, UdmUe> {
    ue.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-lock a UE context
pub fn ue_write(ue: &UdmUeRef) -> RwLockWriteGuard<'_, UdmUe> {
    ue.write().unwrap_or_else(PoisonError::into_inner)
}

/// Drop a GPSI alias only while it still points at `supi`
fn remove_alias(gpsi_hash: &mut HashMap<String, String>, gpsi: &str, supi: &str) {
    if gpsi_hash.get(gpsi).is_some_and(|owner| owner == supi) {
        gpsi_hash.remove(gpsi);
    }
}

/// Live EE subscription id -> identity it was created for
pub type EeScope = HashMap<i64, UeIdentity>;

/// UDM Context - created once at startup and shared by `Arc`
pub struct UdmContext {
    /// UE list (SUPI -> context)
    ue_list: RwLock<HashMap<String, UdmUeRef>>,
    /// GPSI hash (GPSI -> SUPI)
    gpsi_hash: RwLock<HashMap<String, String>>,
    /// Maximum number of UEs
    max_num_of_ue: usize,
    /// EE subscription ID generator
    ee_subscription_ids: IdGenerator,
    /// Live EE subscription ids and the identity that created them
    ee_subscription_scope: RwLock<EeScope>,
}

impl UdmContext {
    /// Create a new UDM context with the default EE subscription ID range
    pub fn new(max_ue: usize) -> Self {
        Self::with_id_generator(max_ue, IdGenerator::default())
    }

    /// Create a new UDM context with a given EE subscription ID generator
    pub fn with_id_generator(max_ue: usize, ee_subscription_ids: IdGenerator) -> Self {
        log::info!("UDM context initialized with max {} UEs", max_ue);
        Self {
            ue_list: RwLock::new(HashMap::new()),
            gpsi_hash: RwLock::new(HashMap::new()),
            max_num_of_ue: max_ue,
            ee_subscription_ids,
            ee_subscription_scope: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_num_of_ue(&self) -> usize {
        self.max_num_of_ue
    }

    /// Find UE by SUPI
    pub fn get(&self, supi: &str) -> Option<UdmUeRef> {
        let ue_list = self.ue_list.read().unwrap_or_else(PoisonError::into_inner);
        ue_list.get(supi).cloned()
    }

    /// Insert or replace the UE stored under `supi`
    pub fn put(&self, supi: &str, mut ue: UdmUe) -> Result<UdmUeRef, ContextError> {
        let mut ue_list = self.ue_list.write().unwrap_or_else(PoisonError::into_inner);
        let mut gpsi_hash = self.gpsi_hash.write().unwrap_or_else(PoisonError::into_inner);

        if !ue_list.contains_key(supi) && ue_list.len() >= self.max_num_of_ue {
            log::error!("Maximum number of UEs [{}] reached", self.max_num_of_ue);
            return Err(ContextError::UeCapacity(self.max_num_of_ue));
        }

        if let Some(old) = ue_list.get(supi) {
            for gpsi in &ue_read(old).gpsis {
                remove_alias(&mut gpsi_hash, gpsi, supi);
            }
        }

        ue.supi = supi.to_string();
        for gpsi in &ue.gpsis {
            gpsi_hash.insert(gpsi.clone(), supi.to_string());
        }

        let ue = Arc::new(RwLock::new(ue));
        ue_list.insert(supi.to_string(), ue.clone());

        log::debug!("[{}] UDM UE stored", supi);
        Ok(ue)
    }

    /// Return the UE for `supi`, creating an empty context if absent
    pub fn ue_add(&self, supi: &str) -> Result<UdmUeRef, ContextError> {
        if let Some(ue) = self.get(supi) {
            return Ok(ue);
        }
        self.put(supi, UdmUe::new(supi))
    }

    /// Remove a UE. EE subscription ids scoped to this single UE are freed.
    pub fn ue_remove(&self, supi: &str) -> Option<UdmUeRef> {
        let ue = {
            let mut ue_list = self.ue_list.write().unwrap_or_else(PoisonError::into_inner);
            let mut gpsi_hash = self.gpsi_hash.write().unwrap_or_else(PoisonError::into_inner);

            let ue = ue_list.remove(supi)?;
            for gpsi in &ue_read(&ue).gpsis {
                remove_alias(&mut gpsi_hash, gpsi, supi);
            }
            ue
        };

        let mut scope = self.ee_scope_lock();
        let (gpsis, ee_ids): (Vec<String>, Vec<String>) = {
            let removed = ue_read(&ue);
            (removed.gpsis.clone(), removed.ee_subscriptions.keys().cloned().collect())
        };
        for id in ee_ids.iter().filter_map(|id| id.parse::<i64>().ok()) {
            let single = matches!(
                scope.get(&id),
                Some(UeIdentity::Msisdn(g)) | Some(UeIdentity::ExternalId(g)) if gpsis.contains(g)
            );
            if single {
                scope.remove(&id);
                self.ee_subscription_ids.free(id);
            }
        }
        drop(scope);

        log::debug!("[{}] UDM UE removed", supi);
        Some(ue)
    }

    /// Find UE by GPSI
    pub fn find_by_gpsi(&self, gpsi: &str) -> Option<UdmUeRef> {
        let ue_list = self.ue_list.read().unwrap_or_else(PoisonError::into_inner);
        let gpsi_hash = self.gpsi_hash.read().unwrap_or_else(PoisonError::into_inner);

        gpsi_hash.get(gpsi).and_then(|supi| ue_list.get(supi).cloned())
    }

    /// Handles to every UE at this instant
    pub fn snapshot(&self) -> Vec<UdmUeRef> {
        let ue_list = self.ue_list.read().unwrap_or_else(PoisonError::into_inner);
        ue_list.values().cloned().collect()
    }

    /// Visit every UE of a snapshot; the registry stays unlocked while visiting
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&UdmUeRef),
    {
        for ue in self.snapshot() {
            visitor(&ue);
        }
    }

    /// Get number of UEs
    pub fn ue_count(&self) -> usize {
        self.ue_list
            .read()
            .map(|l| l.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    /// Get UE load percentage
    pub fn get_ue_load(&self) -> i32 {
        if self.max_num_of_ue == 0 {
            return 0;
        }
        ((self.ue_count() * 100) / self.max_num_of_ue) as i32
    }

    pub fn ee_subscription_ids(&self) -> &IdGenerator {
        &self.ee_subscription_ids
    }

    /// Lock the live EE subscription index.
    ///
    /// EE create, delete and UE removal hold this guard from liveness check
    /// to allocator update. Lock order: scope, then registry, then UE.
    pub fn ee_scope_lock(&self) -> RwLockWriteGuard<'_, EeScope> {
        self.ee_subscription_scope
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ee_scope_get(&self, id: i64) -> Option<UeIdentity> {
        self.ee_subscription_scope
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

impl Default for UdmContext {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPI: &str = "imsi-001010000000001";

    #[test]
    fn test_put_get() {
        let ctx = UdmContext::new(16);
        assert!(ctx.get(SUPI).is_none());

        ctx.put(SUPI, UdmUe::new(SUPI).with_gpsi("msisdn-0900000001"))
            .unwrap();
        assert_eq!(ctx.ue_count(), 1);
        assert_eq!(ue_read(&ctx.get(SUPI).unwrap()).supi, SUPI);

        let found = ctx.find_by_gpsi("msisdn-0900000001").unwrap();
        assert_eq!(ue_read(&found).supi, SUPI);
        assert!(ctx.find_by_gpsi("msisdn-0900000002").is_none());
    }

    #[test]
    fn test_put_replaces_gpsi_aliases() {
        let ctx = UdmContext::new(16);
        ctx.put(SUPI, UdmUe::new(SUPI).with_gpsi("msisdn-1")).unwrap();
        ctx.put(SUPI, UdmUe::new(SUPI).with_gpsi("extid-a@example.org"))
            .unwrap();

        assert_eq!(ctx.ue_count(), 1);
        assert!(ctx.find_by_gpsi("msisdn-1").is_none());
        assert!(ctx.find_by_gpsi("extid-a@example.org").is_some());
    }

    #[test]
    fn test_capacity() {
        let ctx = UdmContext::new(1);
        ctx.ue_add(SUPI).unwrap();
        // existing key is still accepted
        ctx.ue_add(SUPI).unwrap();
        ctx.put(SUPI, UdmUe::new(SUPI)).unwrap();

        assert_eq!(
            ctx.ue_add("imsi-001010000000002").unwrap_err(),
            ContextError::UeCapacity(1)
        );
        assert_eq!(ctx.get_ue_load(), 100);
    }

    #[test]
    fn test_ue_remove() {
        let ctx = UdmContext::new(16);
        ctx.put(SUPI, UdmUe::new(SUPI).with_gpsi("msisdn-1")).unwrap();

        assert!(ctx.ue_remove(SUPI).is_some());
        assert!(ctx.ue_remove(SUPI).is_none());
        assert!(ctx.find_by_gpsi("msisdn-1").is_none());
        assert_eq!(ctx.ue_count(), 0);
    }

    #[test]
    fn test_shared_alias_survives_other_owner() {
        let ctx = UdmContext::new(16);
        ctx.put("imsi-1", UdmUe::new("imsi-1").with_gpsi("msisdn-1")).unwrap();
        // a later put claims the alias
        ctx.put("imsi-2", UdmUe::new("imsi-2").with_gpsi("msisdn-1")).unwrap();

        ctx.ue_remove("imsi-1");
        assert_eq!(ue_read(&ctx.find_by_gpsi("msisdn-1").unwrap()).supi, "imsi-2");

        ctx.put("imsi-1", UdmUe::new("imsi-1").with_gpsi("msisdn-1")).unwrap();
        ctx.put("imsi-1", UdmUe::new("imsi-1")).unwrap();
        assert!(ctx.find_by_gpsi("msisdn-1").is_none());
    }

    #[test]
    fn test_ue_remove_frees_single_scope_ids() {
        let ctx = UdmContext::new(16);
        let ue = ctx.put(SUPI, UdmUe::new(SUPI).with_gpsi("msisdn-1")).unwrap();

        let single = ctx.ee_subscription_ids().allocate().unwrap();
        let group = ctx.ee_subscription_ids().allocate().unwrap();
        {
            let mut scope = ctx.ee_scope_lock();
            scope.insert(single, UeIdentity::Msisdn("msisdn-1".into()));
            scope.insert(group, UeIdentity::AnyUe);
        }
        {
            let mut ue = ue_write(&ue);
            ue.ee_subscriptions.insert(single.to_string(), EeSubscription::default());
            ue.ee_subscriptions.insert(group.to_string(), EeSubscription::default());
        }

        ctx.ue_remove(SUPI);
        assert!(!ctx.ee_subscription_ids().is_allocated(single));
        assert!(ctx.ee_scope_get(single).is_none());
        assert!(ctx.ee_subscription_ids().is_allocated(group));
    }

    #[test]
    fn test_concurrent_writers_on_one_ue() {
        let ctx = Arc::new(UdmContext::new(16));
        ctx.ue_add(SUPI).unwrap();

        let sessions = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for id in 0..200 {
                    let ue = ctx.get(SUPI).unwrap();
                    ue_write(&ue).smf_registrations.insert(id, SmfRegistration::default());
                }
            })
        };
        let sdm = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let ue = ctx.get(SUPI).unwrap();
                    ue_write(&ue).sdm_subscription_add(SdmSubscription::default());
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ctx = ctx.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        assert!(ctx.find_by_gpsi("msisdn-none").is_none());
                        ctx.for_each(|ue| assert_eq!(ue_read(ue).supi, SUPI));
                    }
                })
            })
            .collect();

        sessions.join().unwrap();
        sdm.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        let ue = ctx.get(SUPI).unwrap();
        let ue = ue_read(&ue);
        assert_eq!(ue.smf_registrations.len(), 200);
        assert_eq!(ue.sdm_subscriptions.len(), 200);
    }

    #[test]
    fn test_for_each_snapshot_tolerates_mutation() {
        let ctx = UdmContext::new(16);
        for i in 1..=4 {
            ctx.ue_add(&format!("imsi-00101000000000{i}")).unwrap();
        }

        let mut visited = 0;
        ctx.for_each(|ue| {
            visited += 1;
            // removing while visiting must neither deadlock nor shorten the walk
            let supi = ue_read(ue).supi.clone();
            ctx.ue_remove(&supi);
        });

        assert_eq!(visited, 4);
        assert_eq!(ctx.ue_count(), 0);
    }

    #[test]
    fn test_sdm_subscription_add_remove() {
        let mut ue = UdmUe::new(SUPI);
        let id = ue.sdm_subscription_add(SdmSubscription {
            nf_instance_id: "amf-1".into(),
            callback_reference: "http://127.0.0.5:7777/cb".into(),
            ..Default::default()
        });

        assert_eq!(ue.sdm_subscriptions.len(), 1);
        assert_eq!(ue.sdm_subscriptions[0].subscription_id.as_deref(), Some(id.as_str()));
        assert!(ue.sdm_subscription_remove("unknown").is_none());
        assert!(ue.sdm_subscription_remove(&id).is_some());
        assert!(ue.sdm_subscriptions.is_empty());
    }
}
