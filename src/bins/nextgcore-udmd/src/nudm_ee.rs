//! Nudm_EE Subscription Handling
//!
//! One logical EE subscription is stored as identical copies, under one id,
//! in every UE context its identity resolves to. Operations on a single UE
//! are strict; group and anyUE operations skip UEs that do not apply.

use ogs_sbi::message::ProblemDetails;

use crate::context::{ue_read, ue_write, UdmContext};
use crate::models::{CreatedEeSubscription, EeSubscription, PatchItem};
use crate::patch::patch_record;
use crate::sbi_response::{
    mandatory_ie_incorrect, modification_not_allowed, subscription_not_found, unspecified_nf_failure,
    user_not_found,
};
use crate::ue_identity::{ResolveError, Resolved, UeIdentity};

pub fn ee_subscription_location(ue_identity: &str, subscription_id: &str) -> String {
    format!("/nudm-ee/v1/{ue_identity}/ee-subscriptions/{subscription_id}")
}

/// Create an EE subscription, returning it with its new id
pub fn create_ee_subscription(
    context: &UdmContext,
    ue_identity: &str,
    subscription: EeSubscription,
) -> Result<(CreatedEeSubscription, String), ProblemDetails> {
    let identity = UeIdentity::parse(ue_identity);
    let mut scope = context.ee_scope_lock();

    let targets = match identity.resolve(context) {
        Ok(resolved) => resolved.into_contexts(),
        Err(ResolveError::NotFound) => {
            log::warn!("[{}] EE subscription for unknown UE", ue_identity);
            return Err(user_not_found());
        }
        Err(ResolveError::Invalid) => {
            log::error!("[{}] Invalid ueIdentity", ue_identity);
            return Err(mandatory_ie_incorrect("ueIdentity"));
        }
    };

    let id = context.ee_subscription_ids().allocate().map_err(|e| {
        log::error!("[{}] {}", ue_identity, e);
        unspecified_nf_failure()
    })?;
    let subscription_id = id.to_string();

    for ue in &targets {
        ue_write(ue)
            .ee_subscriptions
            .insert(subscription_id.clone(), subscription.clone());
    }
    scope.insert(id, identity);
    drop(scope);

    log::info!(
        "[{}] EE subscription created (id={}, ues={})",
        ue_identity,
        subscription_id,
        targets.len()
    );
    Ok((
        CreatedEeSubscription {
            ee_subscription: subscription,
        },
        subscription_id,
    ))
}

/// Delete an EE subscription from every UE the identity resolves to.
///
/// The id is freed once no UE holds a copy anymore, provided this delete
/// names the creating identity or took a copy itself. Unknown ids are a
/// no-op.
pub fn delete_ee_subscription(
    context: &UdmContext,
    ue_identity: &str,
    subscription_id: &str,
) -> Result<(), ProblemDetails> {
    let identity = UeIdentity::parse(ue_identity);
    if let UeIdentity::Invalid(_) = identity {
        return Err(mandatory_ie_incorrect("ueIdentity"));
    }
    let Ok(id) = subscription_id.parse::<i64>() else {
        log::warn!("[{}] Non-numeric EE subscription id {}", ue_identity, subscription_id);
        return Ok(());
    };

    let mut scope = context.ee_scope_lock();
    let Some(owner) = scope.get(&id) else {
        log::debug!("[{}] EE subscription {} is not live", ue_identity, subscription_id);
        return Ok(());
    };
    let owned = *owner == identity;

    let targets = match identity.resolve(context) {
        Ok(resolved) => resolved.into_contexts(),
        Err(_) => Vec::new(),
    };
    let mut removed = 0;
    for ue in &targets {
        if ue_write(ue).ee_subscriptions.remove(subscription_id).is_some() {
            removed += 1;
        }
    }

    let still_held = context
        .snapshot()
        .iter()
        .any(|ue| ue_read(ue).ee_subscriptions.contains_key(subscription_id));
    let released = !still_held && (owned || removed > 0);
    if released {
        scope.remove(&id);
        context.ee_subscription_ids().free(id);
    }
    drop(scope);

    log::info!(
        "[{}] EE subscription deleted (id={}, copies={}{})",
        ue_identity,
        subscription_id,
        removed,
        if released { "" } else { ", id kept" }
    );
    Ok(())
}

/// Apply a patch list to an EE subscription
pub fn update_ee_subscription(
    context: &UdmContext,
    ue_identity: &str,
    subscription_id: &str,
    patch_list: &[PatchItem],
) -> Result<(), ProblemDetails> {
    let identity = UeIdentity::parse(ue_identity);

    match identity.resolve(context) {
        Ok(Resolved::Single(ue)) => {
            let mut ue = ue_write(&ue);
            let current = ue
                .ee_subscriptions
                .get(subscription_id)
                .ok_or_else(subscription_not_found)?;
            let patched = patch_record(current, patch_list).map_err(|e| {
                log::error!("[{}] EE subscription {} patch failed: {}", ue_identity, subscription_id, e);
                modification_not_allowed(e.to_string())
            })?;
            ue.ee_subscriptions.insert(subscription_id.to_string(), patched);
        }
        Ok(Resolved::Group(members)) => {
            for ue in &members {
                let mut ue = ue_write(ue);
                let Some(current) = ue.ee_subscriptions.get(subscription_id) else {
                    continue;
                };
                match patch_record(current, patch_list) {
                    Ok(patched) => {
                        ue.ee_subscriptions.insert(subscription_id.to_string(), patched);
                    }
                    Err(e) => log::warn!(
                        "[{}] Skipping EE subscription {} patch: {}",
                        ue.supi,
                        subscription_id,
                        e
                    ),
                }
            }
        }
        Err(ResolveError::NotFound) => return Err(subscription_not_found()),
        Err(ResolveError::Invalid) => return Err(mandatory_ie_incorrect("ueIdentity")),
    }

    log::info!("[{}] EE subscription updated (id={})", ue_identity, subscription_id);
    Ok(())
}
