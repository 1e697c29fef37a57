//! Property-based tests for the UDM core
//!
//! Identifier allocation, identity classification and EE subscription
//! bookkeeping under arbitrary operation sequences.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::context::{ue_read, UdmContext, UdmUe};
    use crate::id_generator::IdGenerator;
    use crate::models::{AmfRegistrationModification, EeSubscription, Guami, PlmnId};
    use crate::nudm_ee::{create_ee_subscription, delete_ee_subscription};
    use crate::nudm_uecm::modification_patch_items;
    use crate::ue_identity::{UeIdentity, ANY_UE};

    #[derive(Debug, Clone)]
    enum IdOp {
        Allocate,
        /// Free the n-th outstanding id, if any
        Free(usize),
    }

    fn arb_id_op() -> impl Strategy<Value = IdOp> {
        prop_oneof![
            3 => Just(IdOp::Allocate),
            2 => any::<usize>().prop_map(IdOp::Free),
        ]
    }

    fn arb_identity() -> impl Strategy<Value = (String, &'static str)> {
        prop_oneof![
            "[0-9]{5,15}".prop_map(|s| (format!("msisdn-{s}"), "msisdn")),
            "[a-z0-9@.]{1,20}".prop_map(|s| (format!("extid-{s}"), "extid")),
            "[a-z0-9]{1,12}".prop_map(|s| (format!("extgroupid-{s}"), "group")),
            Just((ANY_UE.to_string(), "any")),
            "(imsi|nai|suci)-[0-9]{1,15}".prop_map(|s| (s, "invalid")),
        ]
    }

    fn subscription() -> EeSubscription {
        serde_json::from_value(json!({
            "callbackReference": "http://nef/notify",
            "monitoringConfigurations": {}
        }))
        .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_outstanding_ids_unique_and_in_range(
            min in 0i64..1000,
            span in 0i64..32,
            ops in prop::collection::vec(arb_id_op(), 1..200),
        ) {
            let max = min + span;
            let generator = IdGenerator::new(min, max).unwrap();
            let mut outstanding: Vec<i64> = Vec::new();

            for op in ops {
                match op {
                    IdOp::Allocate => match generator.allocate() {
                        Ok(id) => {
                            prop_assert!(id >= min && id <= max);
                            prop_assert!(!outstanding.contains(&id));
                            outstanding.push(id);
                        }
                        Err(_) => prop_assert_eq!(outstanding.len() as i64, span + 1),
                    },
                    IdOp::Free(n) => {
                        if !outstanding.is_empty() {
                            let id = outstanding.remove(n % outstanding.len());
                            generator.free(id);
                            prop_assert!(!generator.is_allocated(id));
                        }
                    }
                }
                prop_assert_eq!(generator.outstanding(), outstanding.len());
            }
        }

        #[test]
        fn prop_identity_classification((identity, kind) in arb_identity()) {
            let parsed = UeIdentity::parse(&identity);
            let matches_kind = match kind {
                "msisdn" => matches!(parsed, UeIdentity::Msisdn(_)),
                "extid" => matches!(parsed, UeIdentity::ExternalId(_)),
                "group" => matches!(parsed, UeIdentity::ExternalGroupId(_)),
                "any" => parsed == UeIdentity::AnyUe,
                _ => matches!(parsed, UeIdentity::Invalid(_)),
            };
            prop_assert!(matches_kind);
            prop_assert_eq!(parsed.as_str(), identity.as_str());
            prop_assert_eq!(parsed.is_single(), kind == "msisdn" || kind == "extid");
        }

        #[test]
        fn prop_group_subscriptions_release_ids(
            groups in prop::collection::vec(0usize..3, 1..12),
            deletions in prop::collection::vec(any::<usize>(), 0..12),
        ) {
            let context = UdmContext::new(32);
            for (i, group) in groups.iter().enumerate() {
                let supi = format!("imsi-{i}");
                context
                    .put(&supi, UdmUe::new(&supi).with_external_group_id(format!("extgroupid-{group}")))
                    .unwrap();
            }

            let mut live: Vec<(String, String)> = Vec::new();
            for group in 0..3 {
                let identity = format!("extgroupid-{group}");
                let (_, id) = create_ee_subscription(&context, &identity, subscription()).unwrap();
                live.push((identity, id));
            }
            let (_, any_id) = create_ee_subscription(&context, ANY_UE, subscription()).unwrap();
            live.push((ANY_UE.to_string(), any_id));

            let ids: HashSet<&String> = live.iter().map(|(_, id)| id).collect();
            prop_assert_eq!(ids.len(), live.len());

            for n in deletions {
                if live.is_empty() {
                    break;
                }
                let (identity, id) = live.remove(n % live.len());
                delete_ee_subscription(&context, &identity, &id).unwrap();

                for ue in context.snapshot() {
                    prop_assert!(!ue_read(&ue).ee_subscriptions.contains_key(&id));
                }
            }
            prop_assert_eq!(context.ee_subscription_ids().outstanding(), live.len());
        }

        #[test]
        fn prop_purge_follows_guami(
            with_guami in any::<bool>(),
            purge_flag in prop::option::of(any::<bool>()),
            pei in prop::option::of("imeisv-[0-9]{16}"),
        ) {
            let guami = Guami {
                plmn_id: PlmnId { mcc: "001".into(), mnc: "01".into() },
                amf_id: "020040".into(),
            };
            let modification = AmfRegistrationModification {
                guami: with_guami.then(|| guami.clone()),
                purge_flag,
                pei: pei.clone(),
                ..Default::default()
            };

            let items = modification_patch_items(&guami, &modification).unwrap();
            let purged = items.iter().any(|item| item.path == "/purgeFlag");
            prop_assert_eq!(purged, with_guami || purge_flag == Some(true));
            prop_assert_eq!(items.iter().any(|item| item.path == "/pei"), pei.is_some());
        }
    }
}
