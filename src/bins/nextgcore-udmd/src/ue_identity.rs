//! UE Identity Resolution
//!
//! The `ueIdentity` path parameter of Nudm_EE (TS 29.503 6.4.3.2) addresses
//! one UE by GPSI, every UE of an external group, or any UE.

use std::fmt;

use crate::context::{ue_read, UdmContext, UdmUeRef};

pub const MSISDN_PREFIX: &str = "msisdn-";
pub const EXTERNAL_ID_PREFIX: &str = "extid-";
pub const EXTERNAL_GROUP_ID_PREFIX: &str = "extgroupid-";
pub const ANY_UE: &str = "anyUE";

/// Classified UE identity; variants keep the full identity string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UeIdentity {
    /// GPSI in MSISDN form, a single UE
    Msisdn(String),
    /// GPSI in external identifier form, a single UE
    ExternalId(String),
    /// Every UE whose external group matches
    ExternalGroupId(String),
    /// Every UE in the registry
    AnyUe,
    Invalid(String),
}

impl UeIdentity {
    pub fn parse(identity: &str) -> Self {
        if identity.starts_with(MSISDN_PREFIX) {
            Self::Msisdn(identity.to_string())
        } else if identity.starts_with(EXTERNAL_ID_PREFIX) {
            Self::ExternalId(identity.to_string())
        } else if identity.starts_with(EXTERNAL_GROUP_ID_PREFIX) {
            Self::ExternalGroupId(identity.to_string())
        } else if identity == ANY_UE {
            Self::AnyUe
        } else {
            Self::Invalid(identity.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Msisdn(s) | Self::ExternalId(s) | Self::ExternalGroupId(s) | Self::Invalid(s) => s,
            Self::AnyUe => ANY_UE,
        }
    }

    /// Whether the identity addresses exactly one UE
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Msisdn(_) | Self::ExternalId(_))
    }

    /// Resolve against the registry.
    ///
    /// Group and wildcard identities scan a snapshot and may resolve to no UE
    /// at all; that is not an error.
    pub fn resolve(&self, context: &UdmContext) -> Result<Resolved, ResolveError> {
        match self {
            Self::Msisdn(gpsi) | Self::ExternalId(gpsi) => context
                .find_by_gpsi(gpsi)
                .map(Resolved::Single)
                .ok_or(ResolveError::NotFound),
            Self::ExternalGroupId(group) => {
                let mut members = context.snapshot();
                members.retain(|ue| ue_read(ue).in_group(group));
                Ok(Resolved::Group(members))
            }
            Self::AnyUe => Ok(Resolved::Group(context.snapshot())),
            Self::Invalid(_) => Err(ResolveError::Invalid),
        }
    }
}

impl From<&str> for UeIdentity {
    fn from(identity: &str) -> Self {
        Self::parse(identity)
    }
}

impl fmt::Display for UeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UE contexts an identity resolved to
#[derive(Debug)]
pub enum Resolved {
    Single(UdmUeRef),
    Group(Vec<UdmUeRef>),
}

impl Resolved {
    pub fn into_contexts(self) -> Vec<UdmUeRef> {
        match self {
            Self::Single(ue) => vec![ue],
            Self::Group(members) => members,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// Single-UE identity with no matching GPSI
    NotFound,
    /// Identity in none of the recognized forms
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UdmUe;

    fn context() -> UdmContext {
        let ctx = UdmContext::new(16);
        ctx.put(
            "imsi-001010000000001",
            UdmUe::new("imsi-001010000000001")
                .with_gpsi("msisdn-0900000001")
                .with_external_group_id("extgroupid-team"),
        )
        .unwrap();
        ctx.put(
            "imsi-001010000000002",
            UdmUe::new("imsi-001010000000002")
                .with_gpsi("extid-ue2@example.org")
                .with_external_group_id("extgroupid-team"),
        )
        .unwrap();
        ctx.put("imsi-001010000000003", UdmUe::new("imsi-001010000000003"))
            .unwrap();
        ctx
    }

    #[test]
    fn test_parse() {
        assert_eq!(UeIdentity::parse("msisdn-1234"), UeIdentity::Msisdn("msisdn-1234".into()));
        assert_eq!(UeIdentity::parse("extid-a@b"), UeIdentity::ExternalId("extid-a@b".into()));
        assert_eq!(
            UeIdentity::parse("extgroupid-g"),
            UeIdentity::ExternalGroupId("extgroupid-g".into())
        );
        assert_eq!(UeIdentity::parse("anyUE"), UeIdentity::AnyUe);
        assert_eq!(UeIdentity::parse("anyue"), UeIdentity::Invalid("anyue".into()));
        assert_eq!(
            UeIdentity::parse("imsi-001010000000001"),
            UeIdentity::Invalid("imsi-001010000000001".into())
        );
        assert_eq!(UeIdentity::parse("anyUE").to_string(), "anyUE");
    }

    #[test]
    fn test_resolve_single() {
        let ctx = context();

        let resolved = UeIdentity::parse("extid-ue2@example.org").resolve(&ctx).unwrap();
        let Resolved::Single(ue) = resolved else {
            panic!("expected a single UE");
        };
        assert_eq!(ue_read(&ue).supi, "imsi-001010000000002");

        assert_eq!(
            UeIdentity::parse("msisdn-1234").resolve(&ctx).unwrap_err(),
            ResolveError::NotFound
        );
    }

    #[test]
    fn test_resolve_group_and_any() {
        let ctx = context();

        let group = UeIdentity::parse("extgroupid-team").resolve(&ctx).unwrap();
        assert_eq!(group.into_contexts().len(), 2);

        let empty = UeIdentity::parse("extgroupid-nobody").resolve(&ctx).unwrap();
        assert!(empty.into_contexts().is_empty());

        let all = UeIdentity::AnyUe.resolve(&ctx).unwrap();
        assert_eq!(all.into_contexts().len(), 3);
    }

    #[test]
    fn test_resolve_invalid() {
        let ctx = context();
        assert_eq!(
            UeIdentity::parse("bogus").resolve(&ctx).unwrap_err(),
            ResolveError::Invalid
        );
    }
}
