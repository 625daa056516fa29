//! Tracked identifier families and the storage keys derived from them.
//!
//! Every name a kind is known by (URL parameter, report parameter,
//! confirmation parameter, cookie/local-storage prefixes) lives in one table
//! here, so the beacons never concatenate key strings on their own.

use std::fmt;

/// The two identifier families tracked by the beacons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierKind {
    /// Click id issued by the affiliate network.
    ClickId,
    /// Partner link id (arrives as an ad-click id on the landing URL).
    PartnerLinkId,
}

impl IdentifierKind {
    /// All kinds, in the order they appear in outbound query strings.
    pub const ALL: [IdentifierKind; 2] = [IdentifierKind::ClickId, IdentifierKind::PartnerLinkId];

    /// Query key carrying this kind on a landing URL and in resolution responses.
    pub fn landing_key(self) -> &'static str {
        match self {
            Self::ClickId => "cid",
            Self::PartnerLinkId => "gclid",
        }
    }

    /// Query key used by the conversion report.
    pub fn report_key(self) -> &'static str {
        match self {
            Self::ClickId => "cid",
            Self::PartnerLinkId => "plid",
        }
    }

    /// Query key used by the first-party confirmation request.
    pub fn confirmation_key(self) -> &'static str {
        match self {
            Self::ClickId => "cid",
            Self::PartnerLinkId => "gclid",
        }
    }

    /// Prefix of the cookie / local-storage key holding the value.
    pub fn value_prefix(self) -> &'static str {
        match self {
            Self::ClickId => "CL_",
            Self::PartnerLinkId => "PL_",
        }
    }

    /// Prefix of the cookie holding the provenance tag.
    pub fn tag_prefix(self) -> &'static str {
        match self {
            Self::ClickId => "ACT_",
            Self::PartnerLinkId => "APT_",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClickId => f.write_str("click id"),
            Self::PartnerLinkId => f.write_str("partner link id"),
        }
    }
}

/// A namespaced cookie / local-storage key: `{prefix}{page_id}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Key holding the identifier value.
    pub fn value(kind: IdentifierKind, page_id: &str) -> Self {
        Self(format!("{}{}", kind.value_prefix(), page_id))
    }

    /// Key holding the provenance tag of the identifier value.
    pub fn tag(kind: IdentifierKind, page_id: &str) -> Self {
        Self(format!("{}{}", kind.tag_prefix(), page_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where a stored identifier value came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// Read from cookies; carries the companion tag cookie's value.
    Cookie(String),
    /// Read from local storage because no cookie held the value.
    LocalStorage,
    /// Written into cookies by the landing script itself.
    ScriptSet,
}

impl Provenance {
    /// Tag as it appears on the wire and in tag cookies.
    pub fn wire_tag(&self) -> &str {
        match self {
            Self::Cookie(tag) => tag,
            Self::LocalStorage => "ls",
            Self::ScriptSet => "js",
        }
    }
}

/// A stored identifier together with its provenance, if known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierPair {
    pub kind: IdentifierKind,
    pub value: String,
    pub provenance: Option<Provenance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_page() {
        assert_eq!(StorageKey::value(IdentifierKind::ClickId, "abc").as_str(), "CL_abc");
        assert_eq!(StorageKey::tag(IdentifierKind::ClickId, "abc").as_str(), "ACT_abc");
        assert_eq!(StorageKey::value(IdentifierKind::PartnerLinkId, "abc").as_str(), "PL_abc");
        assert_eq!(StorageKey::tag(IdentifierKind::PartnerLinkId, "abc").as_str(), "APT_abc");
    }

    #[test]
    fn kinds_never_share_keys() {
        let [a, b] = IdentifierKind::ALL;
        assert_ne!(StorageKey::value(a, "p"), StorageKey::value(b, "p"));
        assert_ne!(StorageKey::tag(a, "p"), StorageKey::tag(b, "p"));
        assert_ne!(StorageKey::value(a, "p"), StorageKey::tag(a, "p"));
    }

    #[test]
    fn provenance_wire_tags() {
        assert_eq!(Provenance::LocalStorage.wire_tag(), "ls");
        assert_eq!(Provenance::ScriptSet.wire_tag(), "js");
        assert_eq!(Provenance::Cookie("js".into()).wire_tag(), "js");
    }
}
