//! Canned stack policies for temporary overrides during an update

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ALLOW_ALL: &str =
    r#"{"Statement":[{"Effect":"Allow","Action":"Update:*","Principal":"*","Resource":"*"}]}"#;

const ALLOW_MODIFY: &str = r#"{"Statement":[{"Effect":"Allow","Action":"Update:Modify","Principal":"*","Resource":"*"},{"Effect":"Deny","Action":["Update:Replace","Update:Delete"],"Principal":"*","Resource":"*"}]}"#;

const DENY_DELETE: &str = r#"{"Statement":[{"Effect":"Allow","Action":["Update:Modify","Update:Replace"],"Principal":"*","Resource":"*"},{"Effect":"Deny","Action":"Update:Delete","Principal":"*","Resource":"*"}]}"#;

/// One of the fixed update-protection policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CannedPolicy {
    /// Allows all updates
    AllowAll,
    /// Allows modify and replace, denies delete
    DenyDelete,
    /// Allows modify, denies replace and delete
    AllowModify,
}

impl CannedPolicy {
    pub const ALL: [CannedPolicy; 3] = [
        CannedPolicy::AllowAll,
        CannedPolicy::DenyDelete,
        CannedPolicy::AllowModify,
    ];

    /// The JSON policy document.
    pub fn body(&self) -> &'static str {
        match self {
            CannedPolicy::AllowAll => ALLOW_ALL,
            CannedPolicy::DenyDelete => DENY_DELETE,
            CannedPolicy::AllowModify => ALLOW_MODIFY,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CannedPolicy::AllowAll => "ALLOW_ALL",
            CannedPolicy::DenyDelete => "DENY_DELETE",
            CannedPolicy::AllowModify => "ALLOW_MODIFY",
        }
    }
}

impl fmt::Display for CannedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CannedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CannedPolicy::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown canned policy '{s}' (expected ALLOW_ALL, DENY_DELETE or ALLOW_MODIFY)")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_are_valid_json() {
        for policy in CannedPolicy::ALL {
            let value: serde_json::Value = serde_json::from_str(policy.body()).unwrap();
            assert!(value["Statement"].is_array(), "{policy} has no statements");
        }
    }

    #[test]
    fn test_deny_delete_denies_only_delete() {
        let value: serde_json::Value =
            serde_json::from_str(CannedPolicy::DenyDelete.body()).unwrap();
        let deny = value["Statement"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["Effect"] == "Deny")
            .unwrap();
        assert_eq!(deny["Action"], "Update:Delete");
    }

    #[test]
    fn test_parse() {
        assert_eq!("deny_delete".parse(), Ok(CannedPolicy::DenyDelete));
        assert!("DENY_ALL".parse::<CannedPolicy>().is_err());
    }
}
