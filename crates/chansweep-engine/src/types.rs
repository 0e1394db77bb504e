use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel visibility as reported by the workspace listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelVisibility {
    Public,
    Private,
}

impl ChannelVisibility {
    /// Conversation type tag understood by the listing endpoint.
    pub fn api_type(self) -> &'static str {
        match self {
            Self::Public => "public_channel",
            Self::Private => "private_channel",
        }
    }

    /// Short human-facing label used in table output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Parses a user-supplied visibility name; unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Joins a visibility mask into the comma-separated `types` query parameter.
/// An empty mask falls back to public channels only.
pub fn types_query_param(mask: &[ChannelVisibility]) -> String {
    if mask.is_empty() {
        return ChannelVisibility::Public.api_type().to_string();
    }
    mask.iter()
        .map(|visibility| visibility.api_type())
        .collect::<Vec<_>>()
        .join(",")
}

/// Raw channel datum carried by one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub visibility: ChannelVisibility,
    pub is_member: bool,
}

/// A channel that survived the full discovery filter chain.
///
/// `last_activity` is the timestamp of the newest message observed during
/// the probe; it is always `Some` for channels produced by discovery, since
/// a channel with no observable activity is never reported as stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub visibility: ChannelVisibility,
    pub last_activity: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_visibility_parse_normalizes_case_and_whitespace() {
        assert_eq!(ChannelVisibility::parse("  Public "), Some(ChannelVisibility::Public));
        assert_eq!(ChannelVisibility::parse("PRIVATE"), Some(ChannelVisibility::Private));
        assert_eq!(ChannelVisibility::parse("shared"), None);
        assert_eq!(ChannelVisibility::parse(""), None);
    }

    #[test]
    fn unit_types_query_param_joins_api_type_tags() {
        let mask = vec![ChannelVisibility::Public, ChannelVisibility::Private];
        assert_eq!(types_query_param(&mask), "public_channel,private_channel");
    }

    #[test]
    fn unit_types_query_param_defaults_to_public_when_empty() {
        assert_eq!(types_query_param(&[]), "public_channel");
    }
}
