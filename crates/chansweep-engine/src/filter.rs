use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{ChannelRecord, ChannelVisibility};

/// Immutable per-run filtering input shared by every predicate.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    /// Channels whose last activity is strictly before this instant count
    /// as stale.
    pub stale_cutoff: DateTime<Utc>,
    /// Case-sensitive substring the channel name must contain. Empty means
    /// no keyword filtering.
    pub keyword: String,
    /// Channel names exempt from discovery.
    pub skip_set: HashSet<String>,
    /// Visibility classes requested from the listing endpoint.
    pub type_mask: Vec<ChannelVisibility>,
}

/// Cheap predicates evaluated before any per-channel I/O: membership,
/// skip-list exemption, and the optional keyword match. A record that fails
/// here must never be probed.
pub fn passes_prefilters(record: &ChannelRecord, criteria: &FilterCriteria) -> bool {
    if !record.is_member {
        return false;
    }
    if criteria.skip_set.contains(&record.name) {
        return false;
    }
    if !criteria.keyword.is_empty() && !record.name.contains(&criteria.keyword) {
        return false;
    }
    true
}

/// Staleness predicate: the newest activity must exist and lie strictly
/// before the cutoff. A channel with no observed activity never qualifies;
/// it is excluded rather than flagged.
pub fn is_stale(activity: Option<DateTime<Utc>>, cutoff: DateTime<Utc>) -> bool {
    matches!(activity, Some(last) if last < cutoff)
}

/// Full filter chain: a channel is reported iff every predicate passes.
pub fn passes_all(
    record: &ChannelRecord,
    activity: Option<DateTime<Utc>>,
    criteria: &FilterCriteria,
) -> bool {
    passes_prefilters(record, criteria) && is_stale(activity, criteria.stale_cutoff)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;

    fn record(name: &str, is_member: bool) -> ChannelRecord {
        ChannelRecord {
            id: format!("C-{name}"),
            name: name.to_string(),
            visibility: ChannelVisibility::Public,
            is_member,
        }
    }

    fn criteria(cutoff: DateTime<Utc>) -> FilterCriteria {
        FilterCriteria {
            stale_cutoff: cutoff,
            keyword: String::new(),
            skip_set: HashSet::new(),
            type_mask: vec![ChannelVisibility::Public],
        }
    }

    #[test]
    fn unit_prefilters_reject_non_member_channels() {
        let cutoff = Utc::now();
        assert!(!passes_prefilters(&record("general", false), &criteria(cutoff)));
        assert!(passes_prefilters(&record("general", true), &criteria(cutoff)));
    }

    #[test]
    fn unit_prefilters_honor_the_skip_set() {
        let mut crit = criteria(Utc::now());
        crit.skip_set.insert("announcements".to_string());
        assert!(!passes_prefilters(&record("announcements", true), &crit));
        assert!(passes_prefilters(&record("random", true), &crit));
    }

    #[test]
    fn unit_prefilters_match_keyword_as_case_sensitive_substring() {
        let mut crit = criteria(Utc::now());
        crit.keyword = "proj".to_string();
        assert!(passes_prefilters(&record("proj-atlas", true), &crit));
        assert!(!passes_prefilters(&record("PROJ-atlas", true), &crit));
        assert!(!passes_prefilters(&record("random", true), &crit));
    }

    #[test]
    fn unit_is_stale_requires_activity_strictly_before_cutoff() {
        let cutoff = Utc::now();
        assert!(is_stale(Some(cutoff - Duration::seconds(1)), cutoff));
        assert!(!is_stale(Some(cutoff), cutoff));
        assert!(!is_stale(Some(cutoff + Duration::seconds(1)), cutoff));
    }

    #[test]
    fn unit_is_stale_never_flags_channels_without_activity() {
        assert!(!is_stale(None, Utc::now()));
    }

    proptest! {
        #[test]
        fn property_passes_all_agrees_with_each_predicate(
            is_member in any::<bool>(),
            skiplisted in any::<bool>(),
            name in "[a-z]{1,12}",
            keyword in prop::option::of("[a-z]{1,3}"),
            activity_offset_secs in prop::option::of(-86_400i64..86_400),
        ) {
            let cutoff = Utc::now();
            let mut crit = criteria(cutoff);
            if skiplisted {
                crit.skip_set.insert(name.clone());
            }
            if let Some(keyword) = &keyword {
                crit.keyword = keyword.clone();
            }
            let rec = record(&name, is_member);
            let activity = activity_offset_secs.map(|secs| cutoff + Duration::seconds(secs));

            let keyword_ok = keyword
                .as_ref()
                .map(|kw| name.contains(kw.as_str()))
                .unwrap_or(true);
            let stale = activity.map(|last| last < cutoff).unwrap_or(false);
            let expected = is_member && !skiplisted && keyword_ok && stale;

            prop_assert_eq!(passes_all(&rec, activity, &crit), expected);
        }
    }
}
