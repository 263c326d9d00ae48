//! Controller and webhook enablement gates
//!
//! Both lists accept exact names, `-name` negations, and the `*` wildcard.
//! Entries are scanned in order and the first exact or negated match wins;
//! `*` only applies when nothing names the candidate explicitly.

use yurt_common::config::WILDCARD;

/// Outcome of scanning a gate list for one name
enum Match {
    Named,
    Negated,
    Wildcard,
    None,
}

fn scan(name: &str, entries: &[String]) -> Match {
    let mut wildcard = false;
    for entry in entries {
        if entry == name {
            return Match::Named;
        }
        if entry.strip_prefix('-') == Some(name) {
            return Match::Negated;
        }
        if entry == WILDCARD {
            wildcard = true;
        }
    }
    if wildcard {
        Match::Wildcard
    } else {
        Match::None
    }
}

/// Whether the independent webhook `name` is listed as disabled
pub fn is_webhook_disabled(name: &str, disabled_webhooks: &[String]) -> bool {
    matches!(scan(name, disabled_webhooks), Match::Named | Match::Wildcard)
}

/// Whether the independent webhook `name` should be set up
pub fn is_webhook_enabled(name: &str, disabled_webhooks: &[String]) -> bool {
    !is_webhook_disabled(name, disabled_webhooks)
}

/// Whether the controller `name` (and so its webhooks) is enabled
pub fn is_controller_enabled(name: &str, controllers: &[String]) -> bool {
    matches!(scan(name, controllers), Match::Named | Match::Wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case::empty(&[], false)]
    #[case::listed(&["pod"], true)]
    #[case::other(&["node"], false)]
    #[case::wildcard(&["*"], true)]
    #[case::wildcard_except(&["*", "-pod"], false)]
    #[case::except_before_wildcard(&["-pod", "*"], false)]
    #[case::case_sensitive(&["Pod"], false)]
    fn webhook_disable_list(#[case] entries: &[&str], #[case] disabled: bool) {
        assert_eq!(is_webhook_disabled("pod", &list(entries)), disabled);
        assert_eq!(is_webhook_enabled("pod", &list(entries)), !disabled);
    }

    #[rstest]
    #[case::empty(&[], false)]
    #[case::listed(&["nodepool"], true)]
    #[case::other(&["raven"], false)]
    #[case::wildcard(&["*"], true)]
    #[case::wildcard_except(&["*", "-nodepool"], false)]
    #[case::first_match_wins(&["nodepool", "-nodepool"], true)]
    fn controller_enable_list(#[case] entries: &[&str], #[case] enabled: bool) {
        assert_eq!(is_controller_enabled("nodepool", &list(entries)), enabled);
    }

    #[test]
    fn decisions_are_stable() {
        let entries = list(&["*", "-raven"]);
        for _ in 0..3 {
            assert!(!is_controller_enabled("raven", &entries));
            assert!(is_controller_enabled("nodepool", &entries));
        }
    }
}
