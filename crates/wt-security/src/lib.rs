//! Page heuristics: suspicious TLDs, URL shorteners, keywords and plain HTTP.

use serde::Serialize;
use std::collections::BTreeSet;
use wt_core::TrackerError;
use wt_core::TrackerResult;

const SUSPICIOUS_TLD_SUFFIXES: &[&str] = &[".xyz", ".tk", ".ml", ".ga", ".cf"];

const URL_SHORTENER_HOSTS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "t.co",
    "is.gd",
    "rebrand.ly",
    "ow.ly",
];

const STANDALONE_KEYWORDS: &[&str] = &["phishing"];

const PAIRED_KEYWORDS: &[(&str, &str)] = &[("login", "verify")];

const UNENCRYPTED_PREFIX: &str = "http:";

/// Individual heuristic that fired for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    SuspiciousKeyword,
    UnencryptedTransport,
    SuspiciousTld,
    UrlShortener,
}

impl FlagKind {
    pub const ALL: [FlagKind; 4] = [
        Self::SuspiciousKeyword,
        Self::UnencryptedTransport,
        Self::SuspiciousTld,
        Self::UrlShortener,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuspiciousKeyword => "suspicious_keyword",
            Self::UnencryptedTransport => "unencrypted_transport",
            Self::SuspiciousTld => "suspicious_tld",
            Self::UrlShortener => "url_shortener",
        }
    }

    pub fn category(self) -> FlagCategory {
        match self {
            Self::SuspiciousKeyword | Self::UnencryptedTransport => FlagCategory::Url,
            Self::SuspiciousTld | Self::UrlShortener => FlagCategory::Domain,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::SuspiciousKeyword => "Warning: URL contains potentially suspicious keywords",
            Self::UnencryptedTransport => {
                "Warning: This site is using an unencrypted HTTP connection"
            }
            Self::SuspiciousTld => {
                "Warning: Domain uses a TLD often associated with free domains"
            }
            Self::UrlShortener => {
                "Warning: This is a shortened URL which may hide the actual destination"
            }
        }
    }
}

/// Report section a flag is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagCategory {
    Url,
    Domain,
}

/// Coarse verdict classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Safe,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
        }
    }
}

/// Outcome of evaluating one page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Verdict {
    pub flags: BTreeSet<FlagKind>,
    pub severity: Severity,
    pub messages: Vec<String>,
}

impl Verdict {
    fn flag(&mut self, kind: FlagKind) {
        if self.flags.insert(kind) {
            self.messages.push(kind.message().to_owned());
        }
        self.severity = Severity::Warning;
    }

    pub fn has(&self, kind: FlagKind) -> bool {
        self.flags.contains(&kind)
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Messages for flags in the given report section, in rule order.
    pub fn messages_for(&self, category: FlagCategory) -> Vec<&'static str> {
        self.flags
            .iter()
            .filter(|kind| kind.category() == category)
            .map(|kind| kind.message())
            .collect()
    }
}

/// Rule lists shared by every component that classifies pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicPolicy {
    pub suspicious_tld_suffixes: Vec<String>,
    pub url_shortener_hosts: Vec<String>,
    pub standalone_keywords: Vec<String>,
    pub paired_keywords: Vec<(String, String)>,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self {
            suspicious_tld_suffixes: to_owned_list(SUSPICIOUS_TLD_SUFFIXES),
            url_shortener_hosts: to_owned_list(URL_SHORTENER_HOSTS),
            standalone_keywords: to_owned_list(STANDALONE_KEYWORDS),
            paired_keywords: PAIRED_KEYWORDS
                .iter()
                .map(|(left, right)| ((*left).to_owned(), (*right).to_owned()))
                .collect(),
        }
    }
}

impl HeuristicPolicy {
    pub fn validate(&self) -> TrackerResult<()> {
        let empty_entry = self
            .suspicious_tld_suffixes
            .iter()
            .chain(&self.url_shortener_hosts)
            .chain(&self.standalone_keywords)
            .chain(
                self.paired_keywords
                    .iter()
                    .flat_map(|(left, right)| [left, right]),
            )
            .any(|entry| entry.is_empty());

        // An empty pattern matches every page and would block all navigation.
        if empty_entry {
            return Err(TrackerError::new(
                "config.heuristic_entry_empty",
                "heuristic pattern lists must not contain empty entries",
            ));
        }

        Ok(())
    }

    /// Evaluates every rule independently against the page URL and its domain.
    pub fn evaluate(&self, url: &str, domain: &str) -> Verdict {
        let mut verdict = Verdict::default();

        if self.has_suspicious_keyword(url) {
            verdict.flag(FlagKind::SuspiciousKeyword);
        }
        if url.starts_with(UNENCRYPTED_PREFIX) {
            verdict.flag(FlagKind::UnencryptedTransport);
        }
        if self
            .suspicious_tld_suffixes
            .iter()
            .any(|suffix| domain.ends_with(suffix.as_str()))
        {
            verdict.flag(FlagKind::SuspiciousTld);
        }
        if self
            .url_shortener_hosts
            .iter()
            .any(|host| domain.contains(host.as_str()))
        {
            verdict.flag(FlagKind::UrlShortener);
        }

        verdict
    }

    fn has_suspicious_keyword(&self, url: &str) -> bool {
        self.standalone_keywords
            .iter()
            .any(|keyword| url.contains(keyword.as_str()))
            || self
                .paired_keywords
                .iter()
                .any(|(left, right)| url.contains(left.as_str()) && url.contains(right.as_str()))
    }
}

/// Evaluates a page with the default rule lists.
pub fn evaluate(url: &str, domain: &str) -> Verdict {
    HeuristicPolicy::default().evaluate(url, domain)
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::FlagCategory;
    use super::FlagKind;
    use super::HeuristicPolicy;
    use super::SUSPICIOUS_TLD_SUFFIXES;
    use super::Severity;
    use super::URL_SHORTENER_HOSTS;
    use super::evaluate;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn flags_http_tld_and_login_verify() {
        let verdict = evaluate("http://example.xyz/login?verify=1", "example.xyz");
        let expected: BTreeSet<FlagKind> = [
            FlagKind::SuspiciousTld,
            FlagKind::SuspiciousKeyword,
            FlagKind::UnencryptedTransport,
        ]
        .into_iter()
        .collect();

        assert_eq!(verdict.flags, expected);
        assert_eq!(verdict.severity, Severity::Warning);
        assert_eq!(verdict.messages.len(), 3);
    }

    #[test]
    fn https_example_is_safe() {
        let verdict = evaluate("https://example.com/", "example.com");
        assert!(verdict.flags.is_empty());
        assert!(verdict.messages.is_empty());
        assert_eq!(verdict.severity, Severity::Safe);
    }

    #[test]
    fn shortener_domain_is_flagged() {
        let verdict = evaluate("https://bit.ly/abc123", "bit.ly");
        assert_eq!(
            verdict.flags.iter().copied().collect::<Vec<_>>(),
            vec![FlagKind::UrlShortener]
        );
        assert_eq!(verdict.severity, Severity::Warning);
    }

    #[test]
    fn login_without_verify_is_not_a_keyword_hit() {
        let verdict = evaluate("https://example.com/login", "example.com");
        assert!(!verdict.has(FlagKind::SuspiciousKeyword));
    }

    #[test]
    fn https_prefix_is_not_unencrypted() {
        let verdict = evaluate("https://example.com/", "example.com");
        assert!(!verdict.has(FlagKind::UnencryptedTransport));
    }

    #[test]
    fn messages_split_by_report_category() {
        let verdict = evaluate("http://bit.ly/phishing", "bit.ly");
        assert_eq!(verdict.messages_for(FlagCategory::Url).len(), 2);
        assert_eq!(
            verdict.messages_for(FlagCategory::Domain),
            vec![FlagKind::UrlShortener.message()]
        );
    }

    #[test]
    fn policy_rejects_empty_patterns() {
        let mut policy = HeuristicPolicy::default();
        assert!(policy.validate().is_ok());

        policy.url_shortener_hosts.push(String::new());
        let validated = policy.validate();
        assert!(validated.is_err());
        if let Err(error) = validated {
            assert_eq!(error.code, "config.heuristic_entry_empty");
        }
    }

    #[test]
    fn custom_policy_lists_apply() {
        let policy = HeuristicPolicy {
            suspicious_tld_suffixes: vec![".zip".to_owned()],
            ..HeuristicPolicy::default()
        };
        assert!(policy.evaluate("https://files.zip/", "files.zip").has(FlagKind::SuspiciousTld));
        assert!(!policy.evaluate("https://a.xyz/", "a.xyz").has(FlagKind::SuspiciousTld));
    }

    fn arb_label() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,12}"
    }

    fn arb_path() -> impl Strategy<Value = String> {
        "[a-z0-9/]{0,24}"
    }

    proptest! {
        #[test]
        fn suspicious_tld_always_warns(
            label in arb_label(),
            index in 0..SUSPICIOUS_TLD_SUFFIXES.len(),
        ) {
            let domain = format!("{label}{}", SUSPICIOUS_TLD_SUFFIXES[index]);
            let verdict = evaluate(&format!("https://{domain}/"), &domain);
            prop_assert!(verdict.has(FlagKind::SuspiciousTld));
            prop_assert_eq!(verdict.severity, Severity::Warning);
        }

        #[test]
        fn plain_http_always_warns(label in arb_label(), path in arb_path()) {
            let domain = format!("{label}.com");
            let verdict = evaluate(&format!("http://{domain}/{path}"), &domain);
            prop_assert!(verdict.has(FlagKind::UnencryptedTransport));
            prop_assert_eq!(verdict.severity, Severity::Warning);
        }

        #[test]
        fn keywords_trigger_anywhere(prefix in arb_path(), suffix in arb_path()) {
            let phishing = format!("https://example.com/{prefix}phishing{suffix}");
            prop_assert!(evaluate(&phishing, "example.com").has(FlagKind::SuspiciousKeyword));

            let paired = format!("https://example.com/{prefix}verify{suffix}login");
            prop_assert!(evaluate(&paired, "example.com").has(FlagKind::SuspiciousKeyword));
        }

        #[test]
        fn shortener_substring_triggers(
            left in "[a-z]{0,6}",
            index in 0..URL_SHORTENER_HOSTS.len(),
        ) {
            let domain = format!("{left}{}", URL_SHORTENER_HOSTS[index]);
            let verdict = evaluate(&format!("https://{domain}/x"), &domain);
            prop_assert!(verdict.has(FlagKind::UrlShortener));
        }

        #[test]
        fn evaluation_is_deterministic(url in "\\PC{0,40}", domain in "\\PC{0,20}") {
            prop_assert_eq!(evaluate(&url, &domain), evaluate(&url, &domain));
        }

        #[test]
        fn severity_tracks_flags(url in "\\PC{0,40}", domain in "\\PC{0,20}") {
            let verdict = evaluate(&url, &domain);
            prop_assert_eq!(verdict.severity == Severity::Warning, verdict.is_flagged());
            prop_assert_eq!(verdict.messages.len(), verdict.flags.len());
        }
    }

    #[test]
    fn every_flag_has_a_distinct_name() {
        let names: BTreeSet<&str> = FlagKind::ALL.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(names.len(), FlagKind::ALL.len());
    }
}
