//! One-shot security report for newly seen domains.

use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::info;
use tracing::warn;
use wt_core::TrackerResult;
use wt_security::FlagCategory;
use wt_security::HeuristicPolicy;
use wt_security::Severity;
use wt_security::Verdict;
use wt_url::PageUrl;

use crate::scan::ScanState;

const REPORT_TITLE: &str = "WebTracker Security Report";
const DEFAULT_BASIC_CHECK: &str = "No obvious security issues detected";
const DEFAULT_DOMAIN_ANALYSIS: &str = "Basic domain check passed";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Produces the verdict a report is built from.
///
/// Checks may fail; a failure turns into an error view instead of a report.
pub trait PageChecker {
    fn check(&self, url: &str, domain: &str) -> TrackerResult<Verdict>;
}

/// Checker backed by the local heuristic rule set.
#[derive(Debug, Clone, Default)]
pub struct HeuristicChecker {
    policy: HeuristicPolicy,
}

impl HeuristicChecker {
    pub fn new(policy: HeuristicPolicy) -> Self {
        Self { policy }
    }
}

impl PageChecker for HeuristicChecker {
    fn check(&self, url: &str, domain: &str) -> TrackerResult<Verdict> {
        Ok(self.policy.evaluate(url, domain))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBody {
    Scan(Verdict),
    Error(String),
}

/// Self-contained report document for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    pub domain: String,
    pub url: String,
    pub generated_at: DateTime<Utc>,
    pub body: ReportBody,
}

impl ReportView {
    pub fn is_error(&self) -> bool {
        matches!(self.body, ReportBody::Error(_))
    }

    /// Plain-text body shown inside the report.
    pub fn summary(&self) -> String {
        let timestamp = self.generated_at.format(TIMESTAMP_FORMAT);
        match &self.body {
            ReportBody::Scan(verdict) => format!(
                "Browser opened at {timestamp}\n\n\
                 Domain: {}\n\
                 URL: {}\n\
                 Basic Security Check: {}\n\
                 Domain Analysis: {}\n\
                 Severity: {}",
                self.domain,
                self.url,
                section_text(verdict, FlagCategory::Url, DEFAULT_BASIC_CHECK),
                section_text(verdict, FlagCategory::Domain, DEFAULT_DOMAIN_ANALYSIS),
                verdict.severity.as_str(),
            ),
            ReportBody::Error(reason) => {
                format!("Error scanning {}: {reason}", self.domain)
            }
        }
    }

    pub fn to_html(&self) -> String {
        match &self.body {
            ReportBody::Scan(verdict) => {
                let accent = match verdict.severity {
                    Severity::Safe => "green",
                    Severity::Warning => "orange",
                };
                format!(
                    "<html><head><title>{REPORT_TITLE}</title><style>\
                     body {{ font-family: Arial, sans-serif; margin: 20px; }} \
                     h1 {{ color: blue; }} \
                     .result {{ border-left: 4px solid {accent}; padding: 10px; margin: 20px 0; }} \
                     pre {{ white-space: pre-wrap; }}\
                     </style></head><body><h1>Security Scan Result</h1>\
                     <div class=\"result\"><pre>{}</pre></div></body></html>",
                    escape_html(&self.summary())
                )
            }
            ReportBody::Error(_) => format!(
                "<html><body><h1>WebTracker Error</h1><p>{}</p></body></html>",
                escape_html(&self.summary())
            ),
        }
    }

    /// The document as a `data:` URL suitable for opening in a new tab.
    pub fn data_url(&self) -> String {
        format!("data:text/html,{}", urlencoding::encode(&self.to_html()))
    }
}

fn section_text(verdict: &Verdict, category: FlagCategory, fallback: &str) -> String {
    let messages = verdict.messages_for(category);
    if messages.is_empty() {
        fallback.to_owned()
    } else {
        messages.join("; ")
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// What the report generator decided for one `complete` tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDecision {
    NoUrl,
    /// Browser-internal, extension or `data:` page.
    Internal,
    Unparsable,
    /// Parsed, but there is no host to report on (`file:///...`).
    Hostless,
    AlreadyScanned { domain: String },
    Open(ReportView),
}

#[derive(Debug, Clone)]
pub struct ReportGenerator {
    internal_prefixes: Vec<String>,
}

impl ReportGenerator {
    pub fn new(internal_prefixes: Vec<String>) -> Self {
        Self { internal_prefixes }
    }

    pub fn generate(
        &self,
        url: Option<&str>,
        scan_state: &mut ScanState,
        checker: &dyn PageChecker,
        now: DateTime<Utc>,
    ) -> ReportDecision {
        let Some(url) = url else {
            return ReportDecision::NoUrl;
        };

        if wt_url::has_internal_prefix(url, &self.internal_prefixes) {
            return ReportDecision::Internal;
        }

        let page = match PageUrl::parse(url) {
            Ok(page) => page,
            Err(error) => {
                warn!(url, %error, "error processing tab");
                return ReportDecision::Unparsable;
            }
        };

        if !page.has_host() {
            debug!(url, "page has no host; skipping report");
            return ReportDecision::Hostless;
        }

        let domain = page.domain().to_owned();
        // Mark before checking so a second completion for the same domain
        // never produces a second report.
        if !scan_state.mark(&domain) {
            debug!(%domain, "domain already reported this lifetime");
            return ReportDecision::AlreadyScanned { domain };
        }

        let body = match checker.check(page.original(), &domain) {
            Ok(verdict) => {
                info!(%domain, severity = verdict.severity.as_str(), "generated security report");
                ReportBody::Scan(verdict)
            }
            Err(error) => {
                warn!(%domain, %error, "page check failed");
                ReportBody::Error(error.message)
            }
        };

        ReportDecision::Open(ReportView {
            domain,
            url: page.original().to_owned(),
            generated_at: now,
            body,
        })
    }
}
