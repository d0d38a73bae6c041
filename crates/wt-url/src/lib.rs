//! Page URL parsing, internal-page detection and interstitial link contracts.

use url::Url;
use wt_core::TrackerError;
use wt_core::TrackerResult;

/// Browser-internal and extension URL prefixes that never get scanned.
pub const DEFAULT_INTERNAL_PREFIXES: &[&str] = &[
    "chrome://",
    "edge://",
    "about:",
    "chrome-extension://",
    "data:",
];

const WARNING_PARAM_URL: &str = "url";
const WARNING_PARAM_DOMAIN: &str = "domain";

/// A tab URL that parsed as an absolute URL.
///
/// The raw input is kept verbatim: heuristics and redirects operate on the
/// string the host reported, not on the normalized serialization. URLs
/// without a host (`file:///...`, `about:blank`) carry an empty domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    raw: String,
    domain: String,
}

impl PageUrl {
    pub fn parse(input: &str) -> TrackerResult<Self> {
        let parsed = Url::parse(input).map_err(|error| {
            TrackerError::new(
                "url.invalid",
                format!("failed to parse URL `{input}`: {error}"),
            )
        })?;

        let domain = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        Ok(Self {
            raw: input.to_owned(),
            domain,
        })
    }

    /// The URL exactly as reported by the host.
    pub fn original(&self) -> &str {
        &self.raw
    }

    /// Lowercased hostname; empty when the URL has no host.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn has_host(&self) -> bool {
        !self.domain.is_empty()
    }

    /// Like [`PageUrl::parse`], but rejects URLs without a host.
    pub fn parse_with_host(input: &str) -> TrackerResult<Self> {
        let page = Self::parse(input)?;
        if !page.has_host() {
            return Err(TrackerError::new(
                "url.host_missing",
                format!("URL `{input}` has no host"),
            ));
        }
        Ok(page)
    }
}

/// Extracts the hostname portion of a URL.
pub fn domain_of(input: &str) -> TrackerResult<String> {
    PageUrl::parse_with_host(input).map(|page| page.domain)
}

/// Returns true if the raw URL starts with any of the given prefixes.
pub fn has_internal_prefix<S: AsRef<str>>(input: &str, prefixes: &[S]) -> bool {
    prefixes
        .iter()
        .any(|prefix| input.starts_with(prefix.as_ref()))
}

/// Parameters carried by the interstitial warning page URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WarningLink {
    pub url: String,
    pub domain: String,
}

impl WarningLink {
    pub fn new(url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            domain: domain.into(),
        }
    }

    /// Builds `<warning_page>?url=<encoded>&domain=<encoded>`.
    pub fn to_page_url(&self, warning_page: &Url) -> String {
        let mut target = warning_page.clone();
        target
            .query_pairs_mut()
            .clear()
            .append_pair(WARNING_PARAM_URL, &self.url)
            .append_pair(WARNING_PARAM_DOMAIN, &self.domain);
        target.into()
    }

    /// Reads the parameters back from a warning page's own location.
    ///
    /// Missing parameters decode to empty strings.
    pub fn from_page_url(input: &str) -> TrackerResult<Self> {
        let location = Url::parse(input).map_err(|error| {
            TrackerError::new(
                "url.warning_invalid",
                format!("failed to parse warning page URL `{input}`: {error}"),
            )
        })?;

        let mut link = Self::default();
        for (key, value) in location.query_pairs() {
            match key.as_ref() {
                WARNING_PARAM_URL => link.url = value.into_owned(),
                WARNING_PARAM_DOMAIN => link.domain = value.into_owned(),
                _ => {}
            }
        }

        Ok(link)
    }
}

/// Parses the configured warning page location.
pub fn parse_warning_page(input: &str) -> TrackerResult<Url> {
    let parsed = Url::parse(input).map_err(|error| {
        TrackerError::new(
            "config.warning_page_invalid",
            format!("failed to parse warning page URL `{input}`: {error}"),
        )
    })?;

    if parsed.cannot_be_a_base() {
        return Err(TrackerError::new(
            "config.warning_page_invalid",
            format!("warning page URL `{input}` cannot carry query parameters"),
        ));
    }

    Ok(parsed)
}
