use url::Url;
use wt_core::TrackerError;
use wt_core::TrackerResult;
use wt_security::HeuristicPolicy;
use wt_url::DEFAULT_INTERNAL_PREFIXES;

/// Environment variable overriding the extension's own base URL.
pub const EXTENSION_BASE_ENV: &str = "WEBTRACKER_EXTENSION_BASE";

const DEFAULT_EXTENSION_BASE: &str = "chrome-extension://webtracker/";
const DEFAULT_WARNING_PAGE: &str = "warning.html";

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    pub extension_base_url: String,
    pub warning_page_path: String,
    /// URL prefixes the report generator never scans.
    pub internal_prefixes: Vec<String>,
    pub heuristics: HeuristicPolicy,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            extension_base_url: DEFAULT_EXTENSION_BASE.to_owned(),
            warning_page_path: DEFAULT_WARNING_PAGE.to_owned(),
            internal_prefixes: DEFAULT_INTERNAL_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_owned())
                .collect(),
            heuristics: HeuristicPolicy::default(),
        }
    }
}

impl ExtensionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base) = lookup(EXTENSION_BASE_ENV).filter(|value| !value.trim().is_empty()) {
            config.extension_base_url = normalize_base(base.trim());
        }
        config
    }

    pub fn validate(&self) -> TrackerResult<()> {
        self.heuristics.validate()?;
        self.warning_page_url()?;

        if self.internal_prefixes.iter().any(String::is_empty) {
            return Err(TrackerError::new(
                "config.internal_prefix_empty",
                "internal URL prefixes must not be empty",
            ));
        }

        Ok(())
    }

    /// Absolute location of the interstitial page.
    pub fn warning_page_url(&self) -> TrackerResult<Url> {
        let base = wt_url::parse_warning_page(&self.extension_base_url)?;
        base.join(&self.warning_page_path).map_err(|error| {
            TrackerError::new(
                "config.warning_page_invalid",
                format!(
                    "failed to resolve `{}` against `{}`: {error}",
                    self.warning_page_path, self.extension_base_url
                ),
            )
        })
    }

    /// True for pages served by the extension itself.
    pub fn is_own_page(&self, url: &str) -> bool {
        url.starts_with(&self.extension_base_url)
    }
}

fn normalize_base(base: &str) -> String {
    if base.ends_with('/') {
        base.to_owned()
    } else {
        format!("{base}/")
    }
}
