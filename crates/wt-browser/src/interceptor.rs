//! Pre-navigation interception.
//!
//! The redirect is issued while the host keeps loading the original page, so
//! the flagged page may briefly start rendering before the interstitial
//! replaces it. Nothing here tries to order the two.

use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;
use wt_core::TrackerResult;
use wt_security::Verdict;
use wt_storage::AllowList;
use wt_storage::AllowLookup;
use wt_url::PageUrl;
use wt_url::WarningLink;

use crate::config::ExtensionConfig;

/// What the interceptor decided for one `loading` tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// The host reported no URL.
    NoUrl,
    /// The page belongs to the extension itself.
    OwnPage,
    /// Browser-internal page or `data:` report document.
    Internal,
    /// The URL could not be parsed; navigation is left alone.
    Unparsable,
    /// No heuristic fired.
    Pass,
    /// Heuristics fired but the user already proceeded for this domain.
    Allowed { domain: String },
    /// The tab should be sent to the interstitial.
    Redirect {
        domain: String,
        warning_url: String,
        verdict: Verdict,
    },
}

#[derive(Debug, Clone)]
pub struct NavigationInterceptor {
    config: ExtensionConfig,
    warning_page: Url,
}

impl NavigationInterceptor {
    pub fn new(config: ExtensionConfig) -> TrackerResult<Self> {
        let warning_page = config.warning_page_url()?;
        Ok(Self {
            config,
            warning_page,
        })
    }

    pub fn decide(&self, url: Option<&str>, allow_list: &AllowList) -> InterceptDecision {
        let Some(url) = url else {
            return InterceptDecision::NoUrl;
        };

        if self.config.is_own_page(url) {
            return InterceptDecision::OwnPage;
        }

        if wt_url::has_internal_prefix(url, &self.config.internal_prefixes) {
            return InterceptDecision::Internal;
        }

        let page = match PageUrl::parse(url) {
            Ok(page) => page,
            Err(error) => {
                warn!(url, %error, "error checking URL");
                return InterceptDecision::Unparsable;
            }
        };

        // Hostless pages are still evaluated, against an empty domain.
        let verdict = self.config.heuristics.evaluate(page.original(), page.domain());
        if !verdict.is_flagged() {
            return InterceptDecision::Pass;
        }

        let domain = page.domain().to_owned();
        match allow_list.lookup(&domain) {
            AllowLookup::Allowed => {
                debug!(%domain, "flagged domain was allowed earlier this session");
                InterceptDecision::Allowed { domain }
            }
            lookup @ (AllowLookup::NotAllowed | AllowLookup::Unavailable) => {
                let warning_url = WarningLink::new(page.original(), &domain)
                    .to_page_url(&self.warning_page);
                info!(
                    %domain,
                    store_available = lookup != AllowLookup::Unavailable,
                    "redirecting flagged navigation to warning page"
                );
                InterceptDecision::Redirect {
                    domain,
                    warning_url,
                    verdict,
                }
            }
        }
    }
}
