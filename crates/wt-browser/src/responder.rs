use tracing::debug;
use wt_ipc::TabUrlResponse;

/// Answers `getTabUrl` from the sender tab's URL.
pub fn tab_url_response(sender_url: Option<&str>) -> TabUrlResponse {
    let Some(url) = sender_url else {
        return TabUrlResponse::unknown();
    };

    match wt_url::domain_of(url) {
        Ok(domain) => TabUrlResponse { domain },
        Err(error) => {
            debug!(%error, "sender tab URL has no usable domain");
            TabUrlResponse::unknown()
        }
    }
}
