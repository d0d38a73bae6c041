//! Background coordinator: wires host tab events and messages to the
//! interceptor, report generator, allow-list and tab-context responder.

mod config;
mod handshake;
mod host;
mod interceptor;
mod report;
mod responder;
mod scan;

pub use config::EXTENSION_BASE_ENV;
pub use config::ExtensionConfig;
pub use handshake::ProceedOutcome;
pub use handshake::WarningView;
pub use handshake::accept_proceed;
pub use host::MessageSender;
pub use host::NavigationEvent;
pub use host::RecordingHost;
pub use host::TabAction;
pub use host::TabHost;
pub use host::TabId;
pub use host::TabStatus;
pub use interceptor::InterceptDecision;
pub use interceptor::NavigationInterceptor;
pub use report::HeuristicChecker;
pub use report::PageChecker;
pub use report::ReportBody;
pub use report::ReportDecision;
pub use report::ReportGenerator;
pub use report::ReportView;
pub use responder::tab_url_response;
pub use scan::ScanState;

use chrono::Utc;
use tracing::info;
use tracing::warn;
use wt_core::TrackerResult;
use wt_ipc::ExtensionRequest;
use wt_ipc::LocalIpcEndpoint;
use wt_ipc::TabUrlResponse;
use wt_storage::AllowList;
use wt_storage::SessionStore;

/// Startup summary for the driver layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSummary {
    pub warning_page: String,
    pub session_store_available: bool,
    pub scanned_domains: usize,
}

/// What a single tab update led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabUpdateOutcome {
    Intercept(InterceptDecision),
    Report(ReportDecision),
    /// Completion of a background tab; nothing runs.
    Ignored,
}

/// Reply to a cross-context message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReply {
    /// Always true: senders may wait for an asynchronous answer.
    pub keep_channel_open: bool,
    pub response: Option<TabUrlResponse>,
    pub proceed: Option<ProceedOutcome>,
}

impl MessageReply {
    fn empty() -> Self {
        Self {
            keep_channel_open: true,
            response: None,
            proceed: None,
        }
    }
}

/// Extension background process.
pub struct Extension<H: TabHost> {
    host: H,
    allow_list: AllowList,
    scan_state: ScanState,
    interceptor: NavigationInterceptor,
    reports: ReportGenerator,
    checker: Box<dyn PageChecker>,
    warning_page: String,
}

impl<H: TabHost> Extension<H> {
    /// Builds the coordinator; `session_store` is `None` on hosts without session storage.
    pub fn new(
        config: ExtensionConfig,
        host: H,
        session_store: Option<Box<dyn SessionStore>>,
    ) -> TrackerResult<Self> {
        config.validate()?;
        let warning_page = config.warning_page_url()?;

        Ok(Self {
            host,
            allow_list: AllowList::new(session_store),
            scan_state: ScanState::new(),
            reports: ReportGenerator::new(config.internal_prefixes.clone()),
            checker: Box::new(HeuristicChecker::new(config.heuristics.clone())),
            interceptor: NavigationInterceptor::new(config)?,
            warning_page: warning_page.into(),
        })
    }

    pub fn with_checker(mut self, checker: impl PageChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scan_state(&self) -> &ScanState {
        &self.scan_state
    }

    pub fn summary(&self) -> ExtensionSummary {
        ExtensionSummary {
            warning_page: self.warning_page.clone(),
            session_store_available: self.allow_list.is_available(),
            scanned_domains: self.scan_state.len(),
        }
    }

    pub fn on_installed(&mut self) {
        self.scan_state.reset();
        info!("extension installed; scan state reset");
    }

    pub fn on_startup(&mut self) {
        self.scan_state.reset();
        info!("extension started; scan state reset");
    }

    /// Drops every allow decision when the browsing session ends.
    pub fn end_session(&mut self) {
        if let Err(error) = self.allow_list.end_session() {
            warn!(%error, "failed to clear session store");
        }
    }

    pub fn on_tab_updated(&mut self, event: &NavigationEvent) -> TabUpdateOutcome {
        match event.status {
            TabStatus::Loading => {
                let decision = self
                    .interceptor
                    .decide(event.url.as_deref(), &self.allow_list);
                if let InterceptDecision::Redirect { warning_url, .. } = &decision {
                    if let Err(error) = self.host.update_tab(event.tab_id, warning_url) {
                        warn!(
                            tab = %event.tab_id,
                            %error,
                            "failed to redirect tab to warning page"
                        );
                    }
                }
                TabUpdateOutcome::Intercept(decision)
            }
            TabStatus::Complete if event.active => {
                let decision = self.reports.generate(
                    event.url.as_deref(),
                    &mut self.scan_state,
                    self.checker.as_ref(),
                    Utc::now(),
                );
                if let ReportDecision::Open(view) = &decision {
                    if let Err(error) = self.host.create_tab(&view.data_url()) {
                        warn!(domain = %view.domain, %error, "failed to open report tab");
                    }
                }
                TabUpdateOutcome::Report(decision)
            }
            TabStatus::Complete => TabUpdateOutcome::Ignored,
        }
    }

    pub fn on_message(
        &mut self,
        request: &ExtensionRequest,
        sender: &MessageSender,
    ) -> MessageReply {
        let mut reply = MessageReply::empty();

        match request {
            ExtensionRequest::GetTabUrl => {
                if sender.tab_id.is_some() {
                    reply.response = Some(tab_url_response(sender.url.as_deref()));
                }
            }
            ExtensionRequest::Proceed {
                domain,
                original_url,
            } => {
                let Some(tab) = sender.tab_id else {
                    warn!(domain = %domain, "proceed message without a sender tab");
                    return reply;
                };

                let outcome = accept_proceed(&mut self.allow_list, domain, original_url);
                if let Err(error) = self.host.update_tab(tab, &outcome.navigate_to) {
                    warn!(%tab, %error, "failed to resume original navigation");
                }
                reply.proceed = Some(outcome);
            }
        }

        reply
    }

    /// Receives one framed request from `endpoint`, handles it and sends any reply back.
    pub fn serve_next(
        &mut self,
        endpoint: &LocalIpcEndpoint,
        sender: &MessageSender,
    ) -> TrackerResult<MessageReply> {
        let request = endpoint.recv_request()?;
        let reply = self.on_message(&request, sender);

        if let Some(response) = &reply.response {
            endpoint.send_response(response)?;
        }

        Ok(reply)
    }
}
