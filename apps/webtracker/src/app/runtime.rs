use super::*;
use super::types::CheckOutput;
use super::types::ReplayLine;
use super::types::ReplayRecord;
use super::types::WarningOutput;
use wt_browser::InterceptDecision;
use wt_browser::MessageReply;
use wt_browser::ReportBody;
use wt_browser::ReportDecision;
use wt_browser::TabAction;
use wt_browser::TabUpdateOutcome;
use wt_browser::WarningView;
use wt_storage::MemorySessionStore;
use wt_storage::SessionStore;
use wt_url::PageUrl;

const FIRST_REPORT_TAB: u32 = 1000;
const MAX_ACTION_URL_CHARS: usize = 96;

pub(super) fn check(
    config: &ExtensionConfig,
    url: &str,
    json: bool,
    out: &mut dyn Write,
) -> TrackerResult<()> {
    let page = PageUrl::parse(url)?;
    let verdict = config.heuristics.evaluate(page.original(), page.domain());

    if json {
        return write_json(
            out,
            &CheckOutput {
                url: page.original(),
                domain: page.domain(),
                verdict: &verdict,
            },
        );
    }

    let mut text = format!(
        "Domain: {}\nURL: {}\nSeverity: {}\n",
        page.domain(),
        page.original(),
        verdict.severity.as_str()
    );
    for (kind, message) in verdict.flags.iter().zip(&verdict.messages) {
        text.push_str(&format!("  [{}] {message}\n", kind.as_str()));
    }
    write_text(out, &text)
}

pub(super) fn replay(
    config: ExtensionConfig,
    reader: Box<dyn BufRead>,
    with_session_store: bool,
    json: bool,
    out: &mut dyn Write,
) -> TrackerResult<()> {
    let store: Option<Box<dyn SessionStore>> = if with_session_store {
        Some(Box::new(MemorySessionStore::new()))
    } else {
        None
    };
    let host = RecordingHost::starting_at(FIRST_REPORT_TAB);
    let mut extension = Extension::new(config, host, store)?;
    extension.on_startup();

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|error| {
            TrackerError::new(
                "cli.input_read_failed",
                format!("failed to read replay line {number}: {error}"),
            )
        })?;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record: ReplayRecord = serde_json::from_str(trimmed).map_err(|error| {
            TrackerError::new(
                "cli.replay_record_invalid",
                format!("invalid replay record on line {number}: {error}"),
            )
        })?;

        let outcome = apply_record(&mut extension, record);
        let actions = extension.host_mut().take_actions();
        let replayed = ReplayLine {
            line: number,
            outcome,
            actions,
        };

        if json {
            write_json(out, &replayed)?;
        } else {
            write_text(out, &format_replay_line(&replayed))?;
        }
    }

    let summary = extension.summary();
    info!(
        scanned_domains = summary.scanned_domains,
        session_store = summary.session_store_available,
        "replay finished"
    );
    Ok(())
}

pub(super) fn warning(location: &str, json: bool, out: &mut dyn Write) -> TrackerResult<()> {
    let view = WarningView::from_location(location)?;
    if json {
        return write_json(
            out,
            &WarningOutput {
                domain: &view.domain,
                url: &view.original_url,
            },
        );
    }

    write_text(
        out,
        &format!("Domain: {}\nURL: {}\n", view.domain, view.original_url),
    )
}

pub(super) fn apply_record(
    extension: &mut Extension<RecordingHost>,
    record: ReplayRecord,
) -> String {
    match record {
        ReplayRecord::TabUpdated(event) => describe_update(&extension.on_tab_updated(&event)),
        ReplayRecord::Message { request, sender } => {
            describe_reply(&extension.on_message(&request, &sender))
        }
        ReplayRecord::Installed => {
            extension.on_installed();
            "installed".to_owned()
        }
        ReplayRecord::Startup => {
            extension.on_startup();
            "startup".to_owned()
        }
        ReplayRecord::SessionEnd => {
            extension.end_session();
            "session ended".to_owned()
        }
    }
}

pub(super) fn describe_update(outcome: &TabUpdateOutcome) -> String {
    match outcome {
        TabUpdateOutcome::Intercept(decision) => match decision {
            InterceptDecision::NoUrl => "no url".to_owned(),
            InterceptDecision::OwnPage => "extension page".to_owned(),
            InterceptDecision::Internal => "internal page".to_owned(),
            InterceptDecision::Unparsable => "unparsable url".to_owned(),
            InterceptDecision::Pass => "pass".to_owned(),
            InterceptDecision::Allowed { domain } => format!("allowed {domain}"),
            InterceptDecision::Redirect {
                domain, verdict, ..
            } => {
                let flags: Vec<&str> = verdict.flags.iter().map(|kind| kind.as_str()).collect();
                format!("warn {domain} [{}]", flags.join(", "))
            }
        },
        TabUpdateOutcome::Report(decision) => match decision {
            ReportDecision::NoUrl => "no url".to_owned(),
            ReportDecision::Internal => "internal page".to_owned(),
            ReportDecision::Unparsable => "unparsable url".to_owned(),
            ReportDecision::Hostless => "no host".to_owned(),
            ReportDecision::AlreadyScanned { domain } => format!("already scanned {domain}"),
            ReportDecision::Open(view) => match &view.body {
                ReportBody::Scan(verdict) => {
                    format!("report {} ({})", view.domain, verdict.severity.as_str())
                }
                ReportBody::Error(reason) => format!("report error {}: {reason}", view.domain),
            },
        },
        TabUpdateOutcome::Ignored => "background tab".to_owned(),
    }
}

fn describe_reply(reply: &MessageReply) -> String {
    if let Some(response) = &reply.response {
        return format!("tab domain {}", response.domain);
    }

    match &reply.proceed {
        Some(outcome) if outcome.allow_recorded => "proceed (allowed for session)".to_owned(),
        Some(_) => "proceed (allow not recorded)".to_owned(),
        None => "no reply".to_owned(),
    }
}

fn format_replay_line(line: &ReplayLine) -> String {
    let mut text = format!("#{} {}\n", line.line, line.outcome);
    for action in &line.actions {
        let (verb, tab, url) = match action {
            TabAction::Update { tab, url } => ("update", tab, url),
            TabAction::Create { tab, url } => ("create", tab, url),
        };
        text.push_str(&format!(
            "  -> {verb} {tab} {}\n",
            clamp_text(url, MAX_ACTION_URL_CHARS)
        ));
    }
    text
}

pub(super) fn clamp_text(input: &str, max_chars: usize) -> String {
    let mut chars = input.chars();
    let clamped: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{clamped}...")
    } else {
        clamped
    }
}

fn write_json<T: serde::Serialize>(out: &mut dyn Write, value: &T) -> TrackerResult<()> {
    let encoded = serde_json::to_string(value).map_err(|error| {
        TrackerError::new(
            "cli.output_encode_failed",
            format!("failed to encode output: {error}"),
        )
    })?;
    write_text(out, &format!("{encoded}\n"))
}

fn write_text(out: &mut dyn Write, text: &str) -> TrackerResult<()> {
    out.write_all(text.as_bytes()).map_err(|error| {
        TrackerError::new(
            "cli.output_write_failed",
            format!("failed to write output: {error}"),
        )
    })
}
