use super::runtime::apply_record;
use super::runtime::clamp_text;
use super::runtime::describe_update;
use super::runtime::replay;
use super::startup::Cli;
use super::startup::execute;
use super::types::ReplayRecord;
use clap::Parser;
use wt_browser::Extension;
use wt_browser::ExtensionConfig;
use wt_browser::InterceptDecision;
use wt_browser::RecordingHost;
use wt_browser::TabUpdateOutcome;
use wt_storage::MemorySessionStore;

const SCRIPT: &str = r#"
# flagged navigation, user proceeds, revisit is allowed
{"kind":"tab_updated","tab_id":7,"status":"loading","url":"http://example.xyz/login?verify=1","active":true}
{"kind":"message","request":{"action":"proceed","domain":"example.xyz","originalUrl":"http://example.xyz/login?verify=1"},"sender":{"tab_id":7}}
{"kind":"tab_updated","tab_id":7,"status":"loading","url":"http://example.xyz/login?verify=1","active":true}
{"kind":"tab_updated","tab_id":7,"status":"complete","url":"http://example.xyz/login?verify=1","active":true}
{"kind":"tab_updated","tab_id":7,"status":"complete","url":"http://example.xyz/account","active":true}
{"kind":"message","request":{"action":"getTabUrl"},"sender":{"tab_id":7,"url":"https://example.com/"}}
"#;

fn run_replay(script: &str, with_store: bool, json: bool) -> String {
    let mut out = Vec::new();
    let reader: Box<dyn std::io::BufRead> = Box::new(std::io::Cursor::new(script.to_owned()));
    let replayed = replay(ExtensionConfig::default(), reader, with_store, json, &mut out);
    assert!(replayed.is_ok());
    String::from_utf8(out).unwrap_or_else(|_| unreachable!())
}

#[test]
fn replay_walks_warning_proceed_and_report_flow() {
    let output = run_replay(SCRIPT, true, false);
    let lines: Vec<&str> = output.lines().filter(|line| line.starts_with('#')).collect();

    assert_eq!(
        lines,
        vec![
            "#3 warn example.xyz [suspicious_keyword, unencrypted_transport, suspicious_tld]",
            "#4 proceed (allowed for session)",
            "#5 allowed example.xyz",
            "#6 report example.xyz (warning)",
            "#7 already scanned example.xyz",
            "#8 tab domain example.com",
        ]
    );
    assert!(output.contains("  -> update tab#7 chrome-extension://webtracker/warning.html?url="));
    assert!(output.contains("  -> create tab#1000 data:text/html,"));
}

#[test]
fn replay_without_store_warns_again_after_proceed() {
    let output = run_replay(SCRIPT, false, false);
    assert!(output.contains("#4 proceed (allow not recorded)"));
    assert!(output.contains("#5 warn example.xyz"));
}

#[test]
fn replay_json_lines_parse_back() {
    let output = run_replay(SCRIPT, true, true);
    for line in output.lines() {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "not json: {line}");
    }
    assert!(output.contains(r#""action":"update""#));
}

#[test]
fn replay_rejects_malformed_record() {
    let mut out = Vec::new();
    let reader: Box<dyn std::io::BufRead> =
        Box::new(std::io::Cursor::new("{\"kind\":\"teleport\"}\n".to_owned()));
    let replayed = replay(ExtensionConfig::default(), reader, true, false, &mut out);
    assert!(replayed.is_err());
    if let Err(error) = replayed {
        assert_eq!(error.code, "cli.replay_record_invalid");
    }
}

#[test]
fn session_end_record_clears_allow_list() {
    let mut extension = Extension::new(
        ExtensionConfig::default(),
        RecordingHost::default(),
        Some(Box::new(MemorySessionStore::new())),
    )
    .unwrap_or_else(|_| unreachable!());

    let proceed: ReplayRecord = serde_json::from_str(
        r#"{"kind":"message","request":{"action":"proceed","domain":"bit.ly","originalUrl":"https://bit.ly/x"},"sender":{"tab_id":1}}"#,
    )
    .unwrap_or_else(|_| unreachable!());
    apply_record(&mut extension, proceed);
    assert_eq!(apply_record(&mut extension, ReplayRecord::SessionEnd), "session ended");

    let navigation: ReplayRecord = serde_json::from_str(
        r#"{"kind":"tab_updated","tab_id":1,"status":"loading","url":"https://bit.ly/x"}"#,
    )
    .unwrap_or_else(|_| unreachable!());
    assert_eq!(
        apply_record(&mut extension, navigation),
        "warn bit.ly [url_shortener]"
    );
}

#[test]
fn describes_pass_decision() {
    assert_eq!(
        describe_update(&TabUpdateOutcome::Intercept(InterceptDecision::Pass)),
        "pass"
    );
}

#[test]
fn clamp_text_marks_truncation() {
    assert_eq!(clamp_text("abcdef", 3), "abc...");
    assert_eq!(clamp_text("abc", 3), "abc");
}

#[test]
fn check_command_prints_flags() {
    let cli = Cli::try_parse_from(["webtracker", "check", "https://bit.ly/abc123"])
        .unwrap_or_else(|_| unreachable!());
    let mut out = Vec::new();
    assert!(execute(&cli, &mut out).is_ok());

    let text = String::from_utf8(out).unwrap_or_else(|_| unreachable!());
    assert!(text.contains("Domain: bit.ly"));
    assert!(text.contains("Severity: warning"));
    assert!(text.contains("[url_shortener]"));
}

#[test]
fn check_command_json_is_structured() {
    let cli = Cli::try_parse_from(["webtracker", "--json", "check", "https://example.com/"])
        .unwrap_or_else(|_| unreachable!());
    let mut out = Vec::new();
    assert!(execute(&cli, &mut out).is_ok());

    let value: serde_json::Value =
        serde_json::from_slice(&out).unwrap_or_else(|_| unreachable!());
    assert_eq!(value["domain"], "example.com");
    assert_eq!(value["verdict"]["severity"], "safe");
}

#[test]
fn check_command_rejects_unparsable_url() {
    let cli = Cli::try_parse_from(["webtracker", "check", "undefined"])
        .unwrap_or_else(|_| unreachable!());
    let mut out = Vec::new();
    let result = execute(&cli, &mut out);
    assert!(result.is_err_and(|error| error.code == "url.invalid"));
}

#[test]
fn warning_command_decodes_location() {
    let cli = Cli::try_parse_from([
        "webtracker",
        "warning",
        "chrome-extension://webtracker/warning.html?url=https%3A%2F%2Fbit.ly%2Fabc&domain=bit.ly",
    ])
    .unwrap_or_else(|_| unreachable!());
    let mut out = Vec::new();
    assert!(execute(&cli, &mut out).is_ok());
    assert_eq!(
        String::from_utf8(out).unwrap_or_else(|_| unreachable!()),
        "Domain: bit.ly\nURL: https://bit.ly/abc\n"
    );
}
