use std::io::BufRead;
use std::io::Write;
use tracing::debug;
use tracing::info;
use wt_browser::Extension;
use wt_browser::ExtensionConfig;
use wt_browser::RecordingHost;
use wt_core::TrackerError;
use wt_core::TrackerResult;

mod runtime;
mod startup;
mod types;

#[cfg(test)]
mod tests;

pub(crate) use startup::run;
