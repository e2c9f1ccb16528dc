// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::env;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Registry};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
enum LogFormat {
    Json,
    Compact,
}

pub fn init(verbose: bool) {
    let filter = build_filter(verbose);
    let span_events = parse_span_events();
    let registry = Registry::default()
        .with(filter)
        .with(tracing_error::ErrorLayer::default());

    match parse_format() {
        LogFormat::Json => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_span_events(span_events.clone())
                .with_writer(std::io::stderr);
            if let Some((writer, guard)) = build_file_writer() {
                let file_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_span_events(span_events)
                    .with_writer(writer);
                registry.with(stderr_layer).with(file_layer).init();
                let _ = FILE_GUARD.set(guard);
            } else {
                registry.with(stderr_layer).init();
            }
        }
        LogFormat::Compact => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_span_events(span_events.clone())
                .with_writer(std::io::stderr);
            if let Some((writer, guard)) = build_file_writer() {
                let file_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_span_events(span_events)
                    .with_writer(writer);
                registry.with(stderr_layer).with(file_layer).init();
                let _ = FILE_GUARD.set(guard);
            } else {
                registry.with(stderr_layer).init();
            }
        }
    }
}

fn build_filter(verbose: bool) -> EnvFilter {
    match env::var("CUMULUS_LOG") {
        Ok(value) => EnvFilter::new(value),
        Err(_) => {
            if verbose {
                EnvFilter::new("debug")
            } else {
                EnvFilter::new("info")
            }
        }
    }
}

fn parse_format() -> LogFormat {
    match env::var("CUMULUS_LOG_FORMAT")
        .ok()
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_ascii_lowercase())
    {
        Some(value) if value == "json" => LogFormat::Json,
        _ => LogFormat::Compact,
    }
}

fn parse_span_events() -> FmtSpan {
    span_events_from(env::var("CUMULUS_LOG_SPAN_EVENTS").ok().as_deref())
}

fn span_events_from(value: Option<&str>) -> FmtSpan {
    match value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_ascii_lowercase())
    {
        Some(value) if value == "new" => FmtSpan::NEW,
        Some(value) if value == "enter" => FmtSpan::ENTER,
        Some(value) if value == "exit" => FmtSpan::EXIT,
        Some(value) if value == "close" => FmtSpan::CLOSE,
        _ => FmtSpan::NONE,
    }
}

fn build_file_writer() -> Option<(NonBlocking, WorkerGuard)> {
    let file_path = env::var("CUMULUS_LOG_FILE")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())?;

    let path = Path::new(&file_path);
    let file_name = path.file_name()?.to_string_lossy().to_string();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Some((writer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_events_recognize_each_lifecycle_stage() {
        assert_eq!(span_events_from(Some("new")), FmtSpan::NEW);
        assert_eq!(span_events_from(Some("enter")), FmtSpan::ENTER);
        assert_eq!(span_events_from(Some("exit")), FmtSpan::EXIT);
        assert_eq!(span_events_from(Some(" CLOSE ")), FmtSpan::CLOSE);
    }

    #[test]
    fn span_events_default_to_none() {
        assert_eq!(span_events_from(None), FmtSpan::NONE);
        assert_eq!(span_events_from(Some("")), FmtSpan::NONE);
        assert_eq!(span_events_from(Some("everything")), FmtSpan::NONE);
    }
}
