//! Structured JSONL logging for a hoard run.
//!
//! stdout carries the run summary (or the `--json` report), so log records
//! only ever go to a file or to stderr. Every record is stamped with the
//! hoard, branch and source repository of the span it was emitted in, which
//! keeps the lines of a multi-repository run attributable.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Event;
use tracing::field::{Field, Visit};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "HOARDER_LOG_PATH";
const ENV_LOG_DIR: &str = "HOARDER_LOG_DIR";
/// Per-job scratch directory on GitHub Actions runners.
const ENV_RUNNER_TEMP: &str = "RUNNER_TEMP";
const ENV_RUN_ID: &str = "GITHUB_RUN_ID";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Span fields lifted to the top level of each record.
const RUN_FIELDS: &[&str] = &["hoard", "branch", "repo", "today"];

/// Logging settings for one invocation.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Written as `service` on every record and used as the log file stem.
    pub service: String,
    /// `log_dir` from the configuration.
    pub log_dir: Option<PathBuf>,
    /// GitHub Actions run id, when running inside a workflow.
    pub run_id: Option<String>,
}

impl ObservabilityConfig {
    /// Settings for this binary, with the workflow run id taken from the
    /// environment.
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
            run_id: std::env::var(ENV_RUN_ID).ok().filter(|id| !id.is_empty()),
        }
    }
}

/// Keeps the background log writer alive; drop it last.
pub struct ObservabilityGuard {
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Install the global subscriber.
///
/// Falls back to stderr with a warning when no log file can be opened.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let sources = LogSources::from_env(cfg.log_dir.as_deref());
    let (writer, guard) = match sources.resolve(&cfg.service) {
        Ok(target) => {
            let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
            tracing_appender::non_blocking(appender)
        }
        Err(err) => {
            eprintln!("Warning: {err}. Logging to stderr.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(JsonLogLayer::new(writer, cfg))
        .init();

    tracing::debug!("observability initialized");

    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

// ============================================================================
// JSON Log Layer
// ============================================================================

/// Writes one JSON object per event.
///
/// Layout: the fixed stamp (`service`, `run_id`), timestamp, level and
/// target, then [`RUN_FIELDS`] from the innermost span that sets them,
/// then the event's own fields. All other span fields are nested under
/// `spans.<span name>`.
struct JsonLogLayer<W> {
    writer: W,
    stamp: Map<String, Value>,
}

impl<W> JsonLogLayer<W> {
    fn new(writer: W, cfg: &ObservabilityConfig) -> Self {
        let mut stamp = Map::new();
        stamp.insert("service".into(), Value::String(cfg.service.clone()));
        if let Some(ref run_id) = cfg.run_id {
            stamp.insert("run_id".into(), Value::String(run_id.clone()));
        }
        Self { writer, stamp }
    }
}

impl<S, W> tracing_subscriber::Layer<S> for JsonLogLayer<W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: LayerContext<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut fields = SpanFields::default();
            attrs.record(&mut fields);
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: LayerContext<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            match extensions.get_mut::<SpanFields>() {
                Some(fields) => values.record(fields),
                None => {
                    let mut fields = SpanFields::default();
                    values.record(&mut fields);
                    extensions.insert(fields);
                }
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: LayerContext<'_, S>) {
        let metadata = event.metadata();
        let mut record = self.stamp.clone();
        record.insert("timestamp".into(), Value::String(format_timestamp()));
        record.insert(
            "level".into(),
            Value::String(metadata.level().as_str().to_lowercase()),
        );
        record.insert("target".into(), Value::String(metadata.target().into()));

        let mut spans = Map::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                let Some(fields) = extensions.get::<SpanFields>() else {
                    continue;
                };
                for (key, value) in &fields.0 {
                    if RUN_FIELDS.contains(&key.as_str()) {
                        record.insert(key.clone(), value.clone());
                    } else {
                        let entry = spans
                            .entry(span.name())
                            .or_insert_with(|| Value::Object(Map::new()));
                        if let Value::Object(map) = entry {
                            map.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        let mut fields = SpanFields::default();
        event.record(&mut fields);
        record.extend(fields.0);
        if !spans.is_empty() {
            record.insert("spans".into(), Value::Object(spans));
        }

        let mut writer = self.writer.make_writer();
        if serde_json::to_writer(&mut writer, &Value::Object(record)).is_ok() {
            let _ = writer.write_all(b"\n");
        }
    }
}

/// Field values recorded on a span or event.
#[derive(Clone, Debug, Default)]
struct SpanFields(Map<String, Value>);

impl SpanFields {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for SpanFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::Number(value.into()));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }
}

/// RFC 3339 UTC timestamp with millisecond precision.
fn format_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Log Target Resolution
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
}

/// Places a log file may go.
///
/// `path`, `dir` and `config_dir` are explicit choices and must be
/// writable. `runner_temp` and `data_dir` are tried in that order and
/// skipped when they cannot be written.
#[derive(Debug, Default)]
struct LogSources {
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    runner_temp: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl LogSources {
    fn from_env(config_dir: Option<&Path>) -> Self {
        let var = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self {
            path: var(ENV_LOG_PATH),
            dir: var(ENV_LOG_DIR),
            config_dir: config_dir.map(Path::to_path_buf),
            runner_temp: var(ENV_RUNNER_TEMP),
            data_dir: directories::ProjectDirs::from("", "", env!("CARGO_PKG_NAME"))
                .map(|dirs| dirs.data_local_dir().join("logs")),
        }
    }

    fn resolve(self, service: &str) -> Result<LogTarget, String> {
        if let Some(path) = self.path {
            return log_target_from_path(path);
        }
        let file_name = format!("{service}{LOG_FILE_SUFFIX}");
        if let Some(dir) = self.dir.or(self.config_dir) {
            ensure_writable(&dir, &file_name)?;
            return Ok(LogTarget { dir, file_name });
        }

        [self.runner_temp, self.data_dir]
            .into_iter()
            .flatten()
            .find(|dir| ensure_writable(dir, &file_name).is_ok())
            .map(|dir| LogTarget {
                dir,
                file_name: file_name.clone(),
            })
            .ok_or_else(|| "no writable log directory found".to_string())
    }
}

fn log_target_from_path(path: PathBuf) -> Result<LogTarget, String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| format!("{ENV_LOG_PATH} must end in a UTF-8 file name"))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget { dir, file_name })
}

fn ensure_writable(dir: &Path, file_name: &str) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory {}: {e}", dir.display()))?;

    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open log file {}: {e}", path.display()))?;

    Ok(())
}
