use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Full filter directive that replaces `--log-level` when set, e.g.
/// `handstream_client=trace,info`.
pub const LOG_ENV: &str = "HANDSTREAM_LOG";

/// Targets that `--log-level` applies to. Everything else logs warnings only.
const HANDSTREAM_TARGETS: [&str; 4] = [
    "handstream",
    "handstream_client",
    "handstream_frame",
    "handstream_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// `self` for the handstream crates, at most `warn` for dependencies.
    pub fn directives(self) -> String {
        let base = if self == LogLevel::Error { "error" } else { "warn" };
        HANDSTREAM_TARGETS
            .iter()
            .fold(base.to_string(), |mut directives, target| {
                directives.push(',');
                directives.push_str(target);
                directives.push('=');
                directives.push_str(self.as_str());
                directives
            })
    }
}

fn build_filter(level: LogLevel, env_directives: Option<&str>) -> EnvFilter {
    if let Some(directives) = env_directives.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(err) => eprintln!("warning: ignoring invalid {LOG_ENV}: {err}"),
        }
    }
    EnvFilter::new(level.directives())
}

/// Logs go to stderr so stdout stays clean for pose output. Thread names are
/// kept so lines from the receive threads can be told apart.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let env_directives = std::env::var(LOG_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, env_directives.as_deref()))
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().flatten_event(true).try_init();
        }
    }
}
