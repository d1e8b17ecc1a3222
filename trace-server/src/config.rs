use std::path::PathBuf;

use traceview::render::{
    RenderConfig, DEFAULT_COMPLEXITY_BUDGET, DEFAULT_MAX_DEPTH, DEFAULT_TEXT_MAX_LINES,
    DEFAULT_TEXT_MAX_LINE_CHARS,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `<storage_id>.json` trace files
    pub trace_dir: PathBuf,
    /// Interface the server binds to
    pub host: String,
    /// Port the server listens on
    pub port: u16,
    /// Limits applied when rendering entry values
    pub render: RenderConfig,
}

impl Config {
    /// Reads the process environment. The first positional argument, when
    /// given, overrides `TRACEVIEW_DIR`.
    pub fn from_env(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(args: impl IntoIterator<Item = String>, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let trace_dir = args
            .into_iter()
            .next()
            .unwrap_or_else(|| env_str(&lookup, "TRACEVIEW_DIR", "."));

        let render = RenderConfig {
            text_max_lines: env_parse(&lookup, "TRACEVIEW_TEXT_MAX_LINES", DEFAULT_TEXT_MAX_LINES)?,
            text_max_line_chars: env_parse(
                &lookup,
                "TRACEVIEW_TEXT_MAX_LINE_CHARS",
                DEFAULT_TEXT_MAX_LINE_CHARS,
            )?,
            complexity_budget: env_parse(
                &lookup,
                "TRACEVIEW_COMPLEXITY_BUDGET",
                DEFAULT_COMPLEXITY_BUDGET,
            )?,
            max_depth: env_parse(&lookup, "TRACEVIEW_MAX_DEPTH", DEFAULT_MAX_DEPTH)?,
        };
        if render.text_max_lines == 0 || render.text_max_line_chars == 0 {
            anyhow::bail!(
                "TRACEVIEW_TEXT_MAX_LINES and TRACEVIEW_TEXT_MAX_LINE_CHARS must be positive"
            );
        }

        Ok(Self {
            trace_dir: PathBuf::from(trace_dir),
            host: env_str(&lookup, "TRACEVIEW_HOST", "127.0.0.1"),
            port: env_parse(&lookup, "TRACEVIEW_PORT", 6040)?,
            render,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}
