//! Command-line arguments and resolved settings for the REPL.
//!
//! Every setting is layered: a command-line flag wins over the environment,
//! which wins over the built-in default.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_BASE_URL;
use crate::error::{Error, Result};
use crate::exec::{DEFAULT_INTERPRETER, DEFAULT_LANGUAGE, DEFAULT_SHELL};
use crate::model_cache::DEFAULT_CACHE_DURATION;

/// Environment variable holding the model server URL.
pub const ENV_URL: &str = "OLLAMA_URL";
/// Environment variable holding the default model.
pub const ENV_MODEL: &str = "OLLAMA_MODEL";
/// Environment variable enabling debug diagnostics.
pub const ENV_DEBUG: &str = "OLLAMA_REPL_DEBUG";
/// Environment variable holding the code-mode interpreter command.
pub const ENV_INTERPRETER: &str = "OLLAMA_REPL_INTERPRETER";
/// Environment variable holding the code-mode language label.
pub const ENV_LANGUAGE: &str = "OLLAMA_REPL_LANGUAGE";
/// Environment variable holding the shell program.
pub const ENV_SHELL: &str = "SHELL";

/// Command-line arguments for the ollama-repl tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ReplArgs {
    /// Base URL of the model server.
    #[arrrg(optional, "Model server URL (default: $OLLAMA_URL or http://localhost:11434)", "URL")]
    pub url: Option<String>,

    /// Model to chat with.
    #[arrrg(optional, "Model to use (default: $OLLAMA_MODEL)", "MODEL")]
    pub model: Option<String>,

    /// Enable debug diagnostics.
    #[arrrg(flag, "Log debug diagnostics to stderr")]
    pub debug: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Interpreter command for code mode.
    #[arrrg(optional, "Code-mode interpreter command (default: ruby -e)", "COMMAND")]
    pub interpreter: Option<String>,

    /// Language label for code mode.
    #[arrrg(optional, "Code-mode language label (default: ruby)", "LANGUAGE")]
    pub language: Option<String>,

    /// Shell program for shell mode.
    #[arrrg(optional, "Shell program (default: $SHELL or /bin/sh)", "PROGRAM")]
    pub shell: Option<String>,

    /// Seconds a fetched model list stays fresh.
    #[arrrg(optional, "Model list cache lifetime in seconds (default: 300)", "SECONDS")]
    pub cache_seconds: Option<u64>,
}

/// Resolved settings for one REPL process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    /// Base URL of the model server, without a trailing slash.
    pub url: String,

    /// The model to chat with.
    pub model: String,

    /// Whether debug diagnostics are enabled.
    pub debug: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Command that runs a code snippet passed as its last argument.
    pub interpreter: String,

    /// Language label for code mode.
    pub language: String,

    /// Program used as `<shell> -c <command>`.
    pub shell: String,

    /// How long a fetched model list stays fresh.
    pub cache_duration: Duration,
}

impl ReplConfig {
    /// Creates a config with built-in defaults and no model.
    pub fn new() -> Self {
        Self {
            url: DEFAULT_BASE_URL.to_string(),
            model: String::new(),
            debug: false,
            use_color: true,
            interpreter: DEFAULT_INTERPRETER.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            cache_duration: DEFAULT_CACHE_DURATION,
        }
    }

    /// Layers `args` over the process environment over the defaults.
    ///
    /// The result is not validated; call [`ReplConfig::validate`].
    pub fn from_env_and_args(args: ReplArgs) -> Self {
        Self::from_lookup_and_args(args, |key| std::env::var(key).ok())
    }

    /// Layers `args` over `lookup` over the defaults.
    pub fn from_lookup_and_args(args: ReplArgs, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::new();
        Self {
            url: args.url.or_else(|| env(ENV_URL)).unwrap_or(defaults.url),
            model: args.model.or_else(|| env(ENV_MODEL)).unwrap_or(defaults.model),
            debug: args.debug || env(ENV_DEBUG).is_some_and(|value| is_truthy(&value)),
            use_color: !args.no_color,
            interpreter: args
                .interpreter
                .or_else(|| env(ENV_INTERPRETER))
                .unwrap_or(defaults.interpreter),
            language: args
                .language
                .or_else(|| env(ENV_LANGUAGE))
                .unwrap_or(defaults.language),
            shell: args.shell.or_else(|| env(ENV_SHELL)).unwrap_or(defaults.shell),
            cache_duration: args
                .cache_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_duration),
        }
    }

    /// Checks the settings the session cannot start without.
    ///
    /// Requires a non-empty model and an http or https URL.  The returned
    /// config has surrounding whitespace and any trailing slash removed.
    pub fn validate(mut self) -> Result<Self> {
        self.model = self.model.trim().to_string();
        if self.model.is_empty() {
            return Err(Error::configuration(format!(
                "no model configured; pass --model or set {ENV_MODEL}"
            )));
        }

        let url = self.url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&url)
            .map_err(|e| Error::configuration(format!("invalid URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "URL '{url}' must use http or https"
            )));
        }
        self.url = url;

        if self.interpreter.split_whitespace().next().is_none() {
            return Err(Error::configuration("interpreter command is empty"));
        }
        Ok(self)
    }

    /// Sets the server URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Enables or disables debug diagnostics.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the code-mode interpreter and its language label.
    pub fn with_interpreter(mut self, language: impl Into<String>, command: impl Into<String>) -> Self {
        self.language = language.into();
        self.interpreter = command.into();
        self
    }

    /// Sets the shell program.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Sets the model list cache lifetime.
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = ReplConfig::new();
        assert_eq!(config.url, "http://localhost:11434");
        assert!(config.model.is_empty());
        assert!(!config.debug);
        assert!(config.use_color);
        assert_eq!(config.interpreter, "ruby -e");
        assert_eq!(config.language, "ruby");
        assert_eq!(config.shell, "/bin/sh");
        assert_eq!(config.cache_duration, Duration::from_secs(300));
    }

    #[test]
    fn environment_fills_gaps() {
        let config = ReplConfig::from_lookup_and_args(
            ReplArgs::default(),
            env(&[
                (ENV_URL, "http://gpu-box:11434/"),
                (ENV_MODEL, "llama3"),
                (ENV_DEBUG, "true"),
                (ENV_SHELL, "/bin/bash"),
            ]),
        );
        assert_eq!(config.url, "http://gpu-box:11434/");
        assert_eq!(config.model, "llama3");
        assert!(config.debug);
        assert_eq!(config.shell, "/bin/bash");
        assert_eq!(config.language, "ruby");
    }

    #[test]
    fn flags_win_over_environment() {
        let args = ReplArgs {
            url: Some("http://127.0.0.1:9999".to_string()),
            model: Some("phi3".to_string()),
            debug: false,
            no_color: true,
            interpreter: Some("python3 -c".to_string()),
            language: Some("python".to_string()),
            shell: None,
            cache_seconds: Some(5),
        };
        let config = ReplConfig::from_lookup_and_args(
            args,
            env(&[(ENV_URL, "http://gpu-box:11434"), (ENV_MODEL, "llama3"), (ENV_DEBUG, "0")]),
        );
        assert_eq!(config.url, "http://127.0.0.1:9999");
        assert_eq!(config.model, "phi3");
        assert!(!config.debug);
        assert!(!config.use_color);
        assert_eq!(config.interpreter, "python3 -c");
        assert_eq!(config.language, "python");
        assert_eq!(config.cache_duration, Duration::from_secs(5));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let config =
            ReplConfig::from_lookup_and_args(ReplArgs::default(), env(&[(ENV_URL, "  ")]));
        assert_eq!(config.url, DEFAULT_BASE_URL);
    }

    #[test]
    fn validate_strips_trailing_slash() {
        let config = ReplConfig::new()
            .with_url("http://localhost:11434/")
            .with_model(" llama3 ")
            .validate()
            .unwrap();
        assert_eq!(config.url, "http://localhost:11434");
        assert_eq!(config.model, "llama3");
    }

    #[test]
    fn validate_requires_model() {
        let err = ReplConfig::new().validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn validate_rejects_bad_urls() {
        for url in ["localhost:11434", "ftp://localhost", "not a url"] {
            let err = ReplConfig::new()
                .with_model("llama3")
                .with_url(url)
                .validate()
                .unwrap_err();
            assert!(err.is_configuration(), "{url} should be rejected");
        }
    }

    #[test]
    fn config_builder_pattern() {
        let config = ReplConfig::new()
            .with_model("llama3")
            .with_debug(true)
            .without_color()
            .with_interpreter("python", "python3 -c")
            .with_shell("/bin/bash")
            .with_cache_duration(Duration::from_secs(10));
        assert!(config.debug);
        assert!(!config.use_color);
        assert_eq!(config.language, "python");
        assert_eq!(config.interpreter, "python3 -c");
        assert_eq!(config.shell, "/bin/bash");
        assert_eq!(config.cache_duration, Duration::from_secs(10));
    }
}
