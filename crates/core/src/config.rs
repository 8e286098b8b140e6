//! Runtime configuration.
//!
//! Values come from the process environment (and a `.env` file if present).
//! [`Config::from_lookup`] takes the lookup as a closure so parsing can be
//! exercised without touching the real environment.

use crate::ai::AiMode;
use crate::capture::CaptureRegion;
use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://models.github.ai/inference/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-4o";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

/// Which wire protocol the AI client speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions` (GitHub Models by default).
    ChatCompletions,
    /// Google Gemini through `gemini-rust`.
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "openai" | "github" => Ok(Self::ChatCompletions),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown AI provider '{other}' (expected chat or gemini)")),
        }
    }
}

/// What to do when OCR fails in text-only mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionPolicy {
    /// Send a "no text detected" request instead.
    Placeholder,
    /// End the cycle with the extraction error.
    Fail,
}

impl FromStr for ExtractionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" | "fallback" => Ok(Self::Placeholder),
            "fail" | "error" => Ok(Self::Fail),
            other => Err(format!("unknown OCR fallback '{other}' (expected placeholder or fail)")),
        }
    }
}

/// Key combinations in `<ctrl>+<shift>+s` notation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HotkeyBindings {
    pub scan: String,
    pub toggle: String,
    pub region: String,
    pub quit: String,
    pub reset: String,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            scan: "<ctrl>+<shift>+s".to_string(),
            toggle: "<ctrl>+<shift>+h".to_string(),
            region: "<ctrl>+<shift>+r".to_string(),
            quit: "<ctrl>+<shift>+q".to_string(),
            reset: "<ctrl>+<shift>+x".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model_name: String,
    /// Only used by [`ProviderKind::ChatCompletions`].
    pub endpoint: String,
    pub mode: AiMode,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub capture_region: Option<CaptureRegion>,
    pub monitor: usize,
    /// Pause between hiding the overlay and grabbing the frame.
    pub capture_settle: Duration,
    pub context_limit: usize,
    pub shutdown_grace: Duration,
    pub ocr_fallback: ExtractionPolicy,
    pub ocr_languages: String,
    pub hotkeys: HotkeyBindings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get =
            |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = match get("AI_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>().map_err(AppError::Config)?,
            None => ProviderKind::ChatCompletions,
        };

        let api_key = match provider {
            ProviderKind::ChatCompletions => {
                get("AI_API_KEY").or_else(|| get("GITHUB_TOKEN")).ok_or_else(|| {
                    AppError::MissingEnvVar(
                        "GITHUB_TOKEN (or AI_API_KEY) must be set in environment or .env file"
                            .to_string(),
                    )
                })?
            }
            ProviderKind::Gemini => {
                get("GEMINI_API_KEY").or_else(|| get("AI_API_KEY")).ok_or_else(|| {
                    AppError::MissingEnvVar(
                        "GEMINI_API_KEY must be set in environment or .env file".to_string(),
                    )
                })?
            }
        };

        let mut builder = ConfigBuilder::new()
            .with_provider(provider)
            .with_api_key(api_key);

        if let Some(model) = get("AI_MODEL") {
            builder = builder.with_model(model);
        }
        if let Some(endpoint) = get("API_ENDPOINT") {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(mode) = get("AI_MODE") {
            builder = builder.with_mode(mode.parse().map_err(AppError::Config)?);
        }
        if let Some(policy) = get("OCR_FALLBACK") {
            builder.config.ocr_fallback = policy.parse().map_err(AppError::Config)?;
        }
        if let Some(languages) = get("OCR_LANGUAGES") {
            builder.config.ocr_languages = languages;
        }

        let monitor = parse_or("CAPTURE_MONITOR", get("CAPTURE_MONITOR"), builder.config.monitor)?;
        let context_limit =
            parse_or("CONTEXT_LIMIT", get("CONTEXT_LIMIT"), builder.config.context_limit)?;
        // A malformed region falls back to full screen rather than aborting startup
        let region = get("CAPTURE_REGION").and_then(|raw| raw.parse().ok());
        builder = builder
            .with_monitor(monitor)
            .with_context_limit(context_limit)
            .with_region(region);

        let cfg = &mut builder.config;
        cfg.temperature = parse_or("TEMPERATURE", get("TEMPERATURE"), cfg.temperature)?;
        cfg.max_tokens = parse_or("MAX_TOKENS", get("MAX_TOKENS"), cfg.max_tokens)?;
        cfg.max_retries = parse_or("MAX_RETRIES", get("MAX_RETRIES"), cfg.max_retries)?;
        cfg.request_timeout = Duration::from_secs(parse_or(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            cfg.request_timeout.as_secs(),
        )?);
        cfg.retry_backoff =
            millis_or("RETRY_BACKOFF_MS", get("RETRY_BACKOFF_MS"), cfg.retry_backoff)?;
        cfg.capture_settle =
            millis_or("CAPTURE_SETTLE_MS", get("CAPTURE_SETTLE_MS"), cfg.capture_settle)?;
        cfg.shutdown_grace =
            millis_or("SHUTDOWN_GRACE_MS", get("SHUTDOWN_GRACE_MS"), cfg.shutdown_grace)?;

        let keys = &mut cfg.hotkeys;
        for (name, slot) in [
            ("HOTKEY_SCAN", &mut keys.scan),
            ("HOTKEY_TOGGLE", &mut keys.toggle),
            ("HOTKEY_REGION", &mut keys.region),
            ("HOTKEY_QUIT", &mut keys.quit),
            ("HOTKEY_RESET", &mut keys.reset),
        ] {
            if let Some(binding) = get(name) {
                *slot = binding;
            }
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: '{value}'"))),
        None => Ok(default),
    }
}

fn millis_or(key: &str, raw: Option<String>, default: Duration) -> Result<Duration> {
    parse_or(key, raw, default.as_millis() as u64).map(Duration::from_millis)
}

/// Programmatic construction of a [`Config`], starting from defaults.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    config: Config,
    model_set: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                provider: ProviderKind::ChatCompletions,
                api_key: String::new(),
                model_name: DEFAULT_CHAT_MODEL.to_string(),
                endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
                mode: AiMode::Vision,
                temperature: 0.3,
                max_tokens: 2000,
                request_timeout: Duration::from_secs(60),
                max_retries: 2,
                retry_backoff: Duration::from_millis(500),
                capture_region: None,
                monitor: 0,
                capture_settle: Duration::from_millis(120),
                context_limit: 6,
                shutdown_grace: Duration::from_millis(1500),
                ocr_fallback: ExtractionPolicy::Placeholder,
                ocr_languages: "eng+vie".to_string(),
                hotkeys: HotkeyBindings::default(),
            },
            model_set: false,
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = provider;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model_name = model.into();
        self.model_set = true;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn with_mode(mut self, mode: AiMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_region(mut self, region: Option<CaptureRegion>) -> Self {
        self.config.capture_region = region;
        self
    }

    pub fn with_monitor(mut self, monitor: usize) -> Self {
        self.config.monitor = monitor;
        self
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.config.context_limit = limit;
        self
    }

    pub fn build(mut self) -> Result<Config> {
        if self.config.api_key.trim().is_empty() {
            return Err(AppError::config("API key must not be empty"));
        }
        if !self.model_set && self.config.provider == ProviderKind::Gemini {
            self.config.model_name = DEFAULT_GEMINI_MODEL.to_string();
        }
        if self.config.provider == ProviderKind::ChatCompletions {
            url::Url::parse(&self.config.endpoint)
                .map_err(|e| AppError::Config(format!("Invalid API endpoint: {}", e)))?;
        }
        if self.config.context_limit == 0 {
            return Err(AppError::config("CONTEXT_LIMIT must be at least 1"));
        }
        Ok(self.config)
    }
}
