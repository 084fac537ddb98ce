//! Runtime settings.
//!
//! Every flag can also come from the environment, so a `.env`-style
//! deployment needs no command line at all.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "mixtral-8x7b-32768";

#[derive(Parser, Debug, Clone)]
#[command(name = "medquiz", version, about = "AI generated medical exam practice questions")]
pub struct Settings {
    /// The address to bind to.
    #[arg(short, long, env = "MEDQUIZ_ADDRESS", default_value = "127.0.0.1:1414")]
    pub address: SocketAddr,

    /// File holding locally persisted values (the provider API key).
    #[arg(long, env = "MEDQUIZ_STORE", default_value = "medquiz-store.json")]
    pub store: PathBuf,

    /// bcrypt cost used when registering accounts.
    #[arg(long, env = "MEDQUIZ_BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    #[command(flatten)]
    pub provider: ProviderSettings,
}

/// Where and how questions are generated.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Base URL of the OpenAI compatible API.
    #[arg(long = "provider-url", env = "MEDQUIZ_PROVIDER_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Chat model used for question generation.
    #[arg(long, env = "MEDQUIZ_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "MEDQUIZ_TEMPERATURE", default_value_t = 0.9)]
    pub temperature: f32,

    /// Upper bound on generated tokens per question.
    #[arg(long, env = "MEDQUIZ_MAX_TOKENS", default_value_t = 1024)]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[arg(long, env = "MEDQUIZ_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settings pointing at another base URL, e.g. a local stub.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.9,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line_defaults() {
        let settings = Settings::try_parse_from(["medquiz"]).unwrap();
        assert_eq!(settings.provider, ProviderSettings::default());
        assert_eq!(settings.address.port(), 1414);
    }

    #[test]
    fn flags_override_provider_settings() {
        let settings = Settings::try_parse_from([
            "medquiz",
            "--provider-url",
            "http://127.0.0.1:9000/v1",
            "--temperature",
            "0.7",
        ])
        .unwrap();
        assert_eq!(settings.provider.base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(settings.provider.temperature, 0.7);
        assert_eq!(settings.provider.model, DEFAULT_MODEL);
    }
}
