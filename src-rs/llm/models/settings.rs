use crate::config::ProviderConfig;
use crate::cons::provider_cons::{LLMProvider, DEFAULT_TEMPERATURE};
use crate::error::{CoreError, CoreResult};

/// Validated, immutable copy of a provider's configuration.
#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

impl ProviderSettings {
    pub fn from_config(kind: LLMProvider, config: &ProviderConfig) -> CoreResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CoreError::Configuration(format!("{}: api_key is required", kind))
            })?
            .to_string();

        let temperature = config.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(CoreError::Configuration(format!(
                "{}: temperature {} is outside 0.0..=2.0",
                kind, temperature
            )));
        }

        let endpoint = non_blank(config.endpoint.as_deref())
            .unwrap_or(kind.default_endpoint())
            .trim_end_matches('/')
            .to_string();
        validate_endpoint(kind, &endpoint)?;

        let model = non_blank(config.model.as_deref())
            .unwrap_or(kind.default_model())
            .to_string();

        Ok(Self {
            api_key,
            model,
            endpoint,
            temperature,
            max_tokens: config.extra_u32("max_tokens"),
            system_prompt: non_blank(config.extra_str("system_prompt")).map(str::to_string),
        })
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn validate_endpoint(kind: LLMProvider, endpoint: &str) -> CoreResult<()> {
    let parsed = url::Url::parse(endpoint).map_err(|e| {
        CoreError::Configuration(format!("{}: invalid endpoint '{}': {}", kind, endpoint, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CoreError::Configuration(format!(
            "{}: unsupported endpoint scheme '{}'",
            kind, other
        ))),
    }
}
