use crate::errors::ProviderError;

pub const DEFAULT_OPENAI_HOST: &str = "https://api.openai.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Unified enum to wrap the supported provider configurations.
///
/// Constructed per request (server mode) or per invocation (CLI mode) and
/// never cached across requests.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Azure(AzureProviderConfig),
}

/// Standard endpoint, also covering any OpenAI-compatible base URL.
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

/// Hosted variant addressed by deployment name rather than model id.
#[derive(Debug, Clone)]
pub struct AzureProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl ProviderConfig {
    /// Resolve a provider configuration from explicit arguments, falling
    /// back to the environment (`OPENAI_API_KEY`, `OPENAI_API_BASE`,
    /// `OPENAI_API_TYPE`) where arguments are absent.
    ///
    /// A base URL containing `azure`, or an `OPENAI_API_TYPE=azure` hint,
    /// selects the hosted deployment-mapped protocol; any other base URL is
    /// used verbatim as an OpenAI-compatible endpoint.
    pub fn from_env(
        api_key: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<ProviderConfig, ProviderError> {
        let api_key = match api_key.filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or(ProviderError::MissingCredential)?,
        };

        let base_url = match base_url.filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => std::env::var("OPENAI_API_BASE")
                .ok()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_HOST.to_string()),
        };

        let azure_hint = std::env::var("OPENAI_API_TYPE")
            .map(|t| t.eq_ignore_ascii_case("azure"))
            .unwrap_or(false);

        if azure_hint || base_url.to_lowercase().contains("azure") {
            let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
            Ok(ProviderConfig::Azure(AzureProviderConfig {
                endpoint: base_url,
                api_key,
                api_version,
            }))
        } else {
            Ok(ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: base_url,
                api_key,
            }))
        }
    }
}
