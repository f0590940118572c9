use super::{
    azure::AzureProvider, base::Provider, configs::ProviderConfig, openai::OpenAiProvider,
};
use crate::errors::ProviderError;

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>, ProviderError> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Azure(azure_config) => Ok(Box::new(AzureProvider::new(azure_config)?)),
    }
}
