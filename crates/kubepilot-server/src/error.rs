use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration: set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },

    #[error("invalid configuration: {0}")]
    Other(#[from] config::ConfigError),
}

/// Translate a configuration field path into the environment variable that
/// sets it: `agent.model` becomes `KUBEPILOT_AGENT__MODEL`.
pub fn to_env_var(field: &str) -> String {
    format!("KUBEPILOT_{}", field.replace('.', "__").to_uppercase())
}
