//! Provider configuration resolution for vsi-ai
//!
//! Provides two-tier resolution with ENV → TOML priority for the
//! vision-inference provider's credentials and endpoint.

use std::time::Duration;

use tracing::{info, warn};
use vsi_common::config::TomlConfig;
use vsi_common::{Error, Result};

use crate::services::azure_openai::AzureOpenAiSettings;

pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

/// Resolve provider settings
///
/// **Priority:** Environment → TOML `[inference]`
///
/// # Errors
/// `Error::Config` listing every missing value and how to provide it.
pub fn resolve_provider_settings(toml_config: &TomlConfig) -> Result<AzureOpenAiSettings> {
    let inference = &toml_config.inference;

    let api_key = resolve_value("api_key", ENV_API_KEY, inference.api_key.as_deref());
    let endpoint = resolve_value("endpoint", ENV_ENDPOINT, inference.endpoint.as_deref());
    let deployment = resolve_value("deployment", ENV_DEPLOYMENT, inference.deployment.as_deref());
    let api_version = resolve_value("api_version", ENV_API_VERSION, Some(&inference.api_version))
        .unwrap_or_else(|| inference.api_version.clone());

    match (api_key, endpoint, deployment) {
        (Some(api_key), Some(endpoint), Some(deployment)) => Ok(AzureOpenAiSettings {
            endpoint,
            deployment,
            api_version,
            api_key,
            temperature: inference.temperature,
            top_p: inference.top_p,
            requests_per_second: inference.requests_per_second,
        }),
        (api_key, endpoint, deployment) => {
            let missing: Vec<String> = [
                (api_key.is_none(), "api_key", ENV_API_KEY),
                (endpoint.is_none(), "endpoint", ENV_ENDPOINT),
                (deployment.is_none(), "deployment", ENV_DEPLOYMENT),
            ]
            .into_iter()
            .filter(|(is_missing, _, _)| *is_missing)
            .map(|(_, field, env_var)| format!("  - {} (environment: {}, TOML: [inference] {})", field, env_var, field))
            .collect();

            Err(Error::Config(format!(
                "Inference provider not configured. Missing:\n{}",
                missing.join("\n")
            )))
        }
    }
}

/// Hard bound on a single inference call
pub fn inference_timeout(toml_config: &TomlConfig) -> Duration {
    Duration::from_secs(toml_config.inference.timeout_secs.max(1))
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn resolve_value(field: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "Inference {} found in both environment ({}) and TOML. Using environment (highest priority).",
            field, env_var
        );
    }

    if let Some(value) = env_value {
        info!("Inference {} loaded from environment variable", field);
        return Some(value.trim().to_string());
    }

    toml_value.map(|value| {
        info!("Inference {} loaded from TOML config", field);
        value.trim().to_string()
    })
}
