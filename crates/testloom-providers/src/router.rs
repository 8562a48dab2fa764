use anyhow::{Context, Result};
use testloom_core::{ProviderKind, ProviderSettings, TextGenerator};

use crate::gemini::GeminiClient;
use crate::openai_compatible::OpenAICompatibleClient;

/// Build the configured backend, reading its API key from the environment
pub fn build_generator(settings: &ProviderSettings) -> Result<Box<dyn TextGenerator>> {
    let generator: Box<dyn TextGenerator> = match settings.kind {
        ProviderKind::Gemini => {
            let api_key = resolve_api_key(&settings.api_key_env)?;
            let mut client = GeminiClient::new(api_key, &settings.model)
                .with_temperature(settings.temperature)
                .with_max_tokens(settings.max_tokens);
            if let Some(base_url) = &settings.base_url {
                client = client.with_base_url(base_url);
            }
            tracing::debug!(client = %client.name, "using Gemini backend");
            Box::new(client)
        }
        ProviderKind::OpenaiCompatible => {
            let base_url = settings
                .base_url
                .as_deref()
                .context("provider.base_url is required for openai_compatible backends")?;
            // local servers often run without a key
            let api_key = resolve_api_key(&settings.api_key_env).ok();
            let client = OpenAICompatibleClient::new(
                format!("OpenAI-compatible {}", settings.model),
                api_key,
                base_url,
                &settings.model,
            )
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens);
            tracing::debug!(client = %client.name, base_url, "using OpenAI-compatible backend");
            Box::new(client)
        }
    };
    Ok(generator)
}

fn resolve_api_key(env_name: &str) -> Result<String> {
    std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("Missing required API key env var {}", env_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(kind: ProviderKind, env: &str) -> ProviderSettings {
        ProviderSettings {
            kind,
            api_key_env: env.to_string(),
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn test_gemini_requires_key() {
        let result = build_generator(&settings(ProviderKind::Gemini, "TESTLOOM_UNSET_KEY_FOR_TESTS"));
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("TESTLOOM_UNSET_KEY_FOR_TESTS"));
    }

    #[test]
    fn test_gemini_with_key() {
        std::env::set_var("TESTLOOM_GEMINI_KEY_FOR_TESTS", "abc");
        assert!(build_generator(&settings(ProviderKind::Gemini, "TESTLOOM_GEMINI_KEY_FOR_TESTS")).is_ok());
    }

    #[test]
    fn test_openai_compatible_requires_base_url() {
        let mut s = settings(ProviderKind::OpenaiCompatible, "TESTLOOM_UNSET_KEY_FOR_TESTS");
        assert!(build_generator(&s).is_err());

        s.base_url = Some("http://localhost:11434/v1".into());
        assert!(build_generator(&s).is_ok());
    }
}
