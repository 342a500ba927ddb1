//! Server configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`ServerConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::Path;

use secrecy::SecretString;
use socialdesk_types::config::{LlmConfig, SearchConfig, ServerConfig};

/// Load server configuration from `{data_dir}/config.toml`.
pub async fn load_server_config(data_dir: &Path) -> ServerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServerConfig::default();
        }
    };

    match toml::from_str::<ServerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ServerConfig::default()
        }
    }
}

/// Blank values count as unset.
fn key_from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
}

/// Read the model API key from the environment variable named in the config.
pub fn resolve_api_key(config: &LlmConfig) -> Option<SecretString> {
    key_from_env(&config.api_key_env)
}

/// Read the web search API key; `None` leaves search disabled.
pub fn resolve_search_key(config: &SearchConfig) -> Option<SecretString> {
    key_from_env(&config.api_key_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use socialdesk_types::config::StreamMode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_server_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.chat.stream_mode, StreamMode::Cumulative);
    }

    #[tokio::test]
    async fn load_server_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 9100

[llm]
chat_model = "gpt-4.1"

[chat]
stream_mode = "delta"
"#,
        )
        .await
        .unwrap();

        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.llm.chat_model, "gpt-4.1");
        assert_eq!(config.chat.stream_mode, StreamMode::Delta);
        assert_eq!(config.session.ttl_days, 7);
    }

    #[tokio::test]
    async fn load_server_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn resolve_api_key_reads_named_variable() {
        let config = LlmConfig {
            api_key_env: "SOCIALDESK_TEST_KEY_PRESENT".to_string(),
            ..LlmConfig::default()
        };
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("SOCIALDESK_TEST_KEY_PRESENT", " sk-live ");
        }
        let key = resolve_api_key(&config).unwrap();
        assert_eq!(key.expose_secret(), "sk-live");
        unsafe {
            std::env::remove_var("SOCIALDESK_TEST_KEY_PRESENT");
        }
    }

    #[test]
    fn resolve_api_key_missing_is_none() {
        let config = LlmConfig {
            api_key_env: "SOCIALDESK_TEST_KEY_ABSENT".to_string(),
            ..LlmConfig::default()
        };
        assert!(resolve_api_key(&config).is_none());
    }

    #[test]
    fn resolve_search_key_blank_is_none() {
        let config = SearchConfig {
            api_key_env: "SOCIALDESK_TEST_SEARCH_KEY_BLANK".to_string(),
            ..SearchConfig::default()
        };
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("SOCIALDESK_TEST_SEARCH_KEY_BLANK", "   ");
        }
        assert!(resolve_search_key(&config).is_none());
        unsafe {
            std::env::remove_var("SOCIALDESK_TEST_SEARCH_KEY_BLANK");
        }
    }
}
