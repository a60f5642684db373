/// `load_config` module: Loads a static YAML config and injects secrets from the environment,
/// producing the [`AppConfig`] the CLI passes down to the core pipeline.
///
/// This module is the only place where the config file and environment are read.
///
/// # Responsibilities
/// - Fail early with `ConfigNotFound` when the config path does not exist
/// - Parse the YAML into type-safe structs
/// - Take the folder id from the file, or `BOX_FOLDER_ID` when the file leaves it out
/// - Take secrets (`BOX_DEVELOPER_TOKEN`, `BOX_CLIENT_SECRET`) from the environment only
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary. A missing file keeps the
/// typed [`box_archiver_core::Error::ConfigNotFound`] inside, so callers can downcast to it.
///
/// Example:
///
/// ```yaml
/// remote:
///   folder_id: "123456"
///   auth:
///     type: client_credentials
///     client_id: abc
///     enterprise_id: "987"
/// ```
use anyhow::Result;
use box_archiver_core::config::SyncConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::upload::{
    Credentials, RemoteConfig, Subject, DEFAULT_API_BASE, DEFAULT_TOKEN_URL, DEFAULT_UPLOAD_BASE,
};

pub const FOLDER_ID_ENV: &str = "BOX_FOLDER_ID";
pub const DEVELOPER_TOKEN_ENV: &str = "BOX_DEVELOPER_TOKEN";
pub const CLIENT_SECRET_ENV: &str = "BOX_CLIENT_SECRET";

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    remote: RemoteSection,
}

#[derive(Debug, Deserialize)]
struct RemoteSection {
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    api_base: Option<String>,
    #[serde(default)]
    upload_base: Option<String>,
    #[serde(default)]
    token_url: Option<String>,
    auth: AuthSection,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AuthSection {
    DeveloperToken,
    ClientCredentials {
        client_id: String,
        #[serde(default)]
        enterprise_id: Option<String>,
        #[serde(default)]
        user_id: Option<String>,
    },
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    if !path_ref.exists() {
        error!(config_path = ?path_ref, "No such config file found");
        return Err(box_archiver_core::Error::ConfigNotFound {
            path: path_ref.to_path_buf(),
        }
        .into());
    }

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let folder_id = match raw.remote.folder_id {
        Some(id) if !id.trim().is_empty() => {
            info!("Folder id taken from config file");
            id
        }
        _ => match std::env::var(FOLDER_ID_ENV) {
            Ok(id) if !id.trim().is_empty() => {
                info!("{FOLDER_ID_ENV} found in env");
                id
            }
            _ => {
                error!("{FOLDER_ID_ENV} environment variable not set and remote.folder_id missing");
                anyhow::bail!(
                    "{FOLDER_ID_ENV} environment variable not set and remote.folder_id missing"
                );
            }
        },
    };

    let credentials = match raw.remote.auth {
        AuthSection::DeveloperToken => Credentials::AccessToken(required_env(DEVELOPER_TOKEN_ENV)?),
        AuthSection::ClientCredentials {
            client_id,
            enterprise_id,
            user_id,
        } => {
            let subject = match (enterprise_id, user_id) {
                (Some(id), None) => Subject::Enterprise(id),
                (None, Some(id)) => Subject::User(id),
                _ => {
                    error!("client_credentials auth needs exactly one of enterprise_id or user_id");
                    anyhow::bail!(
                        "client_credentials auth needs exactly one of enterprise_id or user_id"
                    );
                }
            };
            Credentials::ClientCredentials {
                client_id,
                client_secret: required_env(CLIENT_SECRET_ENV)?,
                subject,
            }
        }
    };

    let remote = RemoteConfig {
        api_base: raw
            .remote
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        upload_base: raw
            .remote
            .upload_base
            .unwrap_or_else(|| DEFAULT_UPLOAD_BASE.to_string()),
        token_url: raw
            .remote
            .token_url
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        credentials,
    };

    let sync = SyncConfig::new(folder_id);
    sync.trace_loaded();
    info!(
        api_base = %remote.api_base,
        credentials = ?remote.credentials,
        "Config loaded and merged successfully"
    );

    Ok(AppConfig { sync, remote })
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            info!("{name} found in env");
            Ok(value)
        }
        Ok(_) | Err(_) => {
            error!("{name} environment variable not set");
            anyhow::bail!("{name} environment variable not set")
        }
    }
}
