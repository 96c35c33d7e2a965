use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::services::{TagRepository, TagService};
use crate::db::sql_http::SqlHttpClient;
use crate::drive::auth::ServiceAccountKey;
use crate::drive::google::GoogleDriveStore;
use crate::drive::{DriveError, FileStore};
use crate::server::config::ServerConfig;
use crate::server::http::{build_client, RetryPolicy};
use crate::web::AppState;

fn build_tag_repository(config: &ServerConfig, client: &reqwest::Client, retry: RetryPolicy) -> Arc<dyn TagRepository> {
    match config.tag_store_endpoint() {
        Some((url, auth_token)) => {
            info!(url = %url, "Tag database configured.");
            let executor = SqlHttpClient::new(client.clone(), url, auth_token, retry);
            Arc::new(TagService::new(Arc::new(executor)))
        }
        None => Arc::new(TagService::unconfigured()),
    }
}

fn build_file_store(
    config: &ServerConfig,
    client: &reqwest::Client,
    retry: RetryPolicy,
) -> Result<Arc<dyn FileStore>, DriveError> {
    let encoded = config.google_service_account_key.as_deref().ok_or_else(|| {
        DriveError::NotConfigured("GOOGLE_SERVICE_ACCOUNT_KEY is not set".to_string())
    })?;
    let key = ServiceAccountKey::from_base64(encoded)?;
    info!(client_email = %key.client_email, "Drive service account loaded.");
    let store: Arc<dyn FileStore> = Arc::new(GoogleDriveStore::new(client.clone(), key, retry)?);
    Ok(store)
}

/// Wires both gateways from configuration. Missing or broken credentials
/// leave the matching store unavailable instead of failing start-up.
pub fn build_app_state(config: ServerConfig) -> Result<Arc<AppState>, reqwest::Error> {
    let client = build_client(config.request_timeout())?;
    let retry = config.retry_policy();

    let tag_repository = build_tag_repository(&config, &client, retry);
    let file_store = match build_file_store(&config, &client, retry) {
        Ok(store) => Some(store),
        Err(DriveError::NotConfigured(msg)) => {
            warn!("File storage not configured: {}. Photo routes will fail.", msg);
            None
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize file storage. Photo routes will fail.");
            None
        }
    };
    if config.google_drive_folder_id.is_none() {
        warn!("GOOGLE_DRIVE_FOLDER_ID is not set; requests must name a folder.");
    }

    Ok(Arc::new(AppState {
        tag_repository,
        file_store,
        config: Arc::new(config),
    }))
}
