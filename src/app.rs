//! Wires configuration, persistence and the HTTP collaborators into one
//! orchestrator.

use crate::config::AppConfig;
use crate::database;
use crate::error::AppError;
use crate::models::{AutoUploadSettings, UserContext};
use crate::services::{
    user_context_service, AutoUploadOrchestrator, BackgroundUploader, HttpEventsSource,
    NetworkState, PageSlot, SharedConnection, StoredIdentityProvider, StoredSessionProbe,
};
use event_photos::{
    DirectoryScanner, HttpJsonSource, HttpUploadConfig, HttpUploadTransport, UploadDispatcher,
    UploadedSetFetcher,
};
use photoshare_auth::{
    FlagProbe, HandlerSlot, IdentityProvider, IdentityReadinessGate, ProviderSessionProbe,
    PushTokenRegistration, TokenSlot,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EVENTS_TIMEOUT: Duration = Duration::from_secs(30);

pub const PRIMARY_TOKEN_HANDLER: &str = "registerFCMToken";
pub const LEGACY_TOKEN_HANDLER: &str = "registerPushToken";

pub struct App {
    pub config: AppConfig,
    pub conn: SharedConnection,
    pub orchestrator: Arc<AutoUploadOrchestrator>,
    pub gate: Arc<IdentityReadinessGate>,
    /// Host flips this once its auth bridge is up
    pub auth_bridge: FlagProbe,
    pub network: NetworkState,
    pub pages: PageSlot,
    pub push_token: TokenSlot,
    pub primary_handler: Arc<HandlerSlot>,
    pub legacy_handler: Arc<HandlerSlot>,
}

impl App {
    pub fn build(config: AppConfig) -> Result<Self, AppError> {
        let conn = database::init_database(&config.database_path)?;
        let stored = user_context_service::load_user_context(&conn)?;
        let device_id = user_context_service::get_device_id(&conn)?;
        let conn: SharedConnection = Arc::new(Mutex::new(conn));

        let identity: Arc<dyn IdentityProvider> =
            Arc::new(StoredIdentityProvider::new(conn.clone()));
        let auth_bridge = FlagProbe::new();
        let primary_handler = Arc::new(HandlerSlot::new(PRIMARY_TOKEN_HANDLER));
        let legacy_handler = Arc::new(HandlerSlot::new(LEGACY_TOKEN_HANDLER));

        let gate = Arc::new(
            IdentityReadinessGate::new(config.gate_config())
                .with_probe(Arc::new(ProviderSessionProbe::new(identity.clone())))
                .with_probe(Arc::new(auth_bridge.clone()))
                .with_probe(Arc::new(StoredSessionProbe::new(conn.clone())))
                .with_registrar(primary_handler.clone())
                .with_registrar(legacy_handler.clone())
                .with_identity_provider(identity.clone()),
        );

        let json_source = HttpJsonSource::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.fetch_timeout(),
        )?;
        let fetcher = UploadedSetFetcher::new(Arc::new(json_source))
            .with_endpoints(config.uploaded_endpoints.clone())
            .with_timeout(config.fetch_timeout());

        let transport = HttpUploadTransport::new(HttpUploadConfig {
            upload_url: config.upload_url(),
            api_key: config.api_key.clone(),
            device_id,
            pause_between: config.upload_pause(),
        })?;

        let events = HttpEventsSource::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            identity,
            EVENTS_TIMEOUT,
        )?;

        let network = NetworkState::new(true);
        let pages = PageSlot::new();
        let orchestrator = AutoUploadOrchestrator::new(
            Arc::new(DirectoryScanner::new(config.media_dir.clone())),
            fetcher,
            UploadDispatcher::new(Arc::new(transport)),
            gate.clone(),
            Arc::new(events),
        )
        .with_page_provider(Arc::new(pages.clone()))
        .with_network_probe(Arc::new(network.clone()))
        .with_settings(
            stored
                .as_ref()
                .map(AutoUploadSettings::from)
                .unwrap_or_default(),
        );

        Ok(Self {
            config,
            conn,
            orchestrator: Arc::new(orchestrator),
            gate,
            auth_bridge,
            network,
            pages,
            push_token: TokenSlot::new(),
            primary_handler,
            legacy_handler,
        })
    }

    /// Stores the signed-in user and applies the new upload settings
    pub fn set_user_context(&self, context: &UserContext) -> Result<(), AppError> {
        {
            let conn = self.lock_conn()?;
            user_context_service::save_user_context(&conn, context)?;
        }
        self.orchestrator
            .update_settings(AutoUploadSettings::from(context));
        Ok(())
    }

    pub fn user_context(&self) -> Result<Option<UserContext>, AppError> {
        let conn = self.lock_conn()?;
        user_context_service::load_user_context(&conn)
    }

    /// Signs out: forgets the user and disables uploads
    pub fn clear_user_context(&self) -> Result<(), AppError> {
        {
            let conn = self.lock_conn()?;
            user_context_service::clear_user_context(&conn)?;
        }
        self.orchestrator.update_settings(AutoUploadSettings::default());
        Ok(())
    }

    pub fn background_uploader(&self) -> BackgroundUploader {
        BackgroundUploader::new(
            self.orchestrator.clone(),
            self.config.sweep_interval(),
            self.config.sweep_retry_delay(),
        )
    }

    pub fn push_registration(&self) -> PushTokenRegistration {
        PushTokenRegistration::new(self.push_token.clone(), self.gate.clone())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Other("Database connection lock poisoned".to_string()))
    }
}
