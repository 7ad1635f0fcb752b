pub mod capture;
pub mod config;
pub mod flow;
pub mod ocr;
pub mod store;
pub mod utils;
pub mod verification;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use capture::{guidance_provider, CaptureHandoff, GuidanceProvider, MediaWriter, ScanController};
use config::CaptureConfig;
use flow::VerificationFlow;
use store::{open_store, KeyValueStore};
use verification::VerificationSession;

pub use utils::init_logging;

pub const CONFIG_FILE: &str = "capture_config.json";
pub const MEDIA_DIR: &str = "captures";

/// Process-wide state the host keeps for the lifetime of the app.
pub struct CaptureCore {
    pub config: CaptureConfig,
    pub session: VerificationSession,
    pub handoff: CaptureHandoff,
    pub guidance: Box<dyn GuidanceProvider>,
    pub media: MediaWriter,
    pub scan: ScanController,
    store: Arc<dyn KeyValueStore>,
    app_data_dir: PathBuf,
}

impl CaptureCore {
    /// Loads `capture_config.json` (plus env overrides) from `app_data_dir`
    /// and opens the core with it.
    pub fn open_default(app_data_dir: &Path) -> Result<Self> {
        let config = CaptureConfig::load(&app_data_dir.join(CONFIG_FILE))?;
        Self::open(app_data_dir, config)
    }

    pub fn open(app_data_dir: &Path, config: CaptureConfig) -> Result<Self> {
        init_logging();
        info!("idcapture starting up...");

        std::fs::create_dir_all(app_data_dir).with_context(|| {
            format!("failed to create app data directory {}", app_data_dir.display())
        })?;

        let store = open_store(config.storage, app_data_dir)?;
        let session = VerificationSession::open(store.clone(), config.scope.clone());
        let media = MediaWriter::new(app_data_dir.join(MEDIA_DIR))?;
        let guidance = guidance_provider(config.guidance);

        Ok(Self {
            session,
            handoff: CaptureHandoff::new(),
            guidance,
            media,
            scan: ScanController::new(),
            store,
            app_data_dir: app_data_dir.to_path_buf(),
            config,
        })
    }

    pub fn flow(&self) -> VerificationFlow<'_> {
        VerificationFlow::new(&self.session, &self.handoff)
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }
}
