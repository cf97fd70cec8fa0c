use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::app::error::{Result, SkymarkError};
use crate::bsky::{session, BskyClient, SessionEvent};
use crate::config::Config;
use crate::delivery::{HttpBookmarker, Signer};
use crate::pipeline::Pipeline;
use crate::store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub client: Arc<BskyClient>,
    pub bookmarker: Arc<HttpBookmarker>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = Self::default_data_dir()?.join("skymark.db");
        Self::with_db_path(config, db_path)
    }

    pub fn with_db_path(config: Config, db_path: PathBuf) -> Result<Self> {
        if config.bluesky.identifier.is_empty() {
            return Err(SkymarkError::Config("bluesky.identifier is not set".into()));
        }
        if config.bookmarker.endpoint.is_empty() {
            return Err(SkymarkError::Config("bookmarker.endpoint is not set".into()));
        }

        let service = Url::parse(&config.bluesky.service)?;
        let endpoint = Url::parse(&config.bookmarker.endpoint)?;
        let signer = Signer::from_hex_secret(&config.bookmarker.secret_hex)?;

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let client = Arc::new(BskyClient::new(service));
        let bookmarker = Arc::new(HttpBookmarker::new(endpoint, signer));

        Ok(Self {
            config,
            store,
            client,
            bookmarker,
        })
    }

    /// Store namespace for this identity.
    pub fn namespace(&self) -> &str {
        &self.config.bluesky.identifier
    }

    /// One fetch-normalize-deliver pass. Session refreshes that happened
    /// along the way are persisted afterwards.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<usize> {
        self.ensure_session().await?;

        let actor = self
            .client
            .session_did()
            .await
            .ok_or_else(|| SkymarkError::Auth("no active session".into()))?;

        let pipeline = Pipeline {
            source: self.client.as_ref(),
            store: self.store.as_ref(),
            bookmarker: self.bookmarker.as_ref(),
            seen_key: session::seen_key(self.namespace()),
            thread_depth: self.config.poll.thread_depth,
            dry_run: self.config.poll.dry_run,
            dump_dir: self.dump_dir()?,
        };

        let result = pipeline.run_cycle(&actor, cancel).await;
        self.persist_session_events().await?;
        result
    }

    /// Makes sure the client holds a usable session: an already adopted one,
    /// the persisted blob, or a fresh non-interactive sign-in.
    pub async fn ensure_session(&self) -> Result<()> {
        if self.client.has_session().await {
            return Ok(());
        }

        if let Some(saved) = session::load_session(self.store.as_ref(), self.namespace())? {
            self.client.resume(saved).await;
            return Ok(());
        }

        if self.config.bluesky.password.is_empty() {
            return Err(SkymarkError::Auth(
                "no saved session and no password configured, run `skymark login`".into(),
            ));
        }

        let created = self
            .client
            .login(
                &self.config.bluesky.identifier,
                &self.config.bluesky.password,
                None,
            )
            .await?;
        session::save_session(self.store.as_ref(), self.namespace(), &created)?;
        Ok(())
    }

    pub async fn persist_session_events(&self) -> Result<()> {
        for event in self.client.drain_session_events().await {
            let SessionEvent::Refreshed(refreshed) = event;
            session::save_session(self.store.as_ref(), self.namespace(), &refreshed)?;
        }
        Ok(())
    }

    fn dump_dir(&self) -> Result<Option<PathBuf>> {
        if !self.config.poll.dump_feed {
            return Ok(None);
        }
        Ok(Some(Self::default_data_dir()?.join("dumps")))
    }

    fn default_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| SkymarkError::Config("Could not find data directory".into()))?;
        let dir = data_dir.join("skymark");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
