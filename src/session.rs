//! Session lifecycle: owns the chat store, the conversation engine and the
//! error aggregator from start-up to shutdown.

use chrono::Utc;
use log::{error, info, warn};
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::alerts::ErrorAggregator;
use crate::config::Config;
use crate::conversation::{ConversationEngine, ConversationEvent, EngineSettings};
use crate::error::{ChatError, Result};
use crate::mock_data;
use crate::models::Message;
use crate::random::{RandomSource, StdRandom};
use crate::store::{ChatPager, ChatSource, ChatStore, MockChatSource, SharedStore};

pub struct Session {
    config: Config,
    store: SharedStore,
    engine: ConversationEngine,
    alerts: ErrorAggregator,
}

impl Session {
    /// Start a session backed by the built-in mock data.
    pub async fn start_mock(config: Config) -> Result<(Session, mpsc::Receiver<ConversationEvent>)> {
        config.validate()?;
        let mut rng = random_source(&config);
        let data = mock_data::generate(Utc::now(), rng.as_mut());
        let source = MockChatSource::new(data.chats, config.load_delay());
        Session::start_with(config, &source, data.history, rng).await
    }

    /// Start a session loading chats from `source`. A failed or timed out
    /// load is reported and leaves the session with an empty chat list; an
    /// invalid config refuses to start.
    pub async fn start_with(
        config: Config,
        source: &dyn ChatSource,
        history: HashMap<String, Vec<Message>>,
        rng: Box<dyn RandomSource>,
    ) -> Result<(Session, mpsc::Receiver<ConversationEvent>)> {
        if let Err(e) = config.validate() {
            error!("Refusing to start session: {}", e);
            return Err(e);
        }
        let alerts = ErrorAggregator::new(config.error_ttl());

        let store = match ChatStore::load(source, config.load_timeout()).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Falling back to an empty chat list: {}", e);
                alerts.report(e.code(), &e.to_string());
                ChatStore::default()
            }
        }
        .into_shared();

        let (engine, events) = ConversationEngine::new(
            store.clone(),
            EngineSettings::from(&config),
            rng,
            history,
        );
        info!("Session started");

        Ok((
            Session {
                config,
                store,
                engine,
                alerts,
            },
            events,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ConversationEngine {
        &mut self.engine
    }

    pub fn alerts(&self) -> &ErrorAggregator {
        &self.alerts
    }

    /// A pagination cursor sized from the config.
    pub fn pager(&self) -> ChatPager {
        ChatPager::new(self.config.page_size)
    }

    /// Report a failed user action on the error banner feed and hand the
    /// error back.
    pub fn surface(&self, error: ChatError) -> ChatError {
        self.alerts.report(error.code(), &error.to_string());
        error
    }

    /// Close every conversation and drop pending banners.
    pub async fn shutdown(&mut self) {
        self.engine.close_all().await;
        self.alerts.clear();
        info!("Session shut down");
    }
}

fn random_source(config: &Config) -> Box<dyn RandomSource> {
    match config.seed {
        Some(seed) => Box::new(StdRandom::seeded(seed)),
        None => Box::new(StdRandom::from_entropy()),
    }
}
