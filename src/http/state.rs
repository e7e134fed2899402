use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::audio::{CuePlayer, DeviceCuePlayer, MicRecorderFactory, RecorderFactory};
use crate::chat::ChatClient;
use crate::config::Config;
use crate::history::HistoryStore;
use crate::question::QuestionBank;
use crate::scoring::ScoringClient;
use crate::session::SpeakingSession;

/// A live room: the session plus its one-second ticker.
pub struct RoomHandle {
    pub session: Arc<Mutex<SpeakingSession>>,
    ticker: JoinHandle<()>,
}

impl RoomHandle {
    /// Wrap a session and start driving its countdown.
    pub fn spawn(session: SpeakingSession) -> Arc<Self> {
        let session = Arc::new(Mutex::new(session));

        let tick_session = Arc::clone(&session);
        let ticker = tokio::spawn(async move {
            let mut clock = interval(Duration::from_secs(1));
            clock.tick().await; // first tick completes immediately
            loop {
                clock.tick().await;
                tick_session.lock().await.tick().await;
            }
        });

        Arc::new(Self { session, ticker })
    }

    /// Stop the ticker and tear the session down.
    pub async fn close(&self) {
        self.ticker.abort();
        self.session.lock().await.shutdown();
    }
}

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active rooms (room_id -> handle).
    pub rooms: Arc<RwLock<HashMap<String, Arc<RoomHandle>>>>,
    pub config: Arc<Config>,
    pub bank: Arc<QuestionBank>,
    pub scoring: Arc<ScoringClient>,
    pub history: Arc<HistoryStore>,
    pub chat: Arc<ChatClient>,
    pub recorder_factory: Arc<dyn RecorderFactory>,
    pub cue_player: Arc<dyn CuePlayer>,
}

impl AppState {
    pub fn new(config: Config, bank: QuestionBank) -> Self {
        let scoring = Arc::new(ScoringClient::new(config.scoring.api_url.clone()));
        let history = Arc::new(HistoryStore::new(config.history.path.clone()));
        let chat = Arc::new(ChatClient::new(config.chat.clone()));
        let recorder_factory = Arc::new(MicRecorderFactory::new(config.audio.sample_rate));

        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
            bank: Arc::new(bank),
            scoring,
            history,
            chat,
            recorder_factory,
            cue_player: Arc::new(DeviceCuePlayer::new()),
        }
    }
}
