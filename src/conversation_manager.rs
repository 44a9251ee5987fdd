use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::communication_channel::CommunicationChannel;
use crate::completion::CompletionService;
use crate::config::RelayConfig;
use crate::history::HistoryStore;
use crate::reply_generator::ReplyGenerator;
use crate::transcript::TranscriptSink;


pub const START_GREETING: &str = "Olá! Como posso te ajudar hoje?";


/// Owns every user's conversation state and turns bursts of messages into replies.
///
/// Each inbound message lands in the user's pending buffer and (re)starts a
/// quiet-period timer. When the timer runs out without being replaced, the
/// buffer is joined into one turn and sent through the reply pipeline.
pub struct ConversationManager {
    quiet_period: Duration,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    history: Arc<HistoryStore>,
    generator: ReplyGenerator,
    transcript: Arc<dyn TranscriptSink>,
    channel: Arc<dyn CommunicationChannel>,
}


struct Session {
    state: Mutex<ConversationState>,
    // Held for the whole of a turn so one user's replies go out in order.
    turn_gate: tokio::sync::Mutex<()>,
}


struct ConversationState {
    pending: Vec<String>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    in_flight: usize,
    last_activity: Instant,
}


impl Default for ConversationState {
    fn default() -> Self {
        Self {
            pending: vec![],
            timer: None,
            generation: 0,
            in_flight: 0,
            last_activity: Instant::now(),
        }
    }
}


impl ConversationState {
    /// Takes the pending buffer as one turn if `generation` is still current.
    ///
    /// A stale generation leaves everything untouched. A blank buffer is
    /// cleared and yields `None`.
    fn claim(&mut self, generation: u64) -> Option<String> {
        if self.generation != generation {
            return None;
        }
        self.timer = None;

        let combined = self.pending.join(" ");
        self.pending.clear();
        if combined.trim().is_empty() {
            return None;
        }
        self.in_flight += 1;
        Some(combined)
    }


    fn is_idle(&self, now: Instant, max_idle: Duration) -> bool {
        self.pending.is_empty()
            && self.timer.is_none()
            && self.in_flight == 0
            && now.saturating_duration_since(self.last_activity) >= max_idle
    }
}


impl ConversationManager {
    pub fn new(
        config: &RelayConfig,
        completion: Arc<dyn CompletionService>,
        transcript: Arc<dyn TranscriptSink>,
        channel: Arc<dyn CommunicationChannel>,
    ) -> Arc<Self> {
        let history = Arc::new(HistoryStore::new(config.history_cap));
        let generator = ReplyGenerator::new(completion, Arc::clone(&history), config);

        Arc::new(Self {
            quiet_period: config.quiet_period,
            sessions: Mutex::new(HashMap::new()),
            history,
            generator,
            transcript,
            channel,
        })
    }


    pub fn greeting(&self) -> &'static str {
        START_GREETING
    }


    #[cfg(test)]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }


    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }


    /// Buffers a message and restarts the user's quiet-period timer.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Key for all per-user state and the reply recipient.
    /// * `username` - Display name, only used for the transcript.
    /// * `text` - Raw message text, appended to the pending buffer as is.
    pub fn on_message(self: &Arc<Self>, user_id: &str, username: &str, text: &str) {
        // The registry stays locked until the message is buffered so idle
        // eviction can never drop the session in between.
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = Arc::clone(sessions.entry(user_id.to_string()).or_insert_with(|| {
            Arc::new(Session {
                state: Mutex::new(ConversationState::default()),
                turn_gate: tokio::sync::Mutex::new(()),
            })
        }));
        let mut state = session.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.pending.push(text.to_string());
        state.generation += 1;
        state.last_activity = Instant::now();

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        debug!(user_id, pending = state.pending.len(), "message buffered");

        let manager = Arc::clone(self);
        let task_session = Arc::clone(&session);
        let user_id = user_id.to_string();
        let username = username.to_string();
        let generation = state.generation;

        state.timer = Some(tokio::spawn(async move {
            manager.fire(task_session, user_id, username, generation).await;
        }));
    }


    async fn fire(&self, session: Arc<Session>, user_id: String, username: String, generation: u64) {
        time::sleep(self.quiet_period).await;

        // None when a newer message replaced this timer after the sleep
        // finished, or when the burst was blank.
        let claimed = session
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .claim(generation);
        let Some(combined) = claimed else {
            debug!(%user_id, generation, "nothing to send");
            return;
        };

        {
            let _gate = session.turn_gate.lock().await;
            self.process_turn(&user_id, &username, &combined).await;
        }

        let mut state = session.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight -= 1;
        state.last_activity = Instant::now();
    }


    async fn process_turn(&self, user_id: &str, username: &str, turn: &str) {
        let reply = match self.generator.generate(user_id, turn).await {
            Ok(reply) => reply,
            Err(error) => {
                error!(%error, user_id, "completion failed, dropping turn");
                return;
            }
        };

        self.history.append_turn(user_id, turn);
        self.history.append_reply(user_id, &reply);

        if let Err(error) = self.transcript.log(user_id, username, turn, &reply).await {
            warn!(%error, user_id, "failed to write transcript");
        }

        if let Err(error) = self.channel.send_message(user_id, &reply).await {
            error!(%error, user_id, "failed to deliver reply");
            return;
        }

        info!(user_id, "reply delivered");
    }


    /// Drops sessions and history for users that have been quiet for `max_idle`
    /// and have nothing pending or in flight. Returns how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let idle: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| {
                session
                    .state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_idle(now, max_idle)
            })
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &idle {
            sessions.remove(user_id);
            self.history.remove(user_id);
        }

        idle.len()
    }


    pub fn spawn_idle_sweeper(self: &Arc<Self>, max_idle: Duration) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let period = (max_idle / 4).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let evicted = manager.evict_idle(max_idle);
                if evicted > 0 {
                    info!(evicted, "evicted idle conversations");
                }
            }
        })
    }
}
