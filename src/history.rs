use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Turn,
    Reply,
}


#[derive(Debug, Default)]
struct UserHistory {
    turns: VecDeque<String>,
    replies: VecDeque<String>,
}


impl UserHistory {
    fn sequence(&self, kind: HistoryKind) -> &VecDeque<String> {
        match kind {
            HistoryKind::Turn => &self.turns,
            HistoryKind::Reply => &self.replies,
        }
    }


    fn sequence_mut(&mut self, kind: HistoryKind) -> &mut VecDeque<String> {
        match kind {
            HistoryKind::Turn => &mut self.turns,
            HistoryKind::Reply => &mut self.replies,
        }
    }
}


/// Per-user bounded record of past coalesced turns and generated replies.
///
/// Both sequences are capped at `cap` entries. Appending past the cap drops the
/// oldest entry first.
pub struct HistoryStore {
    cap: usize,
    users: Mutex<HashMap<String, UserHistory>>,
}


impl HistoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            users: Mutex::new(HashMap::new()),
        }
    }


    pub fn append_turn(&self, user_id: &str, turn_text: &str) {
        self.append(user_id, HistoryKind::Turn, turn_text);
    }


    pub fn append_reply(&self, user_id: &str, reply_text: &str) {
        self.append(user_id, HistoryKind::Reply, reply_text);
    }


    fn append(&self, user_id: &str, kind: HistoryKind, text: &str) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let sequence = users.entry(user_id.to_string()).or_default().sequence_mut(kind);

        sequence.push_back(text.to_string());
        while sequence.len() > self.cap {
            sequence.pop_front();
        }
    }


    /// Returns the most recent `limit` entries of `kind` for a user, oldest first.
    ///
    /// Unknown users yield an empty list. Reading never changes stored history.
    pub fn get_recent(&self, user_id: &str, kind: HistoryKind, limit: usize) -> Vec<String> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let Some(history) = users.get(user_id) else {
            return Vec::new();
        };

        let sequence = history.sequence(kind);
        let skip = sequence.len().saturating_sub(limit);
        sequence.iter().skip(skip).cloned().collect()
    }


    pub fn remove(&self, user_id: &str) {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.remove(user_id);
    }
}
