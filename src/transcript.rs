use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::TranscriptError;
use crate::reply_generator::PERSONA_NAME;


#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn log(
        &self,
        user_id: &str,
        username: &str,
        turn_text: &str,
        reply_text: &str,
    ) -> Result<(), TranscriptError>;
}


/// Append-only, human readable transcript with one file per user.
pub struct TranscriptLogger {
    dir: PathBuf,
}


impl TranscriptLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }


    /// Path of the transcript file for a user: `{dir}/{username} - {user_id}.txt`.
    pub fn path_for(&self, user_id: &str, username: &str) -> PathBuf {
        let name = format!("{} - {}.txt", sanitize(username), sanitize(user_id));
        self.dir.join(name)
    }
}


#[async_trait]
impl TranscriptSink for TranscriptLogger {
    async fn log(
        &self,
        user_id: &str,
        username: &str,
        turn_text: &str,
        reply_text: &str,
    ) -> Result<(), TranscriptError> {
        fs::create_dir_all(&self.dir).await?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let entry = format!(
            "[{ts}] {username}: {turn_text}\n[{ts}] {PERSONA_NAME}: {reply_text}\n\n",
            ts = timestamp,
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(user_id, username))
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}


fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect()
}
