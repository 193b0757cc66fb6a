use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::client::errors::ClientResult;
use crate::client::storage::{load_json, save_json, KeyValueStore};
use crate::models::domain::quiz_question::{apply_answers, score_questions};
use crate::models::dto::QuizDto;

pub const CACHE_KEY_PREFIX: &str = "submitted_quiz_";

/// Unsaved submissions are dropped after this long.
pub fn unsaved_ttl() -> Duration {
    Duration::minutes(5)
}

/// Every submission is dropped after this long, saved or not.
pub fn max_age() -> Duration {
    Duration::hours(24)
}

pub fn cache_key(attempt_id: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, attempt_id)
}

/// A submitted attempt as kept in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAttempt {
    pub quiz_id: String,
    pub quiz: QuizDto,
    pub user_answers: Vec<Option<String>>,
    pub submitted_at: DateTime<Utc>,
    pub score: u8,
    #[serde(default)]
    pub is_saved: bool,
}

impl CachedAttempt {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.submitted_at;
        age > max_age() || (!self.is_saved && age > unsaved_ttl())
    }
}

#[derive(Clone)]
pub struct AttemptCache {
    store: Arc<dyn KeyValueStore>,
}

impl AttemptCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn cached_ids(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(CACHE_KEY_PREFIX).map(str::to_string))
            .collect()
    }

    /// Scores the answers against `quiz` and stores the result under
    /// `attempt_id`, dropping every other cached attempt first.
    pub fn record(
        &self,
        attempt_id: &str,
        quiz: &QuizDto,
        answers: &[Option<String>],
        now: DateTime<Utc>,
    ) -> ClientResult<CachedAttempt> {
        self.purge_others(attempt_id)?;

        let mut quiz = quiz.clone();
        apply_answers(&mut quiz.questions, answers);
        let score = score_questions(&quiz.questions).percentage;

        let entry = CachedAttempt {
            quiz_id: attempt_id.to_string(),
            quiz,
            user_answers: answers.to_vec(),
            submitted_at: now,
            score,
            is_saved: false,
        };
        save_json(self.store.as_ref(), &cache_key(attempt_id), &entry)?;
        log::debug!("Cached submission {}", attempt_id);
        Ok(entry)
    }

    /// Malformed and expired entries are removed and reported as a miss.
    pub fn load(&self, attempt_id: &str, now: DateTime<Utc>) -> ClientResult<Option<CachedAttempt>> {
        let key = cache_key(attempt_id);
        if self.store.get(&key).is_none() {
            return Ok(None);
        }

        match load_json::<CachedAttempt>(self.store.as_ref(), &key) {
            Some(entry) if !entry.is_expired(now) => Ok(Some(entry)),
            _ => {
                self.store.remove(&key)?;
                Ok(None)
            }
        }
    }

    pub fn mark_saved(&self, attempt_id: &str) -> ClientResult<bool> {
        let key = cache_key(attempt_id);
        let Some(mut entry) = load_json::<CachedAttempt>(self.store.as_ref(), &key) else {
            return Ok(false);
        };
        entry.is_saved = true;
        save_json(self.store.as_ref(), &key, &entry)?;
        Ok(true)
    }

    pub fn remove(&self, attempt_id: &str) -> ClientResult<()> {
        self.store.remove(&cache_key(attempt_id))
    }

    pub fn purge_others(&self, keep: &str) -> ClientResult<usize> {
        let mut removed = 0;
        for id in self.cached_ids().into_iter().filter(|id| id != keep) {
            self.remove(&id)?;
            removed += 1;
        }
        Ok(removed)
    }

    pub fn purge_saved(&self) -> ClientResult<usize> {
        let mut removed = 0;
        for id in self.cached_ids() {
            let saved = load_json::<CachedAttempt>(self.store.as_ref(), &cache_key(&id))
                .map(|entry| entry.is_saved)
                .unwrap_or(false);
            if saved {
                self.remove(&id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drops expired and unreadable entries. Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> ClientResult<usize> {
        let mut removed = 0;
        for id in self.cached_ids() {
            let stale = load_json::<CachedAttempt>(self.store.as_ref(), &cache_key(&id))
                .map(|entry| entry.is_expired(now))
                .unwrap_or(true);
            if stale {
                self.remove(&id)?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("Swept {} cached submission(s)", removed);
        }
        Ok(removed)
    }
}
