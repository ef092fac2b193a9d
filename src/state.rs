use crate::db::SharedPersistence;
use crate::domain::models::Card;
use crate::domain::questionnaire::SurveyDocument;
use crate::domain::shell::AppShell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub struct AppState {
    pub persistence: SharedPersistence,
    pub document: Arc<SurveyDocument>,
    pub fallback_cards: Vec<Card>,
    pub deck_limit: usize,
    pub session_key: Vec<u8>,
    pub submit_policy: SubmitPolicy,
    pub max_visitors: usize,
    pub visitors: RwLock<HashMap<Uuid, VisitorSlot>>, // visitor id -> shell
}

/// Final-submission attempts a visitor gets per window.
#[derive(Debug, Clone, Copy)]
pub struct SubmitPolicy {
    pub max_attempts: usize,
    pub window: Duration,
}

pub struct VisitorSlot {
    pub shell: Arc<Mutex<AppShell>>,
    pub last_seen: Instant,
    /// Oldest first; entries older than the policy window are pruned lazily.
    submit_attempts: VecDeque<Instant>,
}

impl VisitorSlot {
    pub fn new(shell: AppShell) -> Self {
        Self {
            shell: Arc::new(Mutex::new(shell)),
            last_seen: Instant::now(),
            submit_attempts: VecDeque::new(),
        }
    }
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Returns the visitor's shell, creating it with `create` on first sight.
    /// A full map gives up its least recently seen visitor first.
    pub async fn shell_for(
        &self,
        visitor: Uuid,
        create: impl FnOnce() -> AppShell,
    ) -> Arc<Mutex<AppShell>> {
        let mut visitors = self.visitors.write().await;
        if !visitors.contains_key(&visitor) && visitors.len() >= self.max_visitors {
            let oldest = visitors
                .iter()
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                visitors.remove(&oldest);
                tracing::warn!("Visitor map full ({}), dropped visitor {}", self.max_visitors, oldest);
            }
        }

        let slot = visitors.entry(visitor).or_insert_with(|| VisitorSlot::new(create()));
        slot.last_seen = Instant::now();
        slot.shell.clone()
    }

    /// Counts one final-submission attempt against the visitor's window.
    /// `false` means the window is used up and nothing was counted.
    pub async fn admit_submission(&self, visitor: Uuid) -> bool {
        let now = Instant::now();
        let mut visitors = self.visitors.write().await;
        // Evicted mid-request: the shell is orphaned, nothing left to protect.
        let Some(slot) = visitors.get_mut(&visitor) else {
            return true;
        };

        while let Some(&at) = slot.submit_attempts.front() {
            if now.duration_since(at) < self.submit_policy.window {
                break;
            }
            slot.submit_attempts.pop_front();
        }
        if slot.submit_attempts.len() >= self.submit_policy.max_attempts {
            tracing::warn!("Visitor {} exceeded the submission limit", visitor);
            return false;
        }
        slot.submit_attempts.push_back(now);
        true
    }

    /// Drops shells idle for longer than `ttl_secs`, submission history
    /// included; returns how many went.
    pub async fn evict_idle(&self, ttl_secs: u64) -> usize {
        let mut visitors = self.visitors.write().await;
        let before = visitors.len();
        visitors.retain(|_, slot| slot.last_seen.elapsed().as_secs() < ttl_secs);
        before - visitors.len()
    }
}
