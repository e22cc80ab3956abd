//! Session registry and shared application state.
//!
//! The registry is the arena of live sessions, keyed by tab id with
//! per-entry granularity (dashmap) so unrelated tabs never serialize on
//! each other. Records are created on first contact and removed either
//! explicitly (`close_tab`) or after the linger window once the owning
//! connection is gone.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::hub::BroadcastHub;
use crate::metrics::MetricsReader;
use crate::session::Session;
use crate::session_actor::SessionActorHandle;
use crate::session_command::SessionCommand;
use crate::transcript::TranscriptLog;

/// Knobs the registry needs from the startup configuration
pub struct RegistrySettings {
    /// Directory new tabs start in
    pub root: PathBuf,
    pub history_limit: usize,
    pub history_dedup: bool,
    /// How long a disconnected tab's state is retained
    pub linger: Duration,
}

pub struct SessionRegistry {
    sessions: DashMap<String, SessionActorHandle>,
    hub: Arc<BroadcastHub>,
    dispatcher: Arc<Dispatcher>,
    settings: RegistrySettings,
}

impl SessionRegistry {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        hub: Arc<BroadcastHub>,
        settings: RegistrySettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            hub,
            dispatcher,
            settings,
        })
    }

    /// Existing actor for the tab, or a freshly spawned one with the
    /// default directory and empty history.
    pub fn get_or_create(self: &Arc<Self>, tab_id: &str) -> SessionActorHandle {
        self.sessions
            .entry(tab_id.to_string())
            .or_insert_with(|| {
                info!(
                    component = "registry",
                    event = "session.created",
                    tab_id = %tab_id,
                );
                SessionActorHandle::spawn(
                    Session::new(
                        tab_id.to_string(),
                        self.settings.root.clone(),
                        self.settings.history_limit,
                        self.settings.history_dedup,
                    ),
                    self.dispatcher.clone(),
                    self.hub.clone(),
                    Arc::downgrade(self),
                )
            })
            .clone()
    }

    pub fn get(&self, tab_id: &str) -> Option<SessionActorHandle> {
        self.sessions.get(tab_id).map(|entry| entry.value().clone())
    }

    /// Remove the record and stop its actor.
    pub async fn remove(&self, tab_id: &str) {
        if let Some((_, handle)) = self.sessions.remove(tab_id) {
            handle.send(SessionCommand::Shutdown).await;
            info!(
                component = "registry",
                event = "session.removed",
                tab_id = %tab_id,
            );
        }
    }

    /// Start the linger window for a tab whose connection went away.
    /// Removal fires only if no connection has re-claimed the tab by
    /// then, so a reconnect within the window resumes the same record.
    pub fn schedule_teardown(self: &Arc<Self>, tab_id: String) {
        let registry = Arc::downgrade(self);
        let linger = self.settings.linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            let Some(registry) = registry.upgrade() else {
                return;
            };
            if registry.hub.tab_is_connected(&tab_id) {
                debug!(
                    component = "registry",
                    event = "session.teardown_cancelled",
                    tab_id = %tab_id,
                );
                return;
            }
            registry.remove(&tab_id).await;
        });
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Everything the HTTP layer needs, shared across handlers.
#[derive(Clone)]
pub struct AppContext {
    pub sessions: Arc<SessionRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub transcripts: Arc<TranscriptLog>,
    pub metrics: MetricsReader,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSampler;
    use crate::navigator::Navigator;
    use crate::registry::CommandRegistry;
    use tempfile::TempDir;

    fn registry(root: &std::path::Path, linger: Duration) -> (Arc<SessionRegistry>, Arc<BroadcastHub>) {
        let (_sampler, reader) = MetricsSampler::new();
        let dispatcher = Arc::new(Dispatcher::new(
            CommandRegistry::new(),
            Navigator::new(root.to_path_buf(), None),
            reader,
            Arc::new(TranscriptLog::new(64)),
            5,
        ));
        let hub = Arc::new(BroadcastHub::new());
        let sessions = SessionRegistry::new(
            dispatcher,
            hub.clone(),
            RegistrySettings {
                root: root.to_path_buf(),
                history_limit: 50,
                history_dedup: true,
                linger,
            },
        );
        (sessions, hub)
    }

    #[tokio::test]
    async fn get_or_create_reuses_the_record() {
        let tmp = TempDir::new().unwrap();
        let (sessions, _hub) = registry(tmp.path(), Duration::from_secs(60));
        sessions.get_or_create("t1");
        sessions.get_or_create("t1");
        sessions.get_or_create("t2");
        assert_eq!(sessions.session_count(), 2);
    }

    #[tokio::test]
    async fn remove_drops_the_record() {
        let tmp = TempDir::new().unwrap();
        let (sessions, _hub) = registry(tmp.path(), Duration::from_secs(60));
        sessions.get_or_create("t1");
        sessions.remove("t1").await;
        assert!(sessions.get("t1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unclaimed_tab_is_torn_down_after_linger() {
        let tmp = TempDir::new().unwrap();
        let (sessions, _hub) = registry(tmp.path(), Duration::from_millis(100));
        sessions.get_or_create("t1");
        sessions.schedule_teardown("t1".to_string());

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(sessions.get("t1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reclaimed_tab_survives_the_linger_window() {
        let tmp = TempDir::new().unwrap();
        let (sessions, hub) = registry(tmp.path(), Duration::from_millis(100));
        sessions.get_or_create("t1");
        sessions.schedule_teardown("t1".to_string());

        // A new connection claims the tab before the window closes
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        hub.register_connection(9, tx);
        hub.claim_tab("t1", 9);

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(sessions.get("t1").is_some());
    }
}
