//! Session actor: owns a `Session` and processes commands sequentially.
//!
//! Each tab runs as an independent tokio task. External callers
//! communicate via `SessionActorHandle` which sends `SessionCommand`
//! messages over an mpsc channel; the strict one-at-a-time processing of
//! that queue is what keeps a tab's command executions from interleaving
//! on its working directory. Tabs block only themselves: a long-running
//! command stalls this queue and nothing else.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use webterm_protocol::ServerMessage;

use crate::autocomplete;
use crate::dispatcher::Dispatcher;
use crate::hub::BroadcastHub;
use crate::session::Session;
use crate::session_command::SessionCommand;
use crate::state::SessionRegistry;

/// Handle to a running session actor (cheap to Clone).
#[derive(Clone)]
pub struct SessionActorHandle {
    pub tab_id: String,
    command_tx: mpsc::Sender<SessionCommand>,
}

impl SessionActorHandle {
    pub fn spawn(
        session: Session,
        dispatcher: Arc<Dispatcher>,
        hub: Arc<BroadcastHub>,
        registry: Weak<SessionRegistry>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(256);
        let tab_id = session.tab_id().to_string();
        tokio::spawn(actor_loop(session, command_rx, dispatcher, hub, registry));
        Self { tab_id, command_tx }
    }

    /// Send a command to the actor (fire-and-forget).
    pub async fn send(&self, cmd: SessionCommand) {
        if self.command_tx.send(cmd).await.is_err() {
            warn!(
                component = "session_actor",
                tab_id = %self.tab_id,
                "Actor channel closed, command dropped"
            );
        }
    }
}

async fn actor_loop(
    mut session: Session,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    dispatcher: Arc<Dispatcher>,
    hub: Arc<BroadcastHub>,
    registry: Weak<SessionRegistry>,
) {
    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            SessionCommand::Execute { raw } => {
                let events = dispatcher.handle(&mut session, &raw).await;
                deliver(&hub, &registry, session.tab_id(), events).await;
            }

            SessionCommand::Autocomplete { partial } => {
                let suggestions =
                    autocomplete::suggest(dispatcher.registry(), &partial, session.current_dir());
                let event = ServerMessage::AutocompleteSuggestions {
                    tab_id: session.tab_id().to_string(),
                    suggestions,
                };
                deliver(&hub, &registry, session.tab_id(), vec![event]).await;
            }

            SessionCommand::History => {
                let event = ServerMessage::History {
                    tab_id: session.tab_id().to_string(),
                    history: session.history(),
                };
                deliver(&hub, &registry, session.tab_id(), vec![event]).await;
            }

            SessionCommand::Announce => {
                let event = ServerMessage::TabOpened {
                    tab_id: session.tab_id().to_string(),
                    directory: session.current_dir().display().to_string(),
                };
                deliver(&hub, &registry, session.tab_id(), vec![event]).await;
            }

            SessionCommand::CurrentDir { reply } => {
                let _ = reply.send(session.current_dir().to_path_buf());
            }

            SessionCommand::Shutdown => break,
        }
    }
    debug!(
        component = "session_actor",
        tab_id = %session.tab_id(),
        "Session actor stopped"
    );
}

/// Push events to the tab's owning connection. A dead connection tears
/// down its sessions after the linger window.
async fn deliver(
    hub: &BroadcastHub,
    registry: &Weak<SessionRegistry>,
    tab_id: &str,
    events: Vec<ServerMessage>,
) {
    for event in events {
        if let Err(dropped) = hub.send_to_tab(tab_id, event).await {
            if let Some(registry) = registry.upgrade() {
                for tab in dropped.tabs {
                    registry.schedule_teardown(tab);
                }
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSampler;
    use crate::navigator::Navigator;
    use crate::registry::CommandRegistry;
    use crate::transcript::TranscriptLog;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::sync::oneshot;
    use webterm_protocol::OutputKind;

    fn spawn_actor(root: &Path, tab_id: &str, hub: Arc<BroadcastHub>) -> SessionActorHandle {
        let (_sampler, reader) = MetricsSampler::new();
        let dispatcher = Arc::new(Dispatcher::new(
            CommandRegistry::new(),
            Navigator::new(root.to_path_buf(), None),
            reader,
            Arc::new(TranscriptLog::new(64)),
            5,
        ));
        let session = Session::new(tab_id.to_string(), root.to_path_buf(), 50, true);
        SessionActorHandle::spawn(session, dispatcher, hub, Weak::new())
    }

    #[tokio::test]
    async fn commands_execute_in_submission_order() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let hub = Arc::new(BroadcastHub::new());
        let (tx, mut rx) = mpsc::channel(32);
        hub.register_connection(1, tx);
        hub.claim_tab("tab-1", 1);

        let actor = spawn_actor(tmp.path(), "tab-1", hub);
        actor
            .send(SessionCommand::Execute {
                raw: "cd sub".into(),
            })
            .await;
        actor
            .send(SessionCommand::Execute { raw: "pwd".into() })
            .await;

        // cd output, directory change, then pwd output, in order
        let mut outputs = Vec::new();
        for _ in 0..3 {
            outputs.push(rx.recv().await.expect("expected event"));
        }
        assert!(matches!(&outputs[0], ServerMessage::Output { kind, .. } if *kind == OutputKind::Standard));
        assert!(matches!(&outputs[1], ServerMessage::DirectoryChange { .. }));
        match &outputs[2] {
            ServerMessage::Output { output, .. } => {
                assert!(output.ends_with("sub"), "pwd saw stale directory: {output}")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn current_dir_query_reflects_completed_commands() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let hub = Arc::new(BroadcastHub::new());
        let actor = spawn_actor(tmp.path(), "tab-1", hub);

        actor
            .send(SessionCommand::Execute {
                raw: "cd sub".into(),
            })
            .await;
        let (reply, rx) = oneshot::channel();
        actor.send(SessionCommand::CurrentDir { reply }).await;
        assert_eq!(rx.await.unwrap(), tmp.path().join("sub"));
    }

    #[tokio::test]
    async fn history_request_returns_oldest_first() {
        let tmp = TempDir::new().unwrap();
        let hub = Arc::new(BroadcastHub::new());
        let (tx, mut rx) = mpsc::channel(32);
        hub.register_connection(1, tx);
        hub.claim_tab("tab-1", 1);

        let actor = spawn_actor(tmp.path(), "tab-1", hub);
        actor
            .send(SessionCommand::Execute { raw: "pwd".into() })
            .await;
        actor
            .send(SessionCommand::Execute {
                raw: "echo hi".into(),
            })
            .await;
        actor.send(SessionCommand::History).await;

        loop {
            match rx.recv().await.expect("expected event") {
                ServerMessage::History { history, .. } => {
                    assert_eq!(history, vec!["pwd", "echo hi"]);
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn announce_reports_the_current_directory() {
        let tmp = TempDir::new().unwrap();
        let hub = Arc::new(BroadcastHub::new());
        let (tx, mut rx) = mpsc::channel(32);
        hub.register_connection(1, tx);
        hub.claim_tab("tab-1", 1);

        let actor = spawn_actor(tmp.path(), "tab-1", hub);
        actor.send(SessionCommand::Announce).await;
        match rx.recv().await.expect("expected event") {
            ServerMessage::TabOpened { tab_id, directory } => {
                assert_eq!(tab_id, "tab-1");
                assert_eq!(directory, tmp.path().display().to_string());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn independent_tabs_do_not_share_state() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        let hub = Arc::new(BroadcastHub::new());

        let one = spawn_actor(tmp.path(), "t1", hub.clone());
        let two = spawn_actor(tmp.path(), "t2", hub);

        one.send(SessionCommand::Execute { raw: "cd a".into() }).await;

        let (reply, rx) = oneshot::channel();
        two.send(SessionCommand::CurrentDir { reply }).await;
        assert_eq!(rx.await.unwrap(), tmp.path());

        let (reply, rx) = oneshot::channel();
        one.send(SessionCommand::CurrentDir { reply }).await;
        assert_eq!(rx.await.unwrap(), tmp.path().join("a"));
    }
}
