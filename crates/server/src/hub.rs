//! Broadcast hub.
//!
//! The single point translating internal events to connected clients.
//! Metrics snapshots go to every connection; command-originated events go
//! only to the connection that owns the originating tab. Delivery is
//! best-effort: a failed send removes the connection from the active set
//! and surfaces its tabs so the caller can tear the sessions down.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webterm_protocol::ServerMessage;

/// A connection removed after a failed send, with the tabs it owned.
#[derive(Debug)]
pub struct DroppedConnection {
    pub conn_id: u64,
    pub tabs: Vec<String>,
}

#[derive(Default)]
pub struct BroadcastHub {
    connections: DashMap<u64, mpsc::Sender<ServerMessage>>,
    /// tab id → owning connection
    tabs: DashMap<String, u64>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(&self, conn_id: u64, tx: mpsc::Sender<ServerMessage>) {
        self.connections.insert(conn_id, tx);
        info!(
            component = "hub",
            event = "hub.connection.registered",
            connection_id = conn_id,
            active = self.connections.len(),
        );
    }

    /// Remove a connection and return the tabs it owned.
    pub fn unregister_connection(&self, conn_id: u64) -> Vec<String> {
        self.connections.remove(&conn_id);
        let owned: Vec<String> = self
            .tabs
            .iter()
            .filter(|entry| *entry.value() == conn_id)
            .map(|entry| entry.key().clone())
            .collect();
        for tab in &owned {
            self.tabs.remove(tab);
        }
        info!(
            component = "hub",
            event = "hub.connection.unregistered",
            connection_id = conn_id,
            released_tabs = owned.len(),
        );
        owned
    }

    /// Record that `conn_id` owns `tab_id`. A reconnect re-claims the tab
    /// from the previous (dead) connection.
    pub fn claim_tab(&self, tab_id: &str, conn_id: u64) {
        self.tabs.insert(tab_id.to_string(), conn_id);
    }

    pub fn release_tab(&self, tab_id: &str) {
        self.tabs.remove(tab_id);
    }

    /// Whether any live connection currently owns this tab.
    pub fn tab_is_connected(&self, tab_id: &str) -> bool {
        self.tabs.get(tab_id).is_some()
    }

    /// Deliver to the connection owning `tab_id`. On a failed send the
    /// connection is dropped and its tabs are returned for teardown; an
    /// unowned tab is a silent no-op (the client already went away).
    pub async fn send_to_tab(
        &self,
        tab_id: &str,
        msg: ServerMessage,
    ) -> Result<(), DroppedConnection> {
        let Some(conn_id) = self.tabs.get(tab_id).map(|e| *e.value()) else {
            debug!(
                component = "hub",
                event = "hub.send.unowned_tab",
                tab_id = %tab_id,
            );
            return Ok(());
        };
        let Some(tx) = self.connections.get(&conn_id).map(|e| e.value().clone()) else {
            return Err(self.drop_connection(conn_id));
        };
        if tx.send(msg).await.is_err() {
            return Err(self.drop_connection(conn_id));
        }
        Ok(())
    }

    /// Push to every connection. Iterates a snapshot of the set so
    /// concurrent connect/disconnect is tolerated; failed receivers are
    /// removed and returned.
    pub async fn broadcast(&self, msg: ServerMessage) -> Vec<DroppedConnection> {
        let targets: Vec<(u64, mpsc::Sender<ServerMessage>)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut dropped = Vec::new();
        for (conn_id, tx) in targets {
            if tx.send(msg.clone()).await.is_err() {
                dropped.push(self.drop_connection(conn_id));
            }
        }
        dropped
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn drop_connection(&self, conn_id: u64) -> DroppedConnection {
        let tabs = self.unregister_connection(conn_id);
        DroppedConnection { conn_id, tabs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webterm_protocol::OutputKind;

    fn output(tab: &str) -> ServerMessage {
        ServerMessage::Output {
            tab_id: tab.to_string(),
            output: "ok".to_string(),
            kind: OutputKind::Standard,
        }
    }

    #[tokio::test]
    async fn targeted_send_reaches_only_the_owner() {
        let hub = BroadcastHub::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        hub.register_connection(1, tx_a);
        hub.register_connection(2, tx_b);
        hub.claim_tab("tab-1", 1);

        hub.send_to_tab("tab-1", output("tab-1")).await.unwrap();
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let hub = BroadcastHub::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        hub.register_connection(1, tx_a);
        hub.register_connection(2, tx_b);

        let dropped = hub.broadcast(output("any")).await;
        assert!(dropped.is_empty());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn failed_send_drops_connection_and_reports_tabs() {
        let hub = BroadcastHub::new();
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        hub.register_connection(7, tx);
        hub.claim_tab("tab-x", 7);
        hub.claim_tab("tab-y", 7);

        let err = hub.send_to_tab("tab-x", output("tab-x")).await.unwrap_err();
        assert_eq!(err.conn_id, 7);
        let mut tabs = err.tabs;
        tabs.sort();
        assert_eq!(tabs, vec!["tab-x", "tab-y"]);
        assert_eq!(hub.connection_count(), 0);
        assert!(!hub.tab_is_connected("tab-x"));
    }

    #[tokio::test]
    async fn broadcast_excludes_removed_connections() {
        let hub = BroadcastHub::new();
        let (tx_dead, rx_dead) = mpsc::channel(8);
        drop(rx_dead);
        let (tx_live, mut rx_live) = mpsc::channel(8);
        hub.register_connection(1, tx_dead);
        hub.register_connection(2, tx_live);

        let dropped = hub.broadcast(output("any")).await;
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].conn_id, 1);
        assert!(rx_live.try_recv().is_ok());

        // Next broadcast only sees the live connection
        let dropped = hub.broadcast(output("again")).await;
        assert!(dropped.is_empty());
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn reconnect_reclaims_the_tab() {
        let hub = BroadcastHub::new();
        let (tx_old, _rx_old) = mpsc::channel(8);
        let (tx_new, mut rx_new) = mpsc::channel(8);
        hub.register_connection(1, tx_old);
        hub.claim_tab("tab-1", 1);
        hub.register_connection(2, tx_new);
        hub.claim_tab("tab-1", 2);

        hub.send_to_tab("tab-1", output("tab-1")).await.unwrap();
        assert!(rx_new.try_recv().is_ok());
    }
}
