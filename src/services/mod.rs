// Stock and sales
pub mod medicines;
pub mod sales;
pub mod serde_helpers;

// Purchasing
pub mod orders;
pub mod vendors;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig, DbPool};
    use crate::events::{Event, EventSender};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Migrated in-memory SQLite database plus an event channel whose receiver
    /// the test can inspect.
    pub struct TestDb {
        pub pool: Arc<DbPool>,
        pub events: Arc<EventSender>,
        pub rx: mpsc::Receiver<Event>,
    }

    impl TestDb {
        pub async fn new() -> Self {
            // Every sqlite::memory: connection is its own database, so keep one.
            let pool = establish_connection_with_config(&DbConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                min_connections: 1,
                ..Default::default()
            })
            .await
            .expect("in-memory sqlite");
            run_migrations(&pool).await.expect("migrations");

            let (tx, rx) = mpsc::channel(256);
            Self {
                pool: Arc::new(pool),
                events: Arc::new(EventSender::new(tx)),
                rx,
            }
        }

        /// Events emitted so far, oldest first.
        pub fn drain_events(&mut self) -> Vec<Event> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }
}
