use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after a commit. A closed channel is logged, never surfaced.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Event dropped after commit");
            counter!("pharmacy_events.dropped", 1);
        }
    }
}

/// Domain events emitted once a write has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MedicineCreated(String),
    MedicineUpdated(String),
    MedicineDeleted(String),

    SaleRecorded {
        sale_group_id: String,
        total_price: Decimal,
        lines: usize,
    },

    VendorCreated(i32),
    VendorDeleted(i32),

    OrderCreated(i32),
    OrderUpdated(i32),
    OrderDeleted(i32),
}

impl Event {
    /// Short stable name used for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Event::MedicineCreated(_) => "medicine_created",
            Event::MedicineUpdated(_) => "medicine_updated",
            Event::MedicineDeleted(_) => "medicine_deleted",
            Event::SaleRecorded { .. } => "sale_recorded",
            Event::VendorCreated(_) => "vendor_created",
            Event::VendorDeleted(_) => "vendor_deleted",
            Event::OrderCreated(_) => "order_created",
            Event::OrderUpdated(_) => "order_updated",
            Event::OrderDeleted(_) => "order_deleted",
        }
    }
}

// Handlers implementing this trait receive every event after it is logged.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Logs every incoming event until all senders are dropped.
pub async fn process_events(rx: mpsc::Receiver<Event>) {
    process_events_with_handlers(rx, Vec::new()).await;
}

/// Logs every incoming event and fans it out to `handlers`.
/// Handler failures are logged and do not stop the loop.
pub async fn process_events_with_handlers(
    mut rx: mpsc::Receiver<Event>,
    handlers: Vec<Arc<dyn EventHandler>>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("pharmacy_events.processed", 1, "kind" => event.kind());

        match &event {
            Event::MedicineCreated(id) => info!(medicine_id = %id, "Medicine created"),
            Event::MedicineUpdated(id) => info!(medicine_id = %id, "Medicine updated"),
            Event::MedicineDeleted(id) => info!(medicine_id = %id, "Medicine deleted"),
            Event::SaleRecorded {
                sale_group_id,
                total_price,
                lines,
            } => info!(
                sale_group_id = %sale_group_id,
                total_price = %total_price,
                lines,
                "Sale recorded"
            ),
            Event::VendorCreated(id) => info!(vendor_id = id, "Vendor created"),
            Event::VendorDeleted(id) => info!(vendor_id = id, "Vendor deleted"),
            Event::OrderCreated(id) => info!(order_id = id, "Order created"),
            Event::OrderUpdated(id) => info!(order_id = id, "Order updated"),
            Event::OrderDeleted(id) => info!(order_id = id, "Order deleted"),
        }

        let results = join_all(handlers.iter().map(|h| h.handle_event(&event))).await;
        for err in results.into_iter().filter_map(Result::err) {
            error!(kind = event.kind(), error = %err, "Event handler failed");
        }
    }

    warn!("Event processing loop has ended");
}

/// How long shutdown waits for queued events to be handled.
pub const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits for the event loop to finish once every sender is gone.
/// Returns `false` if `grace` elapsed first; the task is aborted in that case.
pub async fn drain_events(task: JoinHandle<()>, grace: Duration) -> bool {
    let abort = task.abort_handle();
    match tokio::time::timeout(grace, task).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, "Event processing task failed");
            false
        }
        Err(_) => {
            warn!(grace = ?grace, "Event queue not drained before timeout");
            abort.abort();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.seen.lock().await.push(event.clone());
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl EventHandler for AlwaysFails {
        async fn handle_event(&self, _event: &Event) -> Result<(), String> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn handlers_see_events_in_order_and_failures_do_not_stop_the_loop() {
        let (tx, rx) = mpsc::channel(8);
        let recorder = Arc::new(Recorder::default());
        let handlers: Vec<Arc<dyn EventHandler>> = vec![recorder.clone(), Arc::new(AlwaysFails)];

        let sender = EventSender::new(tx);
        sender.send(Event::OrderCreated(1)).await.unwrap();
        sender
            .send(Event::SaleRecorded {
                sale_group_id: "g".into(),
                total_price: dec!(30),
                lines: 1,
            })
            .await
            .unwrap();
        drop(sender);

        process_events_with_handlers(rx, handlers).await;

        let seen = recorder.seen.lock().await;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Event::OrderCreated(1));
        assert_eq!(seen[1].kind(), "sale_recorded");
    }

    #[tokio::test]
    async fn queued_events_are_handled_before_the_loop_stops() {
        let (tx, rx) = mpsc::channel(16);
        let recorder = Arc::new(Recorder::default());
        let handlers: Vec<Arc<dyn EventHandler>> = vec![recorder.clone()];
        let task = tokio::spawn(process_events_with_handlers(rx, handlers));

        let sender = EventSender::new(tx);
        for id in 1..=10 {
            sender.send(Event::OrderUpdated(id)).await.unwrap();
        }
        drop(sender);

        assert!(drain_events(task, Duration::from_secs(2)).await);
        assert_eq!(recorder.seen.lock().await.len(), 10);
    }

    #[tokio::test]
    async fn drain_gives_up_while_a_sender_is_alive() {
        let (tx, rx) = mpsc::channel::<Event>(1);
        let task = tokio::spawn(process_events(rx));

        assert!(!drain_events(task, Duration::from_millis(50)).await);
        drop(tx);
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::VendorDeleted(3)).await.is_err());
        sender.send_or_log(Event::VendorDeleted(3)).await;
    }
}
