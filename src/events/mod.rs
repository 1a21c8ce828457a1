use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod broadcaster;

// Define the various events that can occur in the order subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// An order was materialized (webhook, pull path, or free checkout).
    OrderCreated(Uuid),
    WorkStarted(Uuid),
    ProgressUpdated {
        order_id: Uuid,
        progress: i32,
    },
    OrderCompleted(Uuid),
    OrderCancelled {
        order_id: Uuid,
        refunded: bool,
    },
}

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
}

// Function to process incoming events. Today every handler is a structured
// log line; downstream consumers (analytics, email) hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated(order_id) => {
                info!("Order created: {}", order_id);
            }
            Event::WorkStarted(order_id) => {
                info!("Work started on order {}", order_id);
            }
            Event::ProgressUpdated { order_id, progress } => {
                info!("Order {} progress now {}%", order_id, progress);
            }
            Event::OrderCompleted(order_id) => {
                info!("Order completed: {}", order_id);
            }
            Event::OrderCancelled { order_id, refunded } => {
                if refunded {
                    info!("Order {} cancelled and refunded", order_id);
                } else {
                    info!("Order {} cancelled", order_id);
                }
            }
        }
    }

    warn!("Event processing loop has ended");
}
