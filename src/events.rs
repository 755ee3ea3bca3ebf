use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the service layer.
///
/// Events are best-effort notifications for logging and any future
/// subscribers; no service depends on an event being delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // User events
    UserRegistered(Uuid),
    ProfileUpdated(Uuid),

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Cart events
    CartItemAdded { user_id: Uuid, variant_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderPlaced(Uuid),
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    CouponRedeemed { code: String, order_id: Uuid },

    // Stock events
    StockUpdated { variant_id: Uuid, stock_quantity: i32 },
    LowStockDetected {
        variant_id: Uuid,
        available_stock: i64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Send an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropped event: {}", e);
        }
    }
}

/// Consume events from the channel and log them.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                variant_id,
                available_stock,
            } => {
                warn!(
                    "Low stock detected for variant {}: {} available",
                    variant_id, available_stock
                );
            }
            other => info!("Event: {:?}", other),
        }
    }
    info!("Event channel closed; processor exiting");
}
