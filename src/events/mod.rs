use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Domain events emitted after a stock-affecting transaction commits.
///
/// Delivery is best-effort; durable side effects (timeline rows,
/// notification rows) are written inside the same database transaction
/// as the mutation that caused them, so a dropped event loses nothing
/// a caller can observe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    InventoryRecorded { lot_id: i64, product_id: i64, store_id: i64 },
    InventoryUpdated { lot_id: i64 },
    InventoryDeleted { lot_id: i64 },
    PaymentStatusChanged { lot_id: i64, new_status: String },
    PurchaseOrderReceived { purchase_order_id: i64, store_id: i64 },
    ReturnCompleted { return_id: i64, return_type: String },
    StockTransferCompleted { transfer_id: i64, from_store_id: i64, to_store_id: i64 },
    SaleRecorded { sale_id: i64, product_id: i64, store_id: i64 },
    SupplyRequestCreated { request_id: i64, store_id: i64 },
    SupplyRequestResolved { request_id: i64, status: String },
    LowStock { product_id: i64, store_id: i64, quantity: i32, threshold: i32 },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget send used after a transaction has committed.
    /// A full or closed channel is logged, not surfaced to the caller.
    pub fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Event channel unavailable, dropping event: {}", e);
        }
    }
}

/// Background loop draining the event channel. Currently the events only
/// feed structured logs; webhook fan-out would hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStock {
                product_id,
                store_id,
                quantity,
                threshold,
            } => {
                warn!(
                    product_id,
                    store_id, quantity, threshold, "Product fell below its stock threshold"
                );
            }
            other => {
                info!(event = ?other, "Processed domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        sender
            .send(Event::SaleRecorded {
                sale_id: 1,
                product_id: 2,
                store_id: 3,
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::SaleRecorded { sale_id, .. }) => assert_eq!(sale_id, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_a_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender.send_or_log(Event::InventoryDeleted { lot_id: 9 });
    }
}
