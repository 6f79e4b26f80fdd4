pub mod common;
pub mod health;
pub mod inventory;
pub mod notifications;
pub mod purchase_orders;
pub mod returns;
pub mod sales;
pub mod stock_transfers;
pub mod supply_requests;
pub mod thresholds;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    inventory::InventoryService, notifications::NotificationService,
    purchase_orders::PurchaseOrderService, returns::ReturnService, sales::SaleService,
    stock_ledger::StockLedger, stock_transfers::StockTransferService,
    supply_requests::SupplyRequestService, thresholds::ThresholdService,
    timeline::TimelineService,
};
use std::sync::Arc;

/// Service container wired once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService,
    pub timeline: TimelineService,
    pub thresholds: ThresholdService,
    pub notifications: NotificationService,
    pub purchase_orders: PurchaseOrderService,
    pub returns: ReturnService,
    pub stock_transfers: StockTransferService,
    pub sales: SaleService,
    pub supply_requests: SupplyRequestService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig, event_sender: EventSender) -> Self {
        let ledger = StockLedger::new(config.low_stock_default_threshold);
        Self {
            inventory: InventoryService::new(db.clone(), event_sender.clone(), ledger),
            timeline: TimelineService::new(db.clone()),
            thresholds: ThresholdService::new(db.clone(), config.low_stock_default_threshold),
            notifications: NotificationService::new(db.clone()),
            purchase_orders: PurchaseOrderService::new(db.clone(), event_sender.clone(), ledger),
            returns: ReturnService::new(db.clone(), event_sender.clone(), ledger),
            stock_transfers: StockTransferService::new(db.clone(), event_sender.clone(), ledger),
            sales: SaleService::new(db.clone(), event_sender.clone(), ledger),
            supply_requests: SupplyRequestService::new(db, event_sender),
        }
    }
}
