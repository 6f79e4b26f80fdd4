pub mod inventory;
pub mod notifications;
pub mod purchase_orders;
pub mod returns;
pub mod sales;
pub mod stock_ledger;
pub mod stock_transfers;
pub mod supply_requests;
pub mod thresholds;
pub mod timeline;
