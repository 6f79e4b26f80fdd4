pub mod inventory_event;
pub mod inventory_lot;
pub mod notification;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod return_request;
pub mod sale;
pub mod stock_threshold;
pub mod stock_transfer;
pub mod store;
pub mod supplier;
pub mod supply_request;
pub mod user;
