//! Business logic services for the Equipment Inventory Management server

pub mod activity;
pub mod auth;
pub mod cancellation;
pub mod delivery;
pub mod demo;
pub mod import;
pub mod inventory;
pub mod invoice;
pub mod order;
pub mod reconciliation;
pub mod reporting;
pub mod returns;
pub mod stock;
pub mod user;

pub use activity::ActivityService;
pub use auth::AuthService;
pub use cancellation::CancellationService;
pub use delivery::DeliveryService;
pub use demo::DemoService;
pub use import::ImportService;
pub use inventory::InventoryService;
pub use invoice::InvoiceService;
pub use order::OrderService;
pub use reconciliation::ReconciliationService;
pub use reporting::ReportingService;
pub use returns::ReturnService;
pub use user::UserService;
