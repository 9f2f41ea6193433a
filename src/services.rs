pub mod auth;
pub mod fifo;
pub mod inventory_service;
pub use inventory_service::InventoryService;
pub mod locks;
pub mod lots;
pub mod operation_service;
pub use operation_service::OperationsService;
pub mod rbac_service;
pub mod stock;
