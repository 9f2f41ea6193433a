pub mod inventory;
pub mod operations;
