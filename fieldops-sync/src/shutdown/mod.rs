pub mod shutdown_manager;
pub mod shutdown_reason;
