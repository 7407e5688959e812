pub mod catalogue_store;
pub mod import_service;
pub mod reconciliation_service;

pub use catalogue_store::*;
pub use import_service::*;
pub use reconciliation_service::*;
