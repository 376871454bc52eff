//! Usage-table ingestion: flat CSV files into validated `UsageRecord`s.

pub mod csv_import;
pub mod error;

pub use csv_import::UsageCsvImporter;
pub use error::IngestError;
