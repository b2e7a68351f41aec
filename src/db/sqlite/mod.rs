mod reports;

pub use reports::SqliteReportRepo;
