mod reports;

pub use reports::PostgresReportRepo;
