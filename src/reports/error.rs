use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Neither the database nor the snapshot could produce the report.
    #[error("No data available for the {report} report")]
    NoData { report: &'static str },

    #[error("Invalid allocation for channel '{channel}': {reason}")]
    InvalidAllocation { channel: String, reason: String },
}

pub type ReportResult<T> = Result<T, ReportError>;
