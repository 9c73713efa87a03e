pub mod question;
pub mod report;
pub mod request;

pub use question::{QuestionKind, QuestionRecord, ScanResult};
pub use report::{BatchReport, KindTotals, RunReport};
pub use request::{RunMode, RunRequest, UnknownMode};
