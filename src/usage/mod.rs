pub mod ledger;
pub mod types;

pub use ledger::{InMemoryUsageLedger, JsonLinesUsageLedger, UsageLedger};
pub use types::{LedgerError, UsageRecord};
