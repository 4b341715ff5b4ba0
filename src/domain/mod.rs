pub mod recon;
pub mod record;

pub use recon::{reconcile, MatchOutcome, MatchStatus};
pub use record::SourceRecord;
