//! Per-(user, package) standby state: the bucket classification, the reason
//! it was last set, and the usage timestamps the policy layer reads to
//! decide on the next transition.

pub mod bucket;
pub mod reason;
pub mod store;

pub use bucket::Bucket;
pub use reason::{Reason, ReasonKind};
pub use store::{AppHistory, AppHistoryStore, AppKey, BucketChange, HistorySnapshot};
