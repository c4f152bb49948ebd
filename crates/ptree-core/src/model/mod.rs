pub mod node;
pub mod snapshot;
pub mod tree;

use chrono::{SecondsFormat, Utc};

/// Current instant as an RFC 3339 UTC timestamp, second precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
