//! Bulk import of a whole snapshot into an external analysis service.

use std::time::Duration;

use ptree_core::TreeSnapshot;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::BridgeError;
use crate::http::HttpClient;

/// Acknowledgement returned by the import endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushReceipt {
    /// Absent means the service does not report success explicitly.
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: String,
}

/// `POST url` with the snapshot as JSON.
///
/// A 2xx answer whose body says `success: false` is reported as a
/// [`BridgeError::Status`] carrying the service message.
#[instrument(skip(snapshot), fields(nodes = snapshot.nodes.len()))]
pub fn push_snapshot(
    url: &str,
    snapshot: &TreeSnapshot,
    timeout: Duration,
) -> Result<PushReceipt, BridgeError> {
    let receipt: PushReceipt = HttpClient::new(timeout).post_json(url, snapshot)?;
    if receipt.success == Some(false) {
        return Err(BridgeError::status(url, 200, &receipt.message));
    }
    info!(message = %receipt.message, "snapshot pushed");
    Ok(receipt)
}
