//! Transfer orchestration and outcome classification.
//!
//! A transfer is one `transfer_items` round trip. Its [`TransferResult`] is
//! classified into exactly one [`TransferOutcome`]:
//!
//! | Condition | Outcome | Summary |
//! |-----------|---------|---------|
//! | top-level `success: false` | `Failed` | `Transfer failed: <remote error>` |
//! | any per-item failure | `Partial` | `Transferred S of T items. Failed: a, b, c...` |
//! | otherwise | `Complete` | `Successfully transferred N item(s)` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ItemId;
use crate::protocol::{OutboundMessage, Reply, RequestKind, TransferRequest, TransferResult};

use super::BridgeContext;

// ============================================================================
// Constants
// ============================================================================

/// Failed ids named in a partial summary before eliding the rest.
const MAX_NAMED_FAILURES: usize = 3;

/// Placeholder for a failed result that carried no `instanceId`.
const UNKNOWN_ITEM: &str = "<unknown>";

// ============================================================================
// TransferOutcome
// ============================================================================

/// Classified outcome of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every item moved.
    Complete {
        /// Items moved.
        transferred: usize,
    },
    /// Some items moved, some did not.
    Partial {
        /// Items moved.
        succeeded: usize,
        /// Items attempted.
        total: usize,
        /// Ids of the items that did not move, in result order.
        failed: Vec<Option<ItemId>>,
    },
    /// The client rejected the whole transfer.
    Failed {
        /// Remote error text, verbatim.
        error: Option<String>,
    },
}

impl TransferOutcome {
    /// Classifies a transfer result. Total and deterministic.
    #[must_use]
    pub fn classify(result: &TransferResult) -> Self {
        if !result.success {
            return Self::Failed {
                error: result.error.clone(),
            };
        }

        let failed: Vec<Option<ItemId>> =
            result.failures().map(|r| r.item_id.clone()).collect();

        if failed.is_empty() {
            Self::Complete {
                transferred: result.succeeded(),
            }
        } else {
            Self::Partial {
                succeeded: result.succeeded(),
                total: result.results.len(),
                failed,
            }
        }
    }

    /// Returns `true` if every item moved.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Converts non-complete outcomes into errors.
    ///
    /// # Errors
    ///
    /// - [`Error::PartialFailure`] for a partial transfer
    /// - [`Error::RemoteFailure`] for a rejected transfer
    pub fn into_result(self) -> Result<usize> {
        match self {
            Self::Complete { transferred } => Ok(transferred),
            Self::Partial {
                succeeded, failed, ..
            } => Err(Error::partial_failure(
                succeeded,
                failed.into_iter().flatten().collect(),
            )),
            Self::Failed { error } => Err(Error::remote_failure(
                error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete { transferred } => {
                write!(f, "Successfully transferred {transferred} item(s)")
            }
            Self::Partial {
                succeeded,
                total,
                failed,
            } => {
                write!(f, "Transferred {succeeded} of {total} items. Failed: ")?;
                let named: Vec<&str> = failed
                    .iter()
                    .take(MAX_NAMED_FAILURES)
                    .map(|id| id.as_ref().map_or(UNKNOWN_ITEM, ItemId::as_str))
                    .collect();
                f.write_str(&named.join(", "))?;
                if failed.len() > MAX_NAMED_FAILURES {
                    f.write_str("...")?;
                }
                Ok(())
            }
            Self::Failed { error } => {
                write!(
                    f,
                    "Transfer failed: {}",
                    error.as_deref().unwrap_or("unknown error")
                )
            }
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Sends one transfer and classifies the reply.
///
/// # Errors
///
/// - [`Error::NotConnected`] if no client is connected
/// - [`Error::Timeout`] if the client does not answer in time
/// - [`Error::Protocol`] if the reply is not a transfer result
pub(crate) async fn execute(
    context: &BridgeContext,
    request: TransferRequest,
) -> Result<TransferOutcome> {
    if !context.registry().is_connected() {
        return Err(Error::NotConnected);
    }

    if request.item_ids.is_empty() {
        debug!(target_store = %request.target, "Empty transfer, nothing to send");
        return Ok(TransferOutcome::Complete { transferred: 0 });
    }

    info!(
        count = request.item_ids.len(),
        target_store = %request.target,
        "Transferring items"
    );

    let reply = context
        .correlator()
        .request(
            context.registry(),
            RequestKind::TransferItems,
            |request_id| OutboundMessage::transfer_items(request_id, &request),
            context.config().transfer_timeout,
        )
        .await?;

    let Reply::Transfer(result) = reply else {
        return Err(Error::protocol("transfer answered with a non-transfer reply"));
    };

    let outcome = TransferOutcome::classify(&result);
    match &outcome {
        TransferOutcome::Complete { transferred } => {
            info!(transferred, target_store = %request.target, "Transfer complete");
        }
        TransferOutcome::Partial {
            succeeded, total, ..
        } => {
            warn!(succeeded, total, target_store = %request.target, "Transfer partially failed");
        }
        TransferOutcome::Failed { error } => {
            warn!(error = ?error, target_store = %request.target, "Transfer rejected");
        }
    }

    Ok(outcome)
}

// ============================================================================
// Tests
// ============================================================================
