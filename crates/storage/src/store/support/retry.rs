#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use wc_core::cancel::CancelToken;

use super::super::StoreError;

const MAX_BACKOFF: Duration = Duration::from_millis(100);

/// Begin an immediate (write) transaction, retrying Busy with exponential
/// backoff until `deadline` has elapsed. Cancellation is checked before
/// every attempt.
pub(in crate::store) fn begin_immediate<'c>(
    conn: &'c mut Connection,
    deadline: Duration,
    cancel: &CancelToken,
) -> Result<Transaction<'c>, StoreError> {
    wait_until_writable(conn, deadline, cancel)?;
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(StoreError::from)
}

// Probing with a throwaway BEGIN IMMEDIATE keeps the retry loop free of the
// long-lived connection borrow the returned transaction needs.
fn wait_until_writable(
    conn: &Connection,
    deadline: Duration,
    cancel: &CancelToken,
) -> Result<(), StoreError> {
    let start = Instant::now();
    let mut delay = Duration::from_millis(1);
    loop {
        if cancel.is_cancelled() {
            return Err(StoreError::Interrupted);
        }
        match conn.execute_batch("BEGIN IMMEDIATE; COMMIT") {
            Ok(()) => return Ok(()),
            Err(err) => {
                let err = StoreError::from(err);
                if !matches!(err, StoreError::Busy) {
                    return Err(err);
                }
                if start.elapsed() >= deadline {
                    return Err(StoreError::Busy);
                }
            }
        }
        std::thread::sleep(delay);
        delay = (delay * 2).min(MAX_BACKOFF);
    }
}
