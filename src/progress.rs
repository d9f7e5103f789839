//! Cancellation tokens and progress observers.
//!
//! A decode session polls its [`CancellationToken`] once per packet and
//! stops when the token is cancelled or its deadline has passed. Progress
//! is pushed to a [`ProgressCallback`] as [`ProgressInfo`] snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use mediakit::{
//!     CancellationToken, DecodeOptions, Manager, MediaError, MediaFlag, ProgressCallback,
//!     ProgressInfo,
//! };
//!
//! struct PacketCounter;
//!
//! impl ProgressCallback for PacketCounter {
//!     fn on_progress(&self, report: &ProgressInfo) {
//!         eprintln!("{} packets after {:?}", report.current, report.elapsed);
//!     }
//! }
//!
//! let manager = Manager::new();
//! let media = manager.open_file("input.mp4")?;
//! let map = manager.map(&media, MediaFlag::AUDIO)?;
//! let token = CancellationToken::with_timeout(Duration::from_secs(30));
//! let options = DecodeOptions::new().with_progress(Arc::new(PacketCounter));
//!
//! manager.decode_with_options(&token, map, &options, |_, _packet| Ok(()))?;
//! # Ok::<(), MediaError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Which pipeline a report comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Reading and dispatching packets in a decode session.
    Decoding,
    /// Converting audio buffers.
    AudioConversion,
}

/// Where an operation stands.
///
/// Decode sessions emit one every
/// [`batch_size`](crate::DecodeOptions::with_batch_size) packets and once
/// more when the session ends.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Reporting pipeline.
    pub operation: OperationType,
    /// Packets dispatched or buffers delivered so far.
    pub current: u64,
    /// Expected count, when the pipeline knows it up front.
    pub total: Option<u64>,
    /// `current` as a percentage of `total`.
    pub percentage: Option<f32>,
    /// Time since the tracker was created.
    pub elapsed: Duration,
    /// Media timestamp of the item that triggered this report.
    pub current_timestamp: Option<Duration>,
}

/// Receives [`ProgressInfo`] reports.
///
/// Observers cannot stop the operation they watch; cancel its
/// [`CancellationToken`] instead.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// Observer used when none is configured.
pub(crate) struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Why an operation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// [`CancellationToken::cancel`] was called.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
}

impl Display for CancelReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CancelReason::Cancelled => write!(f, "cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// A shared cancel flag with an optional deadline.
///
/// Clones share the flag. The decode loop consults
/// [`reason`](CancellationToken::reason) before every read, so a
/// cancellation lands between packets and never interrupts a read.
///
/// # Example
///
/// ```
/// use mediakit::{CancelReason, CancellationToken};
///
/// let token = CancellationToken::new();
/// let shared = token.clone();
/// assert!(!token.is_cancelled());
///
/// shared.cancel();
/// assert_eq!(token.reason(), Some(CancelReason::Cancelled));
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// A token that only cancels on request.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A token that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// A token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Cancel this token and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the token is cancelled, or `None` if it is not.
    ///
    /// An explicit [`cancel`](CancellationToken::cancel) takes precedence
    /// over an expired deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.cancelled.load(Ordering::Acquire) {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Shorthand for `reason().is_some()`.
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts items and forwards batched reports to a callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    started: Instant,
    pending: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            started: Instant::now(),
            pending: 0,
        }
    }

    /// Count one item; report when a batch is complete.
    pub(crate) fn advance(&mut self, timestamp: Option<Duration>) {
        self.current += 1;
        self.pending += 1;
        if self.pending == self.batch_size {
            self.pending = 0;
            self.report(timestamp);
        }
    }

    /// Report the final count.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    fn report(&self, timestamp: Option<Duration>) {
        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage: match self.total {
                Some(total) if total > 0 => Some(self.current as f32 * 100.0 / total as f32),
                _ => None,
            },
            elapsed: self.started.elapsed(),
            current_timestamp: timestamp,
        });
    }
}
