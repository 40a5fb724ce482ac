//! Query debouncing
//!
//! [`Debouncer`] is a clock-agnostic state machine: callers feed it changes
//! with the current instant and ask it when the next deadline is. At most one
//! trailing emission is pending at a time. [`spawn_debounced`] drives one on
//! the tokio timer for a stream of values.

use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);
pub const SEARCH_DELAY: Duration = Duration::from_millis(300);

/// Edge and timing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Quiet period before a trailing emission
    pub delay: Duration,
    /// Emit right away when nothing was emitted during the last `delay`
    pub leading: bool,
    /// Emit once changes have settled for `delay`
    pub trailing: bool,
    /// Emit the very first change without waiting
    pub immediate: bool,
    /// Upper bound on how long a burst of changes can hold back an emission
    pub max_wait: Option<Duration>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            leading: false,
            trailing: true,
            immediate: false,
            max_wait: None,
        }
    }
}

impl DebounceOptions {
    /// Trailing-only, tuned for search boxes
    pub fn search() -> Self {
        Self {
            delay: SEARCH_DELAY,
            ..Self::default()
        }
    }

    /// First value passes through, later ones on both edges
    pub fn immediate(delay: Duration) -> Self {
        Self {
            delay,
            leading: true,
            trailing: true,
            immediate: true,
            max_wait: None,
        }
    }

    pub fn leading_only(delay: Duration) -> Self {
        Self {
            delay,
            leading: true,
            trailing: false,
            immediate: false,
            max_wait: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Why a value was let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitReason {
    Immediate,
    Leading,
    MaxWait,
    Trailing,
}

impl EmitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmitReason::Immediate => "immediate",
            EmitReason::Leading => "leading",
            EmitReason::MaxWait => "maxWait",
            EmitReason::Trailing => "trailing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission<T> {
    pub value: T,
    pub reason: EmitReason,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
    reason: EmitReason,
}

type EqualityFn<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

pub struct Debouncer<T> {
    options: DebounceOptions,
    equality: EqualityFn<T>,
    pending: Option<Pending<T>>,
    last_emitted: Option<T>,
    last_emit_at: Option<Instant>,
    /// Start of the current burst while nothing has been emitted yet
    first_change_at: Option<Instant>,
}

impl<T: fmt::Debug> fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("options", &self.options)
            .field("pending", &self.pending)
            .field("last_emitted", &self.last_emitted)
            .finish_non_exhaustive()
    }
}

impl<T: PartialEq + 'static> Debouncer<T> {
    pub fn new(options: DebounceOptions) -> Self {
        Self::with_equality(options, |a: &T, b: &T| a == b)
    }
}

impl<T> Debouncer<T> {
    /// Use `equality` instead of `==` to detect changes that need no emission
    pub fn with_equality<F>(options: DebounceOptions, equality: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            options,
            equality: Box::new(equality),
            pending: None,
            last_emitted: None,
            last_emit_at: None,
            first_change_at: None,
        }
    }

    pub fn options(&self) -> &DebounceOptions {
        &self.options
    }

    /// When the pending emission fires, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn last_emitted(&self) -> Option<&T> {
        self.last_emitted.as_ref()
    }

    /// Drop the pending emission, if any
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

impl<T: Clone> Debouncer<T> {
    /// Record a new value observed at `now`.
    ///
    /// Returns an emission when one of the immediate, leading or max-wait
    /// rules lets the value through right away. Otherwise the value replaces
    /// any pending one and waits for [`Debouncer::poll`].
    ///
    /// A value equal to the last emission is not queued: it drops any pending
    /// emission, so the timer started by an earlier change never fires.
    pub fn on_change(&mut self, value: T, now: Instant) -> Option<Emission<T>> {
        let first_change = self.first_change_at.is_none() && self.last_emit_at.is_none();

        if let Some(last) = &self.last_emitted {
            if (self.equality)(&value, last) {
                if self.cancel() {
                    trace!("Value reverted to last emission, pending emission dropped");
                }
                return None;
            }
        }
        self.cancel();

        if first_change {
            self.first_change_at = Some(now);
            if self.options.immediate {
                return Some(self.emit(value, EmitReason::Immediate, now));
            }
        }

        let since_emit = self.last_emit_at.map(|at| now.duration_since(at));
        if self.options.leading && since_emit.map_or(true, |d| d >= self.options.delay) {
            return Some(self.emit(value, EmitReason::Leading, now));
        }

        let anchor = self.last_emit_at.or(self.first_change_at).unwrap_or(now);
        if let Some(max_wait) = self.options.max_wait {
            if now.duration_since(anchor) >= max_wait {
                return Some(self.emit(value, EmitReason::MaxWait, now));
            }
        }

        if self.options.trailing {
            let mut deadline = now + self.options.delay;
            let mut reason = EmitReason::Trailing;
            if let Some(max_wait) = self.options.max_wait {
                let forced = anchor + max_wait;
                if forced < deadline {
                    deadline = forced;
                    reason = EmitReason::MaxWait;
                }
            }
            self.pending = Some(Pending {
                value,
                deadline,
                reason,
            });
        }
        None
    }

    /// Fire the pending emission if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<Emission<T>> {
        match &self.pending {
            Some(p) if p.deadline <= now => {}
            _ => return None,
        }
        let pending = self.pending.take()?;
        Some(self.emit(pending.value, pending.reason, now))
    }

    /// Fire the pending emission regardless of its deadline
    pub fn flush(&mut self, now: Instant) -> Option<Emission<T>> {
        let pending = self.pending.take()?;
        Some(self.emit(pending.value, EmitReason::Trailing, now))
    }

    fn emit(&mut self, value: T, reason: EmitReason, now: Instant) -> Emission<T> {
        self.last_emitted = Some(value.clone());
        self.last_emit_at = Some(now);
        self.first_change_at = None;
        Emission { value, reason }
    }
}

/// Debounce every value received on `input`.
///
/// The task ends when `input` closes (flushing a pending value first) or when
/// the returned receiver is dropped.
pub fn spawn_debounced<T>(
    mut input: mpsc::Receiver<T>,
    mut debouncer: Debouncer<T>,
) -> mpsc::Receiver<Emission<T>>
where
    T: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        loop {
            let emission = match debouncer.deadline() {
                Some(deadline) => tokio::select! {
                    changed = input.recv() => match changed {
                        Some(value) => debouncer.on_change(value, Instant::now()),
                        None => break,
                    },
                    _ = time::sleep_until(deadline) => debouncer.poll(Instant::now()),
                },
                None => match input.recv().await {
                    Some(value) => debouncer.on_change(value, Instant::now()),
                    None => break,
                },
            };

            if let Some(emission) = emission {
                trace!("Debounced emission ({})", emission.reason.as_str());
                if tx.send(emission).await.is_err() {
                    debug!("Debounce consumer dropped, stopping");
                    return;
                }
            }
        }

        if let Some(emission) = debouncer.flush(Instant::now()) {
            let _ = tx.send(emission).await;
        }
        debug!("Debounce input closed");
    });
    rx
}

/// Channel pair around [`spawn_debounced`]: push raw values into the sender,
/// read settled ones from the receiver
pub fn debounce_channel<T>(
    options: DebounceOptions,
) -> (mpsc::Sender<T>, mpsc::Receiver<Emission<T>>)
where
    T: Clone + PartialEq + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    (tx, spawn_debounced(rx, Debouncer::new(options)))
}
