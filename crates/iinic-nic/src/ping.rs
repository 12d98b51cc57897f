use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use iinic_transport::{ByteChannel, Deadline};

use crate::error::Result;
use crate::session::Nic;

pub(crate) type PingCallback = Box<dyn FnOnce() + Send>;

/// Handle to an outstanding ping.
///
/// The acknowledgement flag is only ever set by the session's receive path.
#[derive(Clone)]
pub struct PingHandle {
    seq: u8,
    acked: Arc<AtomicBool>,
}

impl PingHandle {
    pub fn seq(&self) -> u8 {
        self.seq
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }

    /// Drive the receive path until this ping is acknowledged or no more data
    /// arrives before `deadline`. Returns whether it was acknowledged.
    pub fn wait<C: ByteChannel>(&self, nic: &mut Nic<C>, deadline: Deadline) -> Result<bool> {
        while !self.is_acked() && nic.pump(deadline)?.is_some() {}
        Ok(self.is_acked())
    }

    pub(crate) fn same_slot(&self, other: &Arc<AtomicBool>) -> bool {
        Arc::ptr_eq(&self.acked, other)
    }
}

impl fmt::Debug for PingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PingHandle")
            .field("seq", &self.seq)
            .field("acked", &self.is_acked())
            .finish()
    }
}

/// Session-side record of a ping waiting for its echo.
pub(crate) struct PendingPing {
    pub(crate) acked: Arc<AtomicBool>,
    /// Transmit buffer bytes freed once the device echoes this ping.
    pub(crate) release: usize,
    pub(crate) callbacks: Vec<PingCallback>,
}

impl PendingPing {
    pub(crate) fn new(seq: u8, release: usize) -> (Self, PingHandle) {
        let acked = Arc::new(AtomicBool::new(false));
        let handle = PingHandle {
            seq,
            acked: Arc::clone(&acked),
        };
        let pending = Self {
            acked,
            release,
            callbacks: Vec::new(),
        };
        (pending, handle)
    }

    /// Mark acknowledged and run callbacks in registration order.
    /// Returns the number of transmit buffer bytes to release.
    pub(crate) fn complete(self) -> usize {
        self.acked.store(true, Ordering::Release);
        for callback in self.callbacks {
            callback();
        }
        self.release
    }
}

impl fmt::Debug for PendingPing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPing")
            .field("acked", &self.acked.load(Ordering::Acquire))
            .field("release", &self.release)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn complete_sets_flag_and_runs_callbacks_in_order() {
        let (mut pending, handle) = PendingPing::new(7, 100);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            pending
                .callbacks
                .push(Box::new(move || order.lock().unwrap().push(i)));
        }

        assert!(!handle.is_acked());
        assert_eq!(pending.complete(), 100);
        assert!(handle.is_acked());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn cloned_handles_share_the_slot() {
        let (pending, handle) = PendingPing::new(1, 0);
        let clone = handle.clone();
        assert!(clone.same_slot(&pending.acked));
        pending.complete();
        assert!(clone.is_acked());
        assert_eq!(clone.seq(), 1);
    }
}
