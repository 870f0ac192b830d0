//! Availability gate for the output endpoint
//!
//! A binary semaphore that is either available or held. The dispatch loop
//! acquires it before every emission; the endpoint's completion notification
//! releases it. Releasing an available gate does nothing, so duplicate or
//! spurious completions can never let two reports be in flight.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::waitqueue::WakerRegistration;

struct GateState {
    available: bool,
    acquisitions: u32,
    waker: WakerRegistration,
}

pub struct Gate<M: RawMutex> {
    state: Mutex<M, RefCell<GateState>>,
}

impl<M: RawMutex> Gate<M> {
    /// Create a gate in the available state
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(GateState {
                available: true,
                acquisitions: 0,
                waker: WakerRegistration::new(),
            })),
        }
    }

    /// Wait until the gate is available, then take it
    pub async fn acquire(&self) {
        poll_fn(|cx| {
            self.state.lock(|s| {
                let mut s = s.borrow_mut();
                if s.available {
                    s.available = false;
                    s.acquisitions = s.acquisitions.wrapping_add(1);
                    Poll::Ready(())
                } else {
                    s.waker.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }

    /// Take the gate if it's available, without waiting
    pub fn try_acquire(&self) -> bool {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.available {
                s.available = false;
                s.acquisitions = s.acquisitions.wrapping_add(1);
                true
            } else {
                false
            }
        })
    }

    /// Mark the gate available and wake the waiter, if any
    ///
    /// Safe to call from any context, including the endpoint completion path.
    pub fn release(&self) {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if s.available {
                trace!("Gate: spurious release ignored");
                return;
            }
            s.available = true;
            s.waker.wake();
        })
    }

    pub fn is_available(&self) -> bool {
        self.state.lock(|s| s.borrow().available)
    }

    /// Number of successful acquisitions since creation
    pub fn acquisitions(&self) -> u32 {
        self.state.lock(|s| s.borrow().acquisitions)
    }
}

impl<M: RawMutex> Default for Gate<M> {
    fn default() -> Self {
        Self::new()
    }
}
