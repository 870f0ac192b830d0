//! Output link status and remote wakeup requests

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

/// State of the output channel as reported by the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelStatus {
    /// Configured by the host and able to carry reports
    Active,

    /// Bus suspended by the host
    Suspended,

    /// Anything else: not enumerated, reset, disabled
    Other,
}

/// Read access to the output link, used by the producer at write time
pub trait LinkStatus {
    /// Current channel status
    fn status(&self) -> ChannelStatus;

    /// Whether the host permits a remote wake
    ///
    /// Links that have no notion of host permission keep the default.
    fn remote_wakeup_allowed(&self) -> bool {
        true
    }

    /// Ask the output subsystem to wake the bus
    ///
    /// Must not block. Only meaningful while [`ChannelStatus::Suspended`].
    fn request_wake(&self) {}
}

/// Shared link state, written by the bus event handler and read by the producer
///
/// Starts as [`ChannelStatus::Other`] until the host configures the device.
pub struct UsbLinkState<M: RawMutex> {
    status: Mutex<M, Cell<ChannelStatus>>,
    remote_wakeup: Mutex<M, Cell<bool>>,
    wake: Signal<M, ()>,
}

impl<M: RawMutex> UsbLinkState<M> {
    pub const fn new() -> Self {
        Self {
            status: Mutex::new(Cell::new(ChannelStatus::Other)),
            remote_wakeup: Mutex::new(Cell::new(false)),
            wake: Signal::new(),
        }
    }

    pub fn set_status(&self, status: ChannelStatus) {
        self.status.lock(|s| s.set(status));
    }

    /// Record whether the host enabled remote wakeup for this device
    pub fn set_remote_wakeup_enabled(&self, enabled: bool) {
        self.remote_wakeup.lock(|r| r.set(enabled));
    }

    /// Wait for the next wake request
    pub async fn wait_wake_request(&self) {
        self.wake.wait().await
    }

    /// Drop a pending wake request
    pub fn clear_wake_request(&self) {
        self.wake.reset();
    }

    /// Whether a wake request is pending and not yet consumed
    pub fn wake_requested(&self) -> bool {
        self.wake.signaled()
    }
}

impl<M: RawMutex> Default for UsbLinkState<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> LinkStatus for UsbLinkState<M> {
    fn status(&self) -> ChannelStatus {
        self.status.lock(|s| s.get())
    }

    fn remote_wakeup_allowed(&self) -> bool {
        self.remote_wakeup.lock(|r| r.get())
    }

    fn request_wake(&self) {
        self.wake.signal(());
    }
}

impl<T: LinkStatus + ?Sized> LinkStatus for &T {
    fn status(&self) -> ChannelStatus {
        T::status(self)
    }

    fn remote_wakeup_allowed(&self) -> bool {
        T::remote_wakeup_allowed(self)
    }

    fn request_wake(&self) {
        T::request_wake(self)
    }
}
