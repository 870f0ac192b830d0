//! USB HID output channel built on embassy-usb
//!
//! The dispatch loop hands reports to [`UsbHidChannel`], which parks them in a
//! one-slot [`HidEndpoint`]. [`run_hid_writer`] owns the `HidWriter`, writes
//! each parked report to the interrupt IN endpoint and releases the gate when
//! the write completes. That release is the endpoint's "ready" notification.
//! A failed write is recorded first, so the dispatcher finds it through
//! [`ReportChannel::take_fault`] as soon as it holds the gate again.
//!
//! [`UsbLinkHandler`] tracks bus state for the producer, and
//! [`run_usb_device`] runs the device and services remote wakeup requests.
//!
//! # Example
//!
//! ```ignore
//! static BRIDGE: StaticCell<Bridge<CriticalSectionRawMutex>> = StaticCell::new();
//! static LINK: UsbLinkState<CriticalSectionRawMutex> = UsbLinkState::new();
//! static ENDPOINT: HidEndpoint<CriticalSectionRawMutex> = HidEndpoint::new();
//!
//! let identity = UsbIdentity::default();
//! let mut builder = Builder::new(driver, identity.usb_config(&BridgeConfig::default()), ...);
//! let mut hid_writer = HidWriter::<_, 8>::new(&mut builder, HID_STATE.init(State::new()), identity.hid_config());
//! builder.handler(HANDLER.init(UsbLinkHandler::new(&LINK)));
//! let mut usb = builder.build();
//!
//! let bridge = BRIDGE.init(Bridge::new());
//! let mut dispatcher = bridge.dispatcher(UsbHidChannel::new(&ENDPOINT));
//!
//! join3(
//!     run_usb_device(&mut usb, &LINK),
//!     run_hid_writer(&mut hid_writer, &ENDPOINT, bridge.gate()),
//!     dispatcher.run(),
//! )
//! .await;
//! ```

use core::cell::Cell;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::HidWriter;
use embassy_usb::driver::{Driver, EndpointError};
use embassy_usb::{Handler, UsbDevice};

use crate::dispatch::{EmissionError, ReportChannel};
use crate::frame::Frame;
use crate::gate::Gate;
use crate::status::{ChannelStatus, UsbLinkState};

/// One-slot mailbox between [`UsbHidChannel`] and [`run_hid_writer`]
pub struct HidEndpoint<M: RawMutex> {
    pending: Signal<M, Frame>,
    fault: Mutex<M, Cell<bool>>,
}

impl<M: RawMutex> HidEndpoint<M> {
    pub const fn new() -> Self {
        Self {
            pending: Signal::new(),
            fault: Mutex::new(Cell::new(false)),
        }
    }

    /// Whether a report is waiting for the writer
    pub fn is_pending(&self) -> bool {
        self.pending.signaled()
    }

    /// Wait for the next report parked by the channel
    pub async fn next_report(&self) -> Frame {
        self.pending.wait().await
    }

    /// Finish the write of the last taken report and release `gate`
    ///
    /// A failure is recorded before the release, so the dispatcher sees it
    /// once it holds the gate again.
    pub fn complete(&self, result: Result<(), EndpointError>, gate: &Gate<M>) {
        match result {
            Ok(()) => trace!("Keyboard report sent"),
            Err(e) => {
                warn!("Failed to send keyboard report: {:?}", e);
                self.fault.lock(|f| f.set(true));
            }
        }
        gate.release();
    }

    fn take_fault(&self) -> bool {
        self.fault.lock(|f| f.replace(false))
    }
}

impl<M: RawMutex> Default for HidEndpoint<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// [`ReportChannel`] backed by a USB HID interrupt IN endpoint
pub struct UsbHidChannel<'a, M: RawMutex> {
    endpoint: &'a HidEndpoint<M>,
}

impl<'a, M: RawMutex> UsbHidChannel<'a, M> {
    pub fn new(endpoint: &'a HidEndpoint<M>) -> Self {
        Self { endpoint }
    }
}

impl<M: RawMutex> ReportChannel for UsbHidChannel<'_, M> {
    fn submit(&mut self, report: &Frame) -> Result<(), EmissionError> {
        if self.endpoint.is_pending() {
            return Err(EmissionError::Busy);
        }
        self.endpoint.pending.signal(*report);
        Ok(())
    }

    fn take_fault(&mut self) -> Option<EmissionError> {
        self.endpoint.take_fault().then_some(EmissionError::EndpointDisabled)
    }
}

/// Write parked reports to the HID endpoint, releasing `gate` after each one
///
/// A failed write is recorded for the channel and the gate is released
/// anyway, so the dispatch loop reports the failure instead of waiting forever.
pub async fn run_hid_writer<'d, D: Driver<'d>, M: RawMutex, const N: usize>(
    writer: &mut HidWriter<'d, D, N>,
    endpoint: &HidEndpoint<M>,
    gate: &Gate<M>,
) {
    writer.ready().await;
    info!("HID endpoint ready");

    loop {
        let report = endpoint.next_report().await;
        trace!("Sending keyboard report {:?}", report);
        let result = writer.write(report.as_bytes()).await;
        let disabled = matches!(result, Err(EndpointError::Disabled));
        endpoint.complete(result, gate);
        if disabled {
            writer.ready().await;
        }
    }
}

/// Feeds USB bus events into a [`UsbLinkState`]
pub struct UsbLinkHandler<'a, M: RawMutex> {
    link: &'a UsbLinkState<M>,
    configured: bool,
}

impl<'a, M: RawMutex> UsbLinkHandler<'a, M> {
    pub fn new(link: &'a UsbLinkState<M>) -> Self {
        Self {
            link,
            configured: false,
        }
    }
}

impl<M: RawMutex> Handler for UsbLinkHandler<'_, M> {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            self.configured = false;
            self.link.set_status(ChannelStatus::Other);
            info!("USB disabled");
        }
    }

    fn reset(&mut self) {
        self.configured = false;
        self.link.set_status(ChannelStatus::Other);
        self.link.set_remote_wakeup_enabled(false);
        info!("USB reset");
    }

    fn configured(&mut self, configured: bool) {
        self.configured = configured;
        if configured {
            self.link.set_status(ChannelStatus::Active);
            info!("USB configured");
        } else {
            self.link.set_status(ChannelStatus::Other);
            info!("USB deconfigured");
        }
    }

    fn suspended(&mut self, suspended: bool) {
        if suspended {
            self.link.set_status(ChannelStatus::Suspended);
            info!("USB suspended");
        } else {
            let status = if self.configured {
                ChannelStatus::Active
            } else {
                ChannelStatus::Other
            };
            self.link.set_status(status);
            info!("USB resumed");
        }
    }

    fn remote_wakeup_enabled(&mut self, enabled: bool) {
        self.link.set_remote_wakeup_enabled(enabled);
        debug!("USB remote wakeup enabled: {}", enabled);
    }
}

/// What ended a wait on a suspended bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SuspendExit {
    /// The host resumed the bus
    Resumed,

    /// The producer asked for a remote wakeup
    WakeRequested,
}

/// Wait until `resume` completes or a wake is requested, whichever is first
///
/// A resume by the host drops any outstanding wake request.
pub async fn wait_suspend_exit<M: RawMutex>(resume: impl Future, link: &UsbLinkState<M>) -> SuspendExit {
    match select(resume, link.wait_wake_request()).await {
        Either::First(_) => {
            link.clear_wake_request();
            SuspendExit::Resumed
        }
        Either::Second(_) => SuspendExit::WakeRequested,
    }
}

/// Run the USB device, waking the host when the producer asks for it
pub async fn run_usb_device<'d, D: Driver<'d>, M: RawMutex>(usb: &mut UsbDevice<'d, D>, link: &UsbLinkState<M>) {
    loop {
        usb.run_until_suspend().await;
        if wait_suspend_exit(usb.wait_resume(), link).await == SuspendExit::WakeRequested {
            info!("Waking up host");
            if let Err(e) = usb.remote_wakeup().await {
                warn!("Remote wakeup failed: {:?}", e);
            }
        }
    }
}
