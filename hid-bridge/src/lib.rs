//! Bridge from wireless write events to a USB HID keyboard endpoint
//!
//! Each 8-byte frame written by a remote peer is validated, queued without
//! blocking the wireless stack, and replayed to the host as a key press
//! report followed by an all-zero release report. The output endpoint only
//! takes one report at a time, which an availability gate enforces.
//!
//! ```text
//! write callback -> FrameProducer -> FrameQueue -> Dispatcher -> ReportChannel
//!                                                      ^              |
//!                                                      +---- Gate <---+ completion
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod frame;
pub mod gate;
pub mod producer;
pub mod queue;
pub mod status;
#[cfg(feature = "usb")]
pub mod usb;

#[cfg(test)]
pub(crate) mod mock;

pub use bridge::Bridge;
pub use config::{BridgeConfig, KEYBOARD_REPORT_DESC, UART_RX_CHAR_UUID, UART_SERVICE_UUID, UsbIdentity};
pub use dispatch::{DispatchError, DispatchState, Dispatcher, EmissionError, Phase, ReportChannel};
pub use frame::{FRAME_SIZE, Frame, FrameLengthError};
pub use gate::Gate;
pub use producer::{FrameProducer, WriteError, WriteOutcome, write_status};
pub use queue::{FrameQueue, QUEUE_CAPACITY, QueueSaturated};
pub use status::{ChannelStatus, LinkStatus, UsbLinkState};
#[cfg(feature = "usb")]
pub use usb::{HidEndpoint, SuspendExit, UsbHidChannel, UsbLinkHandler, run_hid_writer, run_usb_device, wait_suspend_exit};

#[cfg(test)]
pub(crate) fn init_test_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}
