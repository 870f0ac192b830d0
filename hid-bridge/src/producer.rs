//! Inbound write validation and enqueueing
//!
//! [`FrameProducer::on_write`] runs in the wireless stack's write callback.
//! It never blocks: a write is either rejected, dropped in favor of a wake
//! request, or stored in the frame queue.

use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::BridgeConfig;
use crate::frame::Frame;
use crate::queue::FrameQueue;
use crate::status::{ChannelStatus, LinkStatus};

/// POSIX "invalid argument"
pub const EINVAL: i32 = 22;

/// POSIX "out of memory"
pub const ENOMEM: i32 = 12;

/// ATT error: invalid offset
pub const ATT_INVALID_OFFSET: u8 = 0x07;

/// ATT error: invalid attribute value length
pub const ATT_INVALID_ATTRIBUTE_VALUE_LENGTH: u8 = 0x0D;

/// ATT error: insufficient resources
pub const ATT_INSUFFICIENT_RESOURCES: u8 = 0x11;

/// Errors returned to the wireless stack for a rejected write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    /// Offset is not zero or length is not [`FRAME_SIZE`](crate::frame::FRAME_SIZE)
    InvalidWriteShape { len: usize, offset: usize },

    /// The frame queue is full, the frame is lost
    QueueSaturated,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWriteShape { len, offset } => {
                write!(f, "Invalid write of length {} to offset {}", len, offset)
            }
            Self::QueueSaturated => write!(f, "Frame queue saturated"),
        }
    }
}

impl core::error::Error for WriteError {}

impl WriteError {
    /// Negative errno for C-style write callbacks
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidWriteShape { .. } => -EINVAL,
            Self::QueueSaturated => -ENOMEM,
        }
    }

    /// ATT protocol error code for GATT write responses
    pub fn att_error(&self) -> u8 {
        match self {
            Self::InvalidWriteShape { offset, .. } if *offset != 0 => ATT_INVALID_OFFSET,
            Self::InvalidWriteShape { .. } => ATT_INVALID_ATTRIBUTE_VALUE_LENGTH,
            Self::QueueSaturated => ATT_INSUFFICIENT_RESOURCES,
        }
    }
}

/// What happened to an accepted write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOutcome {
    /// Frame stored in the queue
    Queued,

    /// The bus was suspended: a wake was requested and the frame dropped
    WakeRequested,
}

/// Map a write result to the status code a C-style write callback returns
///
/// `len` when the frame was queued, 0 when it was dropped for a wake request,
/// and the negative errno otherwise.
pub fn write_status(result: Result<WriteOutcome, WriteError>, len: usize) -> isize {
    match result {
        Ok(WriteOutcome::Queued) => len as isize,
        Ok(WriteOutcome::WakeRequested) => 0,
        Err(e) => e.errno() as isize,
    }
}

/// Producer side of the bridge
pub struct FrameProducer<'a, M: RawMutex, L: LinkStatus, const N: usize> {
    queue: &'a FrameQueue<M, N>,
    link: L,
    config: BridgeConfig,
}

impl<'a, M: RawMutex, L: LinkStatus, const N: usize> FrameProducer<'a, M, L, N> {
    pub fn new(queue: &'a FrameQueue<M, N>, link: L, config: BridgeConfig) -> Self {
        Self { queue, link, config }
    }

    /// Handle one remote write of `data` at `offset`
    pub fn on_write(&self, data: &[u8], offset: usize) -> Result<WriteOutcome, WriteError> {
        let frame = match Frame::from_slice(data) {
            Ok(frame) if offset == 0 => frame,
            _ => {
                warn!("Got invalid write of length {} to offset {}", data.len(), offset);
                return Err(WriteError::InvalidWriteShape {
                    len: data.len(),
                    offset,
                });
            }
        };

        if self.config.remote_wakeup
            && self.link.status() == ChannelStatus::Suspended
            && self.link.remote_wakeup_allowed()
        {
            debug!("Output suspended, requesting wakeup and ignoring write");
            self.link.request_wake();
            return Ok(WriteOutcome::WakeRequested);
        }

        match self.queue.try_enqueue(frame) {
            Ok(()) => {
                debug!("Queued frame {:?}", frame);
                Ok(WriteOutcome::Queued)
            }
            Err(_) => {
                warn!("Failed to queue frame, queue saturated");
                Err(WriteError::QueueSaturated)
            }
        }
    }
}
