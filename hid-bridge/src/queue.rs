//! Bounded frame queue between the inbound producer and the dispatch loop

use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use crate::frame::Frame;

/// Default number of queued frames
pub const QUEUE_CAPACITY: usize = 8;

/// The queue is full, the frame was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueSaturated;

impl fmt::Display for QueueSaturated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame queue saturated")
    }
}

impl core::error::Error for QueueSaturated {}

/// Fixed-capacity FIFO of frames
///
/// One producer calls [`FrameQueue::try_enqueue`], which never blocks and is
/// safe from a callback context. One consumer awaits [`FrameQueue::dequeue`].
pub struct FrameQueue<M: RawMutex, const N: usize = QUEUE_CAPACITY> {
    channel: Channel<M, Frame, N>,
}

impl<M: RawMutex, const N: usize> FrameQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Store a frame without waiting
    pub fn try_enqueue(&self, frame: Frame) -> Result<(), QueueSaturated> {
        self.channel.try_send(frame).map_err(|_| QueueSaturated)
    }

    /// Wait until a frame is available and take it, oldest first
    pub async fn dequeue(&self) -> Frame {
        self.channel.receive().await
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<M: RawMutex, const N: usize> Default for FrameQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
