//! Owned bridge state: the frame queue and the availability gate

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::BridgeConfig;
use crate::dispatch::{Dispatcher, ReportChannel};
use crate::gate::Gate;
use crate::producer::FrameProducer;
use crate::queue::{FrameQueue, QUEUE_CAPACITY};
use crate::status::LinkStatus;

/// Shared state between the producer and the dispatch loop
///
/// Construct once, put it somewhere that outlives both sides (a `static` or a
/// `StaticCell`), then hand out a producer to the wireless write callback and
/// a dispatcher to the output task.
pub struct Bridge<M: RawMutex, const N: usize = QUEUE_CAPACITY> {
    queue: FrameQueue<M, N>,
    gate: Gate<M>,
}

impl<M: RawMutex, const N: usize> Bridge<M, N> {
    pub const fn new() -> Self {
        Self {
            queue: FrameQueue::new(),
            gate: Gate::new(),
        }
    }

    pub fn producer<L: LinkStatus>(&self, link: L, config: BridgeConfig) -> FrameProducer<'_, M, L, N> {
        FrameProducer::new(&self.queue, link, config)
    }

    pub fn dispatcher<C: ReportChannel>(&self, channel: C) -> Dispatcher<'_, M, C, N> {
        Dispatcher::new(&self.queue, &self.gate, channel)
    }

    pub fn queue(&self) -> &FrameQueue<M, N> {
        &self.queue
    }

    /// The gate, released by the output channel's completion notification
    pub fn gate(&self) -> &Gate<M> {
        &self.gate
    }
}

impl<M: RawMutex, const N: usize> Default for Bridge<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
