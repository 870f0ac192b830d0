//! Dispatch loop: turns each queued frame into a press/release report pair
//!
//! The loop is the only consumer of the frame queue and the only acquirer of
//! the availability gate. Every cycle goes through these states:
//!
//! ```text
//! WaitFrame -> WaitGatePress -> EmitPress -> WaitGateRelease -> EmitRelease -> WaitFrame
//! ```
//!
//! The gate is acquired twice per cycle: once so the press goes out on an
//! idle endpoint, once so the release waits for the press to complete. At
//! most one report is ever in flight.
//!
//! A report can also fail after `submit` accepted it. The channel hands that
//! fault back through [`ReportChannel::take_fault`] once the completion has
//! released the gate, and the dispatcher reports it against the report that
//! failed. A failed release is checked before the next frame is taken from the
//! queue. If it only shows up after the next frame was dequeued, that frame is
//! kept and sent by the following cycle.

use core::convert::Infallible;
use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::frame::Frame;
use crate::gate::Gate;
use crate::queue::FrameQueue;

/// Errors reported by an output channel on submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmissionError {
    /// The channel refused the report
    Rejected,

    /// A previous report is still pending on the channel
    Busy,

    /// The endpoint is disabled or failed a previous write
    EndpointDisabled,
}

impl fmt::Display for EmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "Report rejected"),
            Self::Busy => write!(f, "Channel busy"),
            Self::EndpointDisabled => write!(f, "Endpoint disabled"),
        }
    }
}

impl core::error::Error for EmissionError {}

/// Which half of the press/release pair was being emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Press,
    Release,
}

/// Fatal dispatch loop error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// The output channel failed a submission
    EmissionFailure { phase: Phase, cause: EmissionError },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmissionFailure { phase, cause } => {
                write!(f, "Emission of {:?} report failed: {}", phase, cause)
            }
        }
    }
}

impl core::error::Error for DispatchError {}

/// Output channel that accepts one report at a time
///
/// `submit` starts an asynchronous write and returns immediately. The
/// channel reports completion by releasing the [`Gate`] the dispatcher was
/// created with.
pub trait ReportChannel {
    /// Start sending one report
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Report accepted, completion releases the gate
    /// * `Err(EmissionError)` - Report not sent, no completion will follow
    fn submit(&mut self, report: &Frame) -> Result<(), EmissionError>;

    /// Failure of the last accepted report, consumed on read
    ///
    /// Must be visible before the completion releases the gate.
    fn take_fault(&mut self) -> Option<EmissionError> {
        None
    }
}

impl<T: ReportChannel + ?Sized> ReportChannel for &mut T {
    fn submit(&mut self, report: &Frame) -> Result<(), EmissionError> {
        T::submit(self, report)
    }

    fn take_fault(&mut self) -> Option<EmissionError> {
        T::take_fault(self)
    }
}

/// Dispatch loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
    WaitFrame,
    WaitGatePress,
    EmitPress,
    WaitGateRelease,
    EmitRelease,
}

/// The consumer side of the bridge
pub struct Dispatcher<'a, M: RawMutex, C: ReportChannel, const N: usize> {
    queue: &'a FrameQueue<M, N>,
    gate: &'a Gate<M>,
    channel: C,
    state: DispatchState,
    cycles: u32,

    /// Frame dequeued by a cycle that stopped on the previous release's fault
    held: Option<Frame>,
}

impl<'a, M: RawMutex, C: ReportChannel, const N: usize> Dispatcher<'a, M, C, N> {
    pub fn new(queue: &'a FrameQueue<M, N>, gate: &'a Gate<M>, channel: C) -> Self {
        Self {
            queue,
            gate,
            channel,
            state: DispatchState::WaitFrame,
            cycles: 0,
            held: None,
        }
    }

    /// Run forever, only returns on an emission failure
    pub async fn run(&mut self) -> Result<Infallible, DispatchError> {
        info!("Dispatch loop started");
        loop {
            self.step().await?;
        }
    }

    /// Run one full press/release cycle
    ///
    /// Waits for a frame, then emits it followed by the release report.
    pub async fn step(&mut self) -> Result<(), DispatchError> {
        self.state = DispatchState::WaitFrame;
        self.check_fault(Phase::Release)?;
        let press = match self.held.take() {
            Some(frame) => frame,
            None => self.queue.dequeue().await,
        };

        self.state = DispatchState::WaitGatePress;
        self.gate.acquire().await;
        if let Err(e) = self.check_fault(Phase::Release) {
            self.held = Some(press);
            self.gate.release();
            return Err(e);
        }

        self.state = DispatchState::EmitPress;
        self.emit(&press, Phase::Press)?;
        debug!("Wrote press {:?}", press);

        // Blocks until the press above completes
        self.state = DispatchState::WaitGateRelease;
        self.gate.acquire().await;
        if let Err(e) = self.check_fault(Phase::Press) {
            self.gate.release();
            return Err(e);
        }

        self.state = DispatchState::EmitRelease;
        self.emit(&Frame::RELEASE, Phase::Release)?;
        debug!("Cleared");

        self.cycles = self.cycles.wrapping_add(1);
        self.state = DispatchState::WaitFrame;
        Ok(())
    }

    fn emit(&mut self, report: &Frame, phase: Phase) -> Result<(), DispatchError> {
        self.channel.submit(report).map_err(|cause| {
            error!("Failed to emit {:?} report: {:?}", phase, cause);
            // Nothing is in flight, so no completion will release the gate
            self.gate.release();
            self.state = DispatchState::WaitFrame;
            DispatchError::EmissionFailure { phase, cause }
        })
    }

    /// Surface a fault of the already completed `phase` report
    fn check_fault(&mut self, phase: Phase) -> Result<(), DispatchError> {
        match self.channel.take_fault() {
            Some(cause) => {
                error!("{:?} report failed after submission: {:?}", phase, cause);
                self.state = DispatchState::WaitFrame;
                Err(DispatchError::EmissionFailure { phase, cause })
            }
            None => Ok(()),
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Number of completed press/release cycles
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}
