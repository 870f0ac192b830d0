//! Mock output channel for testing
//!
//! [`RecordingChannel`] stands in for the USB endpoint: it records every
//! accepted report and plays the hardware's completion notification by
//! releasing the gate, either right away or from a helper thread after a
//! delay. A completion can carry a fault, which the channel then hands back
//! through [`ReportChannel::take_fault`].

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::bridge::Bridge;
use crate::dispatch::{EmissionError, ReportChannel};
use crate::frame::Frame;
use crate::gate::Gate;

/// Anything that gives access to the gate a completion releases
pub trait GateOwner: Send + Sync + 'static {
    fn completion_gate(&self) -> &Gate<CriticalSectionRawMutex>;
}

impl GateOwner for Gate<CriticalSectionRawMutex> {
    fn completion_gate(&self) -> &Gate<CriticalSectionRawMutex> {
        self
    }
}

impl<const N: usize> GateOwner for Bridge<CriticalSectionRawMutex, N> {
    fn completion_gate(&self) -> &Gate<CriticalSectionRawMutex> {
        self.gate()
    }
}

/// How a submitted report completes
pub enum Completion {
    /// The test releases the gate itself
    Manual,

    /// Release the gate before `submit` returns
    Immediate(Arc<dyn GateOwner>),

    /// Release the gate from another thread after the given delay
    Delayed(Arc<dyn GateOwner>, Duration),
}

pub struct RecordingChannel {
    completion: Completion,

    /// Accepted reports, in submission order
    submissions: Vec<Frame>,

    /// Submissions made while the gate was not held
    unguarded: usize,

    /// Total `submit` calls, accepted or not
    calls: usize,

    /// Reject the call with this index
    fail_at: Option<(usize, EmissionError)>,

    /// Accept the call with this index, then fail it on completion
    fault_at: Option<(usize, EmissionError)>,

    /// Fault recorded by the last completion, set before the gate is released
    fault: Arc<Mutex<Option<EmissionError>>>,
}

impl RecordingChannel {
    pub fn new(completion: Completion) -> Self {
        Self {
            completion,
            submissions: Vec::new(),
            unguarded: 0,
            calls: 0,
            fail_at: None,
            fault_at: None,
            fault: Arc::new(Mutex::new(None)),
        }
    }

    pub fn manual() -> Self {
        Self::new(Completion::Manual)
    }

    /// Reject the `index`th submit call (0-based) with `error`
    pub fn fail_at(&mut self, index: usize, error: EmissionError) {
        self.fail_at = Some((index, error));
    }

    /// Accept the `index`th submit call, then complete it with `error`
    pub fn fault_at(&mut self, index: usize, error: EmissionError) {
        self.fault_at = Some((index, error));
    }

    pub fn submissions(&self) -> Vec<Frame> {
        self.submissions.clone()
    }

    pub fn unguarded_submissions(&self) -> usize {
        self.unguarded
    }
}

impl ReportChannel for RecordingChannel {
    fn submit(&mut self, report: &Frame) -> Result<(), EmissionError> {
        let call = self.calls;
        self.calls += 1;

        if let Some((index, error)) = self.fail_at {
            if index == call {
                return Err(error);
            }
        }

        self.submissions.push(*report);

        let fault = match self.fault_at {
            Some((index, error)) if index == call => Some(error),
            _ => None,
        };

        match &self.completion {
            Completion::Manual => {
                *self.fault.lock().unwrap() = fault;
            }
            Completion::Immediate(owner) => {
                let gate = owner.completion_gate();
                if gate.is_available() {
                    self.unguarded += 1;
                }
                *self.fault.lock().unwrap() = fault;
                gate.release();
            }
            Completion::Delayed(owner, delay) => {
                if owner.completion_gate().is_available() {
                    self.unguarded += 1;
                }
                let owner = owner.clone();
                let delay = *delay;
                let slot = self.fault.clone();
                thread::spawn(move || {
                    thread::sleep(delay);
                    *slot.lock().unwrap() = fault;
                    owner.completion_gate().release();
                });
            }
        }

        Ok(())
    }

    fn take_fault(&mut self) -> Option<EmissionError> {
        self.fault.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_submissions() {
        let mut channel = RecordingChannel::manual();
        channel.submit(&Frame::from_keycode(0x04)).unwrap();
        channel.submit(&Frame::RELEASE).unwrap();

        assert_eq!(channel.submissions(), vec![Frame::from_keycode(0x04), Frame::RELEASE]);
    }

    #[test]
    fn test_fail_at() {
        let mut channel = RecordingChannel::manual();
        channel.fail_at(1, EmissionError::Rejected);

        assert!(channel.submit(&Frame::from_keycode(0x04)).is_ok());
        assert_eq!(channel.submit(&Frame::RELEASE), Err(EmissionError::Rejected));
        assert_eq!(channel.submissions().len(), 1);
    }

    #[test]
    fn test_fault_at() {
        let mut channel = RecordingChannel::manual();
        channel.fault_at(0, EmissionError::EndpointDisabled);

        assert!(channel.submit(&Frame::from_keycode(0x04)).is_ok());
        assert_eq!(channel.take_fault(), Some(EmissionError::EndpointDisabled));
        assert_eq!(channel.take_fault(), None);
        assert_eq!(channel.submissions().len(), 1);
    }

    #[test]
    fn test_immediate_completion_releases_gate() {
        let gate: Arc<Gate<CriticalSectionRawMutex>> = Arc::new(Gate::new());
        let mut channel = RecordingChannel::new(Completion::Immediate(gate.clone()));

        assert!(gate.try_acquire());
        channel.submit(&Frame::from_keycode(0x04)).unwrap();
        assert!(gate.is_available());
        assert_eq!(channel.unguarded_submissions(), 0);
    }

    #[test]
    fn test_unguarded_submission_counted() {
        let gate: Arc<Gate<CriticalSectionRawMutex>> = Arc::new(Gate::new());
        let mut channel = RecordingChannel::new(Completion::Immediate(gate.clone()));

        // Gate never acquired
        channel.submit(&Frame::from_keycode(0x04)).unwrap();
        assert_eq!(channel.unguarded_submissions(), 1);
    }
}
