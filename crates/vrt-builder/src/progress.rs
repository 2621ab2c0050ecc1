//! Cooperative progress reporting for the source-processing loop.

use crate::error::{Result, VrtBuildError};

/// Decision returned by a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    /// Keep building.
    Continue,
    /// Abort the build; no partial result is returned.
    Stop,
}

/// Caller-supplied progress callback: `(fraction_done, message)`.
///
/// The fraction is monotonically non-decreasing in `[0, 1]` and reaches
/// exactly 1.0 before a successful build returns. Any caller state lives
/// in the closure's captures; the lifetime parameter lets those captures
/// borrow from the caller's stack.
pub type ProgressFn<'a> = dyn Fn(f64, &str) -> ProgressSignal + 'a;

/// Drives the callback across a fixed number of work units.
pub(crate) struct ProgressReporter<'a> {
    callback: Option<&'a ProgressFn<'a>>,
    total: usize,
    completed: usize,
    last_fraction: f64,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: Option<&'a ProgressFn<'a>>, total: usize) -> Self {
        Self {
            callback,
            total,
            completed: 0,
            last_fraction: 0.0,
        }
    }

    /// Report one completed unit of work.
    pub fn step(&mut self, message: &str) -> Result<()> {
        self.completed += 1;
        let fraction = if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        };
        self.report(fraction, message)
    }

    /// Report completion; a no-op if the last step already reached 1.0.
    pub fn finish(&mut self) -> Result<()> {
        if self.last_fraction < 1.0 {
            self.report(1.0, "done")
        } else {
            Ok(())
        }
    }

    fn report(&mut self, fraction: f64, message: &str) -> Result<()> {
        // Never report backwards.
        let fraction = fraction.max(self.last_fraction);
        self.last_fraction = fraction;

        if let Some(callback) = self.callback {
            if callback(fraction, message) == ProgressSignal::Stop {
                return Err(VrtBuildError::Cancelled);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_progress_reaches_one() {
        let fractions = RefCell::new(Vec::new());
        let callback = |fraction: f64, _message: &str| {
            fractions.borrow_mut().push(fraction);
            ProgressSignal::Continue
        };

        let mut reporter = ProgressReporter::new(Some(&callback), 3);
        for _ in 0..3 {
            reporter.step("source").unwrap();
        }
        reporter.finish().unwrap();

        let fractions = fractions.borrow();
        assert_eq!(*fractions.last().unwrap(), 1.0);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.len(), 3);
    }

    #[test]
    fn test_finish_reports_when_no_steps() {
        let fractions = RefCell::new(Vec::new());
        let callback = |fraction: f64, _message: &str| {
            fractions.borrow_mut().push(fraction);
            ProgressSignal::Continue
        };

        let mut reporter = ProgressReporter::new(Some(&callback), 0);
        reporter.finish().unwrap();
        assert_eq!(*fractions.borrow(), vec![1.0]);
    }

    #[test]
    fn test_stop_cancels() {
        let callback = |_fraction: f64, _message: &str| ProgressSignal::Stop;

        let mut reporter = ProgressReporter::new(Some(&callback), 2);
        assert!(matches!(
            reporter.step("source"),
            Err(VrtBuildError::Cancelled)
        ));
    }

    #[test]
    fn test_no_callback_is_silent() {
        let mut reporter = ProgressReporter::new(None, 1);
        reporter.step("source").unwrap();
        reporter.finish().unwrap();
    }
}
