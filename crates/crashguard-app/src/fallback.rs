//! Fallback handler and process termination
//!
//! Used when the recovery surface does not appear in time.

use std::io::{self, Write};
use std::sync::Arc;

use crashguard_core::{FatalError, FatalErrorHandler, ProcessTerminator};

/// Exit status of a process that died from a panic
pub const PANIC_EXIT_CODE: i32 = 101;

/// How [`HardExit`] ends the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HardExit {
    /// SIGKILL the own pid, then exit if still alive
    #[default]
    Kill,
    /// `std::process::exit` with the requested code
    Exit,
}

impl ProcessTerminator for HardExit {
    fn terminate(&self, code: i32) {
        log::logger().flush();

        #[cfg(unix)]
        if *self == HardExit::Kill {
            // SAFETY: signalling our own pid has no memory-safety preconditions.
            unsafe {
                libc::kill(libc::getpid(), libc::SIGKILL);
            }
        }

        std::process::exit(code);
    }
}

/// Prints the standard panic report, then terminates
///
/// Stands in for the std panic hook, which cannot be replayed once the
/// panicking call has returned.
pub struct PanicReportHandler {
    terminator: Arc<dyn ProcessTerminator>,
    exit_code: i32,
}

impl PanicReportHandler {
    pub fn new(terminator: Arc<dyn ProcessTerminator>) -> Self {
        Self {
            terminator,
            exit_code: PANIC_EXIT_CODE,
        }
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }
}

impl Default for PanicReportHandler {
    fn default() -> Self {
        Self::new(Arc::new(HardExit::Exit))
    }
}

impl FatalErrorHandler for PanicReportHandler {
    fn handle_fatal(&self, error: &FatalError) {
        let report = render_report(error);
        log::error!("{}", report);
        let _ = writeln!(io::stderr(), "{}", report);
        self.terminator.terminate(self.exit_code);
    }
}

/// Render a fatal error the way the std panic hook does
pub fn render_report(error: &FatalError) -> String {
    let mut report = format!("thread '{}' panicked", error.thread().display_name());
    if let Some(location) = error.location() {
        report.push_str(" at ");
        report.push_str(location);
    }
    report.push_str(":\n");
    report.push_str(error.message().unwrap_or("Box<dyn Any>"));
    if let Some(backtrace) = error.backtrace() {
        report.push_str("\nstack backtrace:\n");
        report.push_str(backtrace);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashguard_core::ThreadContext;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTerminator {
        codes: Mutex<Vec<i32>>,
    }

    impl ProcessTerminator for RecordingTerminator {
        fn terminate(&self, code: i32) {
            self.codes.lock().push(code);
        }
    }

    #[test]
    fn test_render_report() {
        let thread = ThreadContext {
            name: Some("main".into()),
            id: std::thread::current().id(),
        };
        let error = FatalError::on_thread(Some("attempt to divide by zero".into()), thread)
            .with_location("src/main.rs:4:5");

        assert_eq!(
            render_report(&error),
            "thread 'main' panicked at src/main.rs:4:5:\nattempt to divide by zero"
        );
    }

    #[test]
    fn test_render_report_with_backtrace() {
        let error = FatalError::new("boom").with_backtrace("0: frame");
        let report = render_report(&error);
        assert!(report.ends_with(":\nboom\nstack backtrace:\n0: frame"));
    }

    #[test]
    fn test_handler_terminates_with_panic_code() {
        let terminator = Arc::new(RecordingTerminator::default());
        let handler = PanicReportHandler::new(terminator.clone());

        handler.handle_fatal(&FatalError::new("boom"));
        assert_eq!(*terminator.codes.lock(), vec![PANIC_EXIT_CODE]);

        let handler = PanicReportHandler::new(terminator.clone()).with_exit_code(7);
        handler.handle_fatal(&FatalError::new("boom"));
        assert_eq!(*terminator.codes.lock(), vec![PANIC_EXIT_CODE, 7]);
    }

    #[test]
    fn test_hard_exit_defaults_to_kill() {
        assert_eq!(HardExit::default(), HardExit::Kill);
    }
}
