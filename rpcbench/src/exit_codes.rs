#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more request kinds were rejected before starting, or their pool died.
    KindsFailed = 10,

    /// Invalid CLI/config/options (bad flags, invalid durations, unreadable account file, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, unexpected invariants, failed seeding).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_report(report: &rpcbench_core::RunReport) -> Self {
        if report.has_failures() {
            Self::KindsFailed
        } else {
            Self::Success
        }
    }
}
