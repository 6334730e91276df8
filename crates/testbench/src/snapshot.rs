use metalcall_config::{ExpectedExit, TestAssertion, TestScript};
use metalcall_sys::ExitStatus;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitReport {
    Pass,
    /// What the finisher decoded: the exit code under HTIF, the raw low
    /// half-word (`0x3333 | code`) under the simple style.
    Fail { value: u32 },
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Pass => Self::Pass,
            ExitStatus::Fail(value) => Self::Fail { value },
        }
    }
}

/// What the host observed over one run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub board: String,
    pub uart_output: String,
    pub tx_overruns: u64,
    pub finisher_writes: Vec<u32>,
    pub exit: Option<ExitReport>,
    pub parked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionFailure {
    #[error("UART output does not contain {expected:?}")]
    UartMissing { expected: String },
    #[error("UART output {actual:?} differs from {expected:?}")]
    UartMismatch { expected: String, actual: String },
    #[error("Expected exit {expected:?}, observed {actual:?}")]
    Exit {
        expected: ExpectedExit,
        actual: Option<ExitReport>,
    },
    #[error("Expected finisher value {expected:#x}, observed {actual:x?}")]
    FinisherValue { expected: u32, actual: Vec<u32> },
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn check_one(&self, assertion: &TestAssertion) -> Option<AssertionFailure> {
        match assertion {
            TestAssertion::UartContains(a) => (!self.uart_output.contains(&a.uart_contains))
                .then(|| AssertionFailure::UartMissing {
                    expected: a.uart_contains.clone(),
                }),
            TestAssertion::UartEquals(a) => {
                (self.uart_output != a.uart_equals).then(|| AssertionFailure::UartMismatch {
                    expected: a.uart_equals.clone(),
                    actual: self.uart_output.clone(),
                })
            }
            TestAssertion::ExpectedExit(a) => {
                let ok = match (a.expected_exit, self.exit) {
                    (ExpectedExit::Pass, Some(ExitReport::Pass)) => true,
                    (ExpectedExit::Fail, Some(ExitReport::Fail { .. })) => true,
                    (ExpectedExit::Silent, None) => true,
                    _ => false,
                };
                (!ok).then(|| AssertionFailure::Exit {
                    expected: a.expected_exit,
                    actual: self.exit,
                })
            }
            TestAssertion::FinisherValue(a) => (self.finisher_writes.last()
                != Some(&a.finisher_value))
            .then(|| AssertionFailure::FinisherValue {
                expected: a.finisher_value,
                actual: self.finisher_writes.clone(),
            }),
        }
    }

    /// Every assertion of `script` that this run violates.
    pub fn check(&self, script: &TestScript) -> Vec<AssertionFailure> {
        script
            .assertions
            .iter()
            .filter_map(|a| self.check_one(a))
            .collect()
    }
}
