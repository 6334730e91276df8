use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Register window '{0}' at {1:#x} is not 4-byte aligned")]
    Misaligned(&'static str, u64),
    #[error("Register windows '{0}' and '{1}' overlap")]
    Overlap(&'static str, &'static str),
    #[error("RAM size must be greater than zero")]
    EmptyRam,
    #[error("Heap start {0:#x} lies outside RAM")]
    HeapOutsideRam(u64),
    #[error("UART FIFO depth must be greater than zero")]
    EmptyFifo,
    #[error("Register window '{0}' runs past the end of the address space")]
    WindowOutOfRange(&'static str),
}

/// Size of the SiFive UART register window (TXDATA..DIV).
pub const UART_WINDOW: u64 = 0x1C;
/// Size of the finisher register window.
pub const FINISHER_WINDOW: u64 = 0x4;

fn default_fifo_depth() -> usize {
    8
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartConfig {
    pub base: u64,
    #[serde(default = "default_fifo_depth")]
    pub tx_fifo_depth: usize,
    #[serde(default = "default_fifo_depth")]
    pub rx_fifo_depth: usize,
    /// TXDATA polls that report "full" before each accepted byte.
    #[serde(default)]
    pub tx_busy_polls: u32,
    /// Consecutive "full" polls after which the simulated transmitter counts
    /// as hung. Unset keeps the testbench default.
    #[serde(default)]
    pub tx_stall_limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinisherKind {
    /// `0x5555` pass / `0x3333 | code` fail.
    Simple,
    /// `(code << 1) | 1`.
    Htif,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FinisherConfig {
    pub base: u64,
    #[serde(default = "FinisherConfig::default_style")]
    pub style: FinisherKind,
}

impl FinisherConfig {
    fn default_style() -> FinisherKind {
        FinisherKind::Htif
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MemoryRange {
    pub base: u64,
    pub size: String, // e.g. "64KB"
}

/// Memory map of a board the syscall layer runs on.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BoardDescriptor {
    pub name: String,
    pub uart: UartConfig,
    #[serde(default)]
    pub finisher: Option<FinisherConfig>,
    pub ram: MemoryRange,
    /// Where `_end` would land; defaults to the RAM base.
    #[serde(default)]
    pub heap_start: Option<u64>,
}

impl Default for BoardDescriptor {
    /// The stock layout: UART at `0x1001_3000`, HTIF-style finisher at
    /// `0x0010_0000`, 64 KiB of RAM at `0x8000_0000`.
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            uart: UartConfig {
                base: 0x1001_3000,
                tx_fifo_depth: default_fifo_depth(),
                rx_fifo_depth: default_fifo_depth(),
                tx_busy_polls: 0,
                tx_stall_limit: None,
            },
            finisher: Some(FinisherConfig {
                base: 0x0010_0000,
                style: FinisherKind::Htif,
            }),
            ram: MemoryRange {
                base: 0x8000_0000,
                size: "64KiB".to_string(),
            },
            heap_start: None,
        }
    }
}

/// `[start, end)` of a window, or an error if `end` does not fit in `u64`.
fn window(name: &'static str, base: u64, size: u64) -> Result<(u64, u64), ConfigError> {
    base.checked_add(size)
        .map(|end| (base, end))
        .ok_or(ConfigError::WindowOutOfRange(name))
}

fn overlaps(a: (u64, u64), b: (u64, u64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

impl BoardDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board descriptor at {:?}", path.as_ref()))?;
        let board: Self =
            serde_yaml::from_reader(f).context("Failed to parse Board Descriptor")?;
        board.validate()?;
        Ok(board)
    }

    pub fn ram_size(&self) -> Result<u64> {
        parse_size(&self.ram.size)
    }

    pub fn heap_start(&self) -> u64 {
        self.heap_start.unwrap_or(self.ram.base)
    }

    pub fn validate(&self) -> Result<()> {
        if self.uart.base % 4 != 0 {
            return Err(ConfigError::Misaligned("uart", self.uart.base).into());
        }
        if self.uart.tx_fifo_depth == 0 || self.uart.rx_fifo_depth == 0 {
            return Err(ConfigError::EmptyFifo.into());
        }

        let ram_size = self.ram_size()?;
        if ram_size == 0 {
            return Err(ConfigError::EmptyRam.into());
        }

        let uart = window("uart", self.uart.base, UART_WINDOW)?;
        let ram = window("ram", self.ram.base, ram_size)?;
        if overlaps(uart, ram) {
            return Err(ConfigError::Overlap("uart", "ram").into());
        }

        if let Some(fin) = &self.finisher {
            if fin.base % 4 != 0 {
                return Err(ConfigError::Misaligned("finisher", fin.base).into());
            }
            let finisher = window("finisher", fin.base, FINISHER_WINDOW)?;
            if overlaps(uart, finisher) {
                return Err(ConfigError::Overlap("uart", "finisher").into());
            }
            if overlaps(finisher, ram) {
                return Err(ConfigError::Overlap("finisher", "ram").into());
            }
        }

        let heap = self.heap_start();
        if heap < ram.0 || heap > ram.1 {
            return Err(ConfigError::HeapOutsideRam(heap).into());
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    /// Board descriptor path, relative to the script. Defaults to the stock
    /// layout.
    #[serde(default)]
    pub board: Option<String>,
    /// Bytes queued in the UART receive FIFO before the run.
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedExit {
    Pass,
    Fail,
    /// No finisher write at all (board without a finisher).
    Silent,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartEqualsAssertion {
    pub uart_equals: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExitAssertion {
    pub expected_exit: ExpectedExit,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FinisherValueAssertion {
    pub finisher_value: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    UartContains(UartContainsAssertion),
    UartEquals(UartEqualsAssertion),
    ExpectedExit(ExitAssertion),
    FinisherValue(FinisherValueAssertion),
}

/// A scripted run: stdin to feed, and what the UART and finisher must show
/// afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    #[serde(default = "TestScript::default_inputs")]
    pub inputs: TestInputs,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    fn default_inputs() -> TestInputs {
        TestInputs {
            board: None,
            stdin: String::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open test script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if let Some(board) = &self.inputs.board {
            if board.trim().is_empty() {
                anyhow::bail!("Input 'board' path cannot be empty");
            }
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_board() {
        let yaml = r#"
name: "sifive-sim"
uart:
  base: 0x10013000
  tx_busy_polls: 2
finisher:
  base: 0x100000
  style: simple
ram:
  base: 0x80000000
  size: "128KiB"
heap_start: 0x80004000
"#;
        let board: BoardDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert!(board.validate().is_ok());
        assert_eq!(board.uart.base, 0x1001_3000);
        assert_eq!(board.uart.tx_fifo_depth, 8);
        assert_eq!(board.uart.tx_busy_polls, 2);
        assert_eq!(board.uart.tx_stall_limit, None);
        assert_eq!(board.finisher.as_ref().unwrap().style, FinisherKind::Simple);
        assert_eq!(board.ram_size().unwrap(), 128 * 1024);
        assert_eq!(board.heap_start(), 0x8000_4000);
    }

    #[test]
    fn test_default_board_is_valid() {
        let board = BoardDescriptor::default();
        assert!(board.validate().is_ok());
        assert_eq!(board.heap_start(), 0x8000_0000);
        assert_eq!(board.finisher.unwrap().style, FinisherKind::Htif);
    }

    #[test]
    fn test_finisher_style_defaults_to_htif() {
        let yaml = r#"
name: "b"
uart: { base: 0x10013000 }
finisher: { base: 0x100000 }
ram: { base: 0x80000000, size: "4KiB" }
"#;
        let board: BoardDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(board.finisher.unwrap().style, FinisherKind::Htif);
    }

    #[test]
    fn test_overlapping_windows() {
        let mut board = BoardDescriptor::default();
        board.finisher.as_mut().unwrap().base = 0x1001_3010;
        let err = board.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::Overlap("uart", "finisher"))
        );
    }

    #[test]
    fn test_heap_outside_ram() {
        let mut board = BoardDescriptor::default();
        board.heap_start = Some(0x9000_0000);
        let err = board.validate().unwrap_err();
        assert!(err.to_string().contains("outside RAM"));
    }

    #[test]
    fn test_ram_at_top_of_address_space() {
        let mut board = BoardDescriptor::default();
        board.ram.base = 0xFFFF_FFFF_FFFF_0000;
        board.heap_start = Some(0xFFFF_FFFF_FFFF_0000);
        let err = board.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::WindowOutOfRange("ram"))
        );

        // A finisher in the very last word would end at 2^64; one word lower fits.
        let mut board = BoardDescriptor::default();
        board.finisher.as_mut().unwrap().base = 0xFFFF_FFFF_FFFF_FFFC;
        assert!(board.validate().is_err());
        board.finisher.as_mut().unwrap().base = 0xFFFF_FFFF_FFFF_FFF8;
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_misaligned_uart() {
        let mut board = BoardDescriptor::default();
        board.uart.base = 0x1001_3002;
        let err = board.validate().unwrap_err();
        assert!(err.to_string().contains("aligned"));
    }

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  board: "boards/sifive.yaml"
  stdin: "42\n"
assertions:
  - uart_contains: "Hello"
  - uart_equals: "Hello\r\n"
  - expected_exit: pass
  - finisher_value: 1
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.inputs.stdin, "42\n");
        assert_eq!(script.assertions.len(), 4);
        assert!(matches!(
            script.assertions[2],
            TestAssertion::ExpectedExit(ExitAssertion {
                expected_exit: ExpectedExit::Pass
            })
        ));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_empty_board_path() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  board: ""
"#;
        let script: TestScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("board"));
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64KiB").unwrap(), 65536);
        assert!(parse_size("lots").is_err());
    }
}
