use std::ffi::c_int;
use std::fmt::Write as _;
use std::ptr;
use std::sync::Arc;

use metalcall_config::BoardDescriptor;
use metalcall_sys::{abi, fake_host, uart::reg, Errno, ReadMode, Stat, S_IFCHR};
use metalcall_testbench::metrics::AccessMetrics;
use metalcall_testbench::peripherals::uart::SifiveUart;
use metalcall_testbench::snapshot::ExitReport;
use metalcall_testbench::{SimulationError, Testbench};

const UART: u64 = 0x1001_3000;
const TXDATA: u64 = UART + reg::TXDATA as u64;
const RXDATA: u64 = UART + reg::RXDATA as u64;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn bench_with_metrics(board: &BoardDescriptor) -> (Testbench, Arc<AccessMetrics>) {
    init_tracing();
    let metrics = Arc::new(AccessMetrics::new());
    let bench = Testbench::from_board(board)
        .unwrap()
        .with_observer(metrics.clone());
    (bench, metrics)
}

#[test]
fn test_write_injects_carriage_returns() {
    let (bench, metrics) = bench_with_metrics(&BoardDescriptor::default());
    let sys = bench.system();
    sys.init_io();

    let mut errno: c_int = 0;
    let msg = b"a\nb\n";
    let rc = unsafe { abi::write(&sys, &mut errno, 1, msg.as_ptr().cast(), msg.len()) };

    assert_eq!(rc, 4);
    assert_eq!(errno, 0);
    assert_eq!(bench.uart_output(), b"a\r\nb\r\n");
    assert_eq!(metrics.at(TXDATA).writes, 6);
}

#[test]
fn test_write_without_newlines_emits_exact_bytes() {
    let (bench, metrics) = bench_with_metrics(&BoardDescriptor::default());
    let sys = bench.system();
    sys.init_io();

    let mut errno: c_int = 0;
    let msg = b"no newline here";
    let rc = unsafe { abi::write(&sys, &mut errno, 2, msg.as_ptr().cast(), msg.len()) };

    assert_eq!(rc, msg.len() as isize);
    assert_eq!(bench.uart_output(), msg);
    assert_eq!(metrics.at(TXDATA).writes, msg.len() as u64);
}

#[test]
fn test_write_busy_waits_on_full_fifo() {
    let mut board = BoardDescriptor::default();
    board.uart.tx_busy_polls = 3;
    let (bench, metrics) = bench_with_metrics(&board);
    let sys = bench.system();
    sys.init_io();

    assert_eq!(sys.write(1, b"abc"), Ok(3));

    // One poll for the first byte, then three "full" polls plus the one
    // that finds room for each following byte.
    assert_eq!(metrics.at(TXDATA).reads, 1 + 4 + 4);
    assert_eq!(bench.uart_output(), b"abc");
}

#[test]
fn test_write_stalls_when_transmitter_disabled() {
    init_tracing();
    let bench = Testbench::new();
    let result = bench.run(|sys| {
        let _ = sys.write(1, &[b'x'; 32]);
    });
    assert!(matches!(result, Err(SimulationError::TxStalled(_))));
}

#[test]
fn test_board_stall_limit_reaches_uart() {
    init_tracing();
    let mut board = BoardDescriptor::default();
    board.uart.tx_fifo_depth = 1;
    board.uart.tx_stall_limit = Some(5);
    let bench = Testbench::from_board(&board).unwrap();
    let result = bench.run(|sys| {
        let _ = sys.write(1, b"xy");
    });
    assert_eq!(result.unwrap_err(), SimulationError::TxStalled(5));
}

#[test]
fn test_read_returns_early_when_fifo_drains() {
    let (bench, metrics) = bench_with_metrics(&BoardDescriptor::default());
    bench.push_stdin(b"hey");
    let sys = bench.system();
    sys.init_io();

    let mut errno: c_int = 0;
    let mut buf = [0u8; 8];
    let rc = unsafe { abi::read(&sys, &mut errno, 0, buf.as_mut_ptr().cast(), buf.len()) };

    assert_eq!(rc, 3);
    assert_eq!(&buf[..3], b"hey");
    // Three bytes and the empty poll that ended the read.
    assert_eq!(metrics.at(RXDATA).reads, 4);

    let rc = unsafe { abi::read(&sys, &mut errno, 0, buf.as_mut_ptr().cast(), buf.len()) };
    assert_eq!(rc, 0);
    assert_eq!(errno, 0);

    // Polled I/O: init leaves interrupts off and the read drained the FIFO.
    let bus = bench.bus.borrow();
    let uart = bus.peripheral::<SifiveUart>("uart").unwrap();
    assert_eq!(uart.interrupts_enabled(), 0);
    assert_eq!(uart.rx_pending(), 0);
}

#[test]
fn test_blocking_read_fills_buffer() {
    init_tracing();
    let bench = Testbench::new().with_read_mode(ReadMode::Blocking);
    bench.push_stdin(b"abcd");
    let sys = bench.system();
    sys.init_io();

    let mut buf = [0u8; 4];
    assert_eq!(sys.read(0, &mut buf), Ok(4));
    assert_eq!(&buf, b"abcd");
}

#[test]
fn test_bad_descriptors_set_ebadf() {
    let (bench, metrics) = bench_with_metrics(&BoardDescriptor::default());
    let sys = bench.system();
    let mut errno: c_int = 0;
    let buf = [0u8; 10];

    assert_eq!(
        unsafe { abi::write(&sys, &mut errno, 5, buf.as_ptr().cast(), 10) },
        -1
    );
    assert_eq!(errno, Errno::BadFd.code());

    errno = 0;
    let mut rbuf = [0u8; 4];
    assert_eq!(
        unsafe { abi::read(&sys, &mut errno, 1, rbuf.as_mut_ptr().cast(), 4) },
        -1
    );
    assert_eq!(errno, Errno::BadFd.code());

    errno = 0;
    assert_eq!(abi::lseek(&sys, &mut errno, 7, 0, 0), -1);
    assert_eq!(errno, Errno::BadFd.code());

    errno = 0;
    assert_eq!(abi::close(&sys, &mut errno, 7), -1);
    assert_eq!(errno, Errno::BadFd.code());

    // Rejected before any register was touched.
    assert_eq!(metrics.total(), Default::default());
}

#[test]
fn test_standard_streams_cannot_close_or_seek() {
    let bench = Testbench::new();
    let sys = bench.system();
    let mut errno: c_int = 0;

    assert_eq!(abi::close(&sys, &mut errno, 1), -1);
    assert_eq!(errno, Errno::NoSys.code());
    assert_eq!(abi::lseek(&sys, &mut errno, 0, 10, 0), -1);
    assert_eq!(errno, Errno::NoSys.code());
}

#[test]
fn test_fstat_reports_character_device() {
    let bench = Testbench::new();
    let sys = bench.system();
    let mut errno: c_int = 0;

    let mut st = Stat::default();
    assert_eq!(unsafe { abi::fstat(&sys, &mut errno, 1, &mut st) }, 0);
    assert_eq!(st.st_mode, S_IFCHR);

    assert_eq!(unsafe { abi::fstat(&sys, &mut errno, 1, ptr::null_mut()) }, -1);
    assert_eq!(errno, Errno::Invalid.code());
}

#[test]
fn test_identity_calls() {
    let bench = Testbench::new();
    let sys = bench.system();
    let mut errno: c_int = 0;

    for fd in 0..3 {
        assert_eq!(abi::isatty(&sys, fd), 1);
    }
    assert_eq!(abi::isatty(&sys, 3), 0);
    assert_eq!(abi::getpid(&sys), 1);
    assert_eq!(abi::kill(&sys, &mut errno, 1, 9), -1);
    assert_eq!(errno, Errno::NoSys.code());
}

#[test]
fn test_sbrk_hands_out_consecutive_blocks() {
    let mut board = BoardDescriptor::default();
    board.heap_start = Some(0x8000_1000);
    let bench = Testbench::from_board(&board).unwrap();
    let sys = bench.system();
    let start = bench.heap_start() as usize;

    let p0 = abi::sbrk(&sys, || unreachable!(), 16) as usize;
    let p1 = abi::sbrk(&sys, || unreachable!(), 32) as usize;
    assert_eq!(p0, start);
    assert_eq!(p1, start + 16);
    assert_eq!(sys.heap().cursor() as usize, start + 48);

    let p2 = abi::sbrk(&sys, || unreachable!(), -48) as usize;
    assert_eq!(p2, start + 48);
    assert_eq!(sys.heap().cursor() as usize, start);
    assert_eq!(sys.heap().remaining((start + 64) as *const u8), 64);
}

#[test]
fn test_set_baud_programs_divisor() {
    let bench = Testbench::new();
    let sys = bench.system();
    sys.uart().set_baud(16_000_000, 115_200).unwrap();
    let divisor = bench
        .bus
        .borrow()
        .peripheral::<SifiveUart>("uart")
        .unwrap()
        .divisor();
    assert_eq!(divisor, 137);
    assert_eq!(sys.uart().set_baud(16_000_000, 0), Err(Errno::Invalid));
}

#[test]
fn test_formatted_output() {
    let bench = Testbench::new();
    let sys = bench.system();
    sys.init_io();
    let mut uart = *sys.uart();
    writeln!(uart, "code={}", 7).unwrap();
    assert_eq!(bench.uart_output(), b"code=7\r\n");
}

#[test]
fn test_exit_through_c_abi() {
    init_tracing();
    let bench = Testbench::new();
    let report = bench.run(|sys| abi::exit(sys, 3)).unwrap();
    assert_eq!(report.finisher_writes, vec![(3 << 1) | 1]);
    assert_eq!(report.exit, Some(ExitReport::Fail { value: 3 }));
    assert!(report.parked);
}

#[test]
fn test_fake_host_syscalls() {
    let (bench, metrics) = bench_with_metrics(&BoardDescriptor::default());
    let host = bench.fake_host();

    assert_eq!(host.syscall(1, 0x8000_0000, 12, fake_host::nr::WRITE), 12);
    assert_eq!(host.syscall(0, 0, 0, fake_host::nr::BRK), 0);
    assert_eq!(host.syscall(0, 0, 0, 57), -1);
    assert_eq!(host.write(7, 20), 20);
    assert_eq!(host.read(0), Err(Errno::NoSys));
    assert!(host.isatty(9));

    let report = bench
        .run(|_| {
            host.syscall(0, 0, 0, fake_host::nr::EXIT);
        })
        .unwrap();
    assert!(report.parked);
    assert_eq!(metrics.total(), Default::default());
}
