// MetalCall - Bare-Metal Syscall Layer
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_UART_BASE: u64 = 0x1001_3000;
const DEFAULT_FINISHER_BASE: u64 = 0x0010_0000;

fn parse_address(raw: &str) -> Result<u64, String> {
    let raw = raw.trim().replace('_', "");
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|e| format!("'{raw}' is not a valid address: {e}"))
}

fn address(var: &str, default: u64) -> u64 {
    println!("cargo:rerun-if-env-changed={var}");
    match env::var(var) {
        Ok(raw) => match parse_address(&raw) {
            Ok(addr) if addr % 4 == 0 => addr,
            Ok(addr) => panic!("{var}={addr:#x} is not 4-byte aligned"),
            Err(e) => panic!("{var}: {e}"),
        },
        Err(_) => default,
    }
}

fn main() {
    // Register windows are baked in at build time so the C ABI surface
    // compiles down to plain loads and stores:
    //
    //   METALCALL_UART_BASE=0x10013000 METALCALL_FINISHER_BASE=0x100000 \
    //       cargo build --target riscv32imac-unknown-none-elf --features newlib
    let uart_base = address("METALCALL_UART_BASE", DEFAULT_UART_BASE);
    let finisher_base = address("METALCALL_FINISHER_BASE", DEFAULT_FINISHER_BASE);

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let generated = format!(
        "/// UART register window, from `METALCALL_UART_BASE`.\n\
         pub const UART_BASE: usize = {uart_base:#x};\n\
         /// Finisher register, from `METALCALL_FINISHER_BASE`.\n\
         pub const FINISHER_BASE: usize = {finisher_base:#x};\n"
    );
    fs::write(out_dir.join("platform.rs"), generated).expect("failed to write platform.rs");

    println!("cargo:rerun-if-changed=build.rs");
}
