// Kernel entry point and library root
//
// This file declares the kernel's modules and defines `kmain`, the entry
// the boot stub jumps to once the CPU is in long mode with the VGA text
// buffer and the legacy I/O ports reachable.
//
// Boot sequence:
// - Bring up COM1 and route the log there
// - Wrap the VGA text buffer in a `Display`
// - Hand the 8042 keyboard and the primary ATA channel to the shell
// - Run the shell loop forever
//
// Design and implementation:
// - Kernel is `no_std`; host test builds link std so the simulated
//   devices in `sim` can use collections
// - Interrupts are never enabled; every device is polled through `port`
// - The shell owns all three devices, so no globals guard them
// - Panic handler logs over serial and halts the CPU

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod log;

pub mod arch;
pub mod ata;
pub mod build_info;
pub mod commands;
pub mod config;
pub mod keyboard;
pub mod parser;
pub mod port;
pub mod serial;
pub mod shell;
pub mod vga;

#[cfg(test)]
mod sim;

#[cfg(not(test))]
use core::panic::PanicInfo;

const LOG_BOOT: &str = "boot";

/// # Safety
///
/// Must be entered exactly once, on the boot CPU, with the VGA text buffer
/// identity-mapped and nothing else driving the keyboard, disk or COM1.
#[cfg(all(not(test), target_arch = "x86_64"))]
#[no_mangle]
pub unsafe extern "C" fn kmain() -> ! {
    let cfg = config::KernelConfig::DEFAULT;

    let serial_ok = serial::init();
    log::init(serial::_print, cfg.log_level);
    log_info!(LOG_BOOT, "{}", build_info::BOOT_BANNER);
    if !serial_ok {
        log_warn!(LOG_BOOT, "COM1 loopback test failed");
    }

    let display = vga::Display::new(vga::VgaBuffer::new());
    let keyboard = keyboard::Keyboard::new(port::HardwarePorts::new(), cfg.keyboard_poll);
    let disk = ata::AtaDrive::primary(port::HardwarePorts::new(), cfg.disk_poll);

    let mut shell = shell::Shell::new(display, keyboard, disk, cfg.shell);
    shell.boot();
    shell.run()
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log_panic!("PANIC", "{}", info);
    loop {
        arch::halt();
    }
}
