// Serial Port Driver (Log Output)
//
// Polled COM1 UART used as the log sink. The VGA screen belongs to the
// shell, so diagnostics travel over the serial line instead.
//
// Implementation details:
// - UART is configured for 38400 baud (divisor = 3), 8N1, FIFOs enabled
// - A loopback self-test decides whether the port is usable; a missing
//   UART leaves the port disabled and output is discarded
// - Each byte waits for "transmit holding register empty"
// - Newlines are normalized to CRLF for terminal compatibility

use core::fmt;

use crate::port::{wait_status, PollBudget, PortIo};

pub const COM1: u16 = 0x3F8;

const LINE_STATUS: u16 = 5;
const TRANSMIT_EMPTY: u8 = 0x20;
const LOOPBACK_PROBE: u8 = 0xAE;

/// A dead UART must not stall the kernel, so transmit waits are bounded.
const TRANSMIT_BUDGET: PollBudget = PollBudget::Spins(100_000);

pub struct SerialPort<P: PortIo> {
    ports: P,
    base: u16,
    enabled: bool,
}

impl<P: PortIo> SerialPort<P> {
    pub const fn new(ports: P, base: u16) -> Self {
        SerialPort {
            ports,
            base,
            enabled: false,
        }
    }

    /// Program the UART. Returns whether the loopback test passed.
    pub fn init(&mut self) -> bool {
        let b = self.base;
        self.ports.write_u8(b + 1, 0x00);
        self.ports.write_u8(b + 3, 0x80);
        self.ports.write_u8(b, 0x03);
        self.ports.write_u8(b + 1, 0x00);
        self.ports.write_u8(b + 3, 0x03);
        self.ports.write_u8(b + 2, 0xC7);
        self.ports.write_u8(b + 4, 0x0B);
        self.ports.write_u8(b + 4, 0x1E);
        self.ports.write_u8(b, LOOPBACK_PROBE);

        if self.ports.read_u8(b) != LOOPBACK_PROBE {
            self.enabled = false;
            return false;
        }

        self.ports.write_u8(b + 4, 0x0F);
        self.enabled = true;
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn write_byte(&mut self, byte: u8) {
        if !self.enabled {
            return;
        }
        let ready = wait_status(&mut self.ports, self.base + LINE_STATUS, TRANSMIT_BUDGET, |s| {
            s & TRANSMIT_EMPTY != 0
        });
        match ready {
            Ok(_) => self.ports.write_u8(self.base, byte),
            Err(_) => self.enabled = false,
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }
}

impl<P: PortIo> fmt::Write for SerialPort<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        SerialPort::write_str(self, s);
        Ok(())
    }
}

#[cfg(target_arch = "x86_64")]
mod com1 {
    use core::fmt;
    use spin::Mutex;

    use super::{SerialPort, COM1};
    use crate::port::HardwarePorts;

    // SAFETY: only ever driven through this lock, from ring 0.
    static SERIAL1: Mutex<SerialPort<HardwarePorts>> =
        Mutex::new(SerialPort::new(unsafe { HardwarePorts::new() }, COM1));

    pub fn init() -> bool {
        SERIAL1.lock().init()
    }

    #[doc(hidden)]
    pub fn _print(args: fmt::Arguments) {
        use core::fmt::Write;
        let _ = SERIAL1.lock().write_fmt(args);
    }
}

#[cfg(target_arch = "x86_64")]
pub use com1::{_print, init};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeUart {
        loopback: bool,
        probe: u8,
        sent: Vec<u8>,
        configured: bool,
    }

    impl PortIo for FakeUart {
        fn read_u8(&mut self, port: u16) -> u8 {
            match port - COM1 {
                0 if self.loopback => self.probe,
                0 => 0xFF,
                LINE_STATUS => TRANSMIT_EMPTY,
                _ => 0,
            }
        }

        fn write_u8(&mut self, port: u16, value: u8) {
            match port - COM1 {
                0 if !self.configured => self.probe = value,
                0 => self.sent.push(value),
                4 if value == 0x0F => self.configured = true,
                _ => {}
            }
        }

        fn read_u16(&mut self, _port: u16) -> u16 {
            0
        }

        fn write_u16(&mut self, _port: u16, _value: u16) {}
    }

    #[test]
    fn test_crlf_translation() {
        let mut port = SerialPort::new(FakeUart { loopback: true, ..Default::default() }, COM1);
        assert!(port.init());
        port.write_str("ok\n");
        assert_eq!(port.ports.sent, b"ok\r\n");
    }

    #[test]
    fn test_missing_uart_stays_disabled() {
        let mut port = SerialPort::new(FakeUart::default(), COM1);
        assert!(!port.init());
        port.write_str("lost");
        assert!(!port.is_enabled());
        assert!(port.ports.sent.is_empty());
    }
}
