// Port I/O Capability
//
// Every device in this kernel is driven by reading and writing legacy x86
// I/O ports and spinning on status bits. This module is the single seam
// between the protocol logic and the hardware instructions.
//
// Key responsibilities:
// - Define the `PortIo` capability used by the keyboard, disk and serial drivers
// - Provide the real implementation on top of `x86_64::instructions::port`
// - Provide the one busy-wait primitive (`wait_status`) with an optional budget
//
// Design notes:
// - Trait methods are safe; the unsafety lives in constructing `HardwarePorts`,
//   where the caller asserts it runs with I/O privilege
// - `PollBudget::Unbounded` spins forever, which is the behaviour of the bare
//   hardware model; bounded budgets turn a dead device into `PollTimeout`

use core::fmt;

/// Register-level access to the I/O port space.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
    fn read_u16(&mut self, port: u16) -> u16;
    fn write_u16(&mut self, port: u16, value: u16);
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn read_u8(&mut self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        (**self).read_u16(port)
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        (**self).write_u16(port, value)
    }
}

/// The physical port space, accessed with `in`/`out`.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct HardwarePorts {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl HardwarePorts {
    /// # Safety
    ///
    /// The caller must be running at a privilege level that allows port I/O,
    /// and must not let two owners drive the same device concurrently.
    pub const unsafe fn new() -> Self {
        HardwarePorts { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for HardwarePorts {
    #[inline]
    fn read_u8(&mut self, port: u16) -> u8 {
        let mut p = x86_64::instructions::port::Port::<u8>::new(port);
        unsafe { p.read() }
    }

    #[inline]
    fn write_u8(&mut self, port: u16, value: u8) {
        let mut p = x86_64::instructions::port::Port::<u8>::new(port);
        unsafe { p.write(value) }
    }

    #[inline]
    fn read_u16(&mut self, port: u16) -> u16 {
        let mut p = x86_64::instructions::port::Port::<u16>::new(port);
        unsafe { p.read() }
    }

    #[inline]
    fn write_u16(&mut self, port: u16, value: u16) {
        let mut p = x86_64::instructions::port::Port::<u16>::new(port);
        unsafe { p.write(value) }
    }
}

/// How long a status poll may spin before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBudget {
    Unbounded,
    Spins(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout {
    pub port: u16,
    pub last_status: u8,
}

impl fmt::Display for PollTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timed out polling port 0x{:03X} (last status 0x{:02X})",
            self.port, self.last_status
        )
    }
}

/// Spin on `port` until `ready` accepts the value read, returning that value.
pub fn wait_status<P, F>(
    ports: &mut P,
    port: u16,
    budget: PollBudget,
    mut ready: F,
) -> Result<u8, PollTimeout>
where
    P: PortIo + ?Sized,
    F: FnMut(u8) -> bool,
{
    match budget {
        PollBudget::Unbounded => loop {
            let status = ports.read_u8(port);
            if ready(status) {
                return Ok(status);
            }
            core::hint::spin_loop();
        },
        PollBudget::Spins(limit) => {
            let mut status = 0;
            for _ in 0..limit {
                status = ports.read_u8(port);
                if ready(status) {
                    return Ok(status);
                }
                core::hint::spin_loop();
            }
            Err(PollTimeout {
                port,
                last_status: status,
            })
        }
    }
}
