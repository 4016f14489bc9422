// ATA PIO Block Device Driver
//
// Single-sector programmed I/O against the primary IDE channel (0x1F0),
// master drive, LBA28 addressing. Every transfer is exactly one 512-byte
// sector moved as 256 little-endian words through the data register.
//
// Operations:
// - `detect_drive` / `identify`: IDENTIFY DEVICE, status 0 means no drive
// - `read_sector`: READ SECTORS (0x20), wait DRQ, 256 x `in ax, dx`
// - `write_sector`: WRITE SECTORS (0x30), wait DRQ, 256 x `out dx, ax`,
//   then CACHE FLUSH (0xE7) and wait for BSY to clear
//
// Error model:
// - ERR and DF are checked after every data-ready wait and after the flush
// - Status waits use the configured `PollBudget`; with `Unbounded` an absent
//   controller hangs forever, with `Spins(n)` it becomes `AtaError::Timeout`
// - No retries; the caller decides what to report

use core::fmt;

use crate::port::{wait_status, PollBudget, PollTimeout, PortIo};
use crate::{log_debug, log_info, log_warn};

const LOG_ORIGIN: &str = "ata";

pub const ATA_PRIMARY_BASE: u16 = 0x1F0;
pub const SECTOR_SIZE: usize = 512;
const SECTOR_WORDS: usize = SECTOR_SIZE / 2;

/// Highest address reachable with 28-bit LBA.
pub const LBA28_MAX: u32 = 0x0FFF_FFFF;

/// LBA mode, master drive; the low nibble carries LBA bits 24-27.
const DRIVE_LBA_MASTER: u8 = 0xE0;
const DRIVE_IDENTIFY_MASTER: u8 = 0xA0;

/// Register offsets from the channel base.
pub(crate) mod reg {
    pub const DATA: u16 = 0;
    pub const ERROR: u16 = 1;
    pub const SECTOR_COUNT: u16 = 2;
    pub const LBA_LO: u16 = 3;
    pub const LBA_MID: u16 = 4;
    pub const LBA_HI: u16 = 5;
    pub const DRIVE_HEAD: u16 = 6;
    pub const STATUS: u16 = 7;
    pub const COMMAND: u16 = 7;
}

pub(crate) mod status {
    pub const ERR: u8 = 1 << 0;
    pub const DRQ: u8 = 1 << 3;
    pub const DF: u8 = 1 << 5;
    pub const RDY: u8 = 1 << 6;
    pub const BSY: u8 = 1 << 7;
}

pub(crate) mod cmd {
    pub const READ_SECTORS: u8 = 0x20;
    pub const WRITE_SECTORS: u8 = 0x30;
    pub const CACHE_FLUSH: u8 = 0xE7;
    pub const IDENTIFY: u8 = 0xEC;
}

pub type Sector = [u8; SECTOR_SIZE];

/// A validated 28-bit logical block address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lba(u32);

impl Lba {
    pub const fn new(value: u32) -> Option<Self> {
        if value <= LBA28_MAX {
            Some(Lba(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    const fn low(self) -> u8 {
        self.0 as u8
    }

    const fn mid(self) -> u8 {
        (self.0 >> 8) as u8
    }

    const fn high(self) -> u8 {
        (self.0 >> 16) as u8
    }

    const fn top_nibble(self) -> u8 {
        ((self.0 >> 24) & 0x0F) as u8
    }
}

impl fmt::Display for Lba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaError {
    NoDrive,
    DeviceError(u8),
    DriveFault,
    Timeout(PollTimeout),
}

impl From<PollTimeout> for AtaError {
    fn from(t: PollTimeout) -> Self {
        AtaError::Timeout(t)
    }
}

impl fmt::Display for AtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtaError::NoDrive => write!(f, "no drive"),
            AtaError::DeviceError(e) => write!(f, "device error (0x{:02X})", e),
            AtaError::DriveFault => write!(f, "drive fault"),
            AtaError::Timeout(_) => write!(f, "timeout"),
        }
    }
}

pub type AtaResult<T> = Result<T, AtaError>;

/// Fields of interest from the IDENTIFY DEVICE payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DriveInfo {
    pub model: [u8; 40],
    /// Addressable sectors in LBA28 mode (words 60-61).
    pub total_sectors: u32,
}

impl DriveInfo {
    fn from_identify(words: &[u16; SECTOR_WORDS]) -> Self {
        let mut model = [0u8; 40];
        for (i, w) in words[27..47].iter().enumerate() {
            model[2 * i] = (*w >> 8) as u8;
            model[2 * i + 1] = *w as u8;
        }
        DriveInfo {
            model,
            total_sectors: words[60] as u32 | (words[61] as u32) << 16,
        }
    }

    pub fn model_str(&self) -> &str {
        let end = self
            .model
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        core::str::from_utf8(&self.model[..end]).unwrap_or("?")
    }

    pub fn capacity_mib(&self) -> u32 {
        self.total_sectors / 2048
    }
}

impl fmt::Debug for DriveInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveInfo")
            .field("model", &self.model_str())
            .field("total_sectors", &self.total_sectors)
            .finish()
    }
}

pub struct AtaDrive<P: PortIo> {
    ports: P,
    base: u16,
    budget: PollBudget,
}

impl<P: PortIo> AtaDrive<P> {
    pub fn primary(ports: P, budget: PollBudget) -> Self {
        AtaDrive {
            ports,
            base: ATA_PRIMARY_BASE,
            budget,
        }
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    #[inline]
    fn outb(&mut self, r: u16, v: u8) {
        self.ports.write_u8(self.base + r, v);
    }

    #[inline]
    fn inb(&mut self, r: u16) -> u8 {
        self.ports.read_u8(self.base + r)
    }

    fn wait_not_busy(&mut self) -> AtaResult<u8> {
        let st = wait_status(&mut self.ports, self.base + reg::STATUS, self.budget, |s| {
            s & status::BSY == 0
        })?;
        Ok(st)
    }

    /// Wait for DRQ, reporting ERR/DF as soon as BSY drops.
    fn wait_drq(&mut self) -> AtaResult<()> {
        let st = wait_status(&mut self.ports, self.base + reg::STATUS, self.budget, |s| {
            s & status::BSY == 0 && s & (status::DRQ | status::ERR | status::DF) != 0
        })?;
        self.check_fault(st)
    }

    fn check_fault(&mut self, st: u8) -> AtaResult<()> {
        if st & status::ERR != 0 {
            let error = self.inb(reg::ERROR);
            log_warn!(LOG_ORIGIN, "device error, status=0x{:02X} error=0x{:02X}", st, error);
            return Err(AtaError::DeviceError(error));
        }
        if st & status::DF != 0 {
            log_warn!(LOG_ORIGIN, "drive fault, status=0x{:02X}", st);
            return Err(AtaError::DriveFault);
        }
        Ok(())
    }

    fn select(&mut self, lba: Lba, command: u8) {
        self.outb(reg::DRIVE_HEAD, DRIVE_LBA_MASTER | lba.top_nibble());
        self.outb(reg::SECTOR_COUNT, 1);
        self.outb(reg::LBA_LO, lba.low());
        self.outb(reg::LBA_MID, lba.mid());
        self.outb(reg::LBA_HI, lba.high());
        self.outb(reg::COMMAND, command);
    }

    /// Run IDENTIFY DEVICE on the master drive. `Ok(None)` when nothing answers.
    pub fn identify(&mut self) -> AtaResult<Option<DriveInfo>> {
        self.outb(reg::DRIVE_HEAD, DRIVE_IDENTIFY_MASTER);
        for r in [reg::SECTOR_COUNT, reg::LBA_LO, reg::LBA_MID, reg::LBA_HI] {
            self.outb(r, 0);
        }
        self.outb(reg::COMMAND, cmd::IDENTIFY);

        if self.inb(reg::STATUS) == 0 {
            log_info!(LOG_ORIGIN, "no drive on primary master");
            return Ok(None);
        }

        self.wait_not_busy()?;
        self.wait_drq()?;

        let mut words = [0u16; SECTOR_WORDS];
        for w in words.iter_mut() {
            *w = self.ports.read_u16(self.base + reg::DATA);
        }

        let info = DriveInfo::from_identify(&words);
        log_info!(
            LOG_ORIGIN,
            "primary master: \"{}\", {} sectors",
            info.model_str(),
            info.total_sectors
        );
        Ok(Some(info))
    }

    pub fn detect_drive(&mut self) -> AtaResult<bool> {
        self.identify().map(|info| info.is_some())
    }

    pub fn read_sector(&mut self, lba: Lba, out: &mut Sector) -> AtaResult<()> {
        self.select(lba, cmd::READ_SECTORS);
        self.wait_drq()?;

        for pair in out.chunks_exact_mut(2) {
            let word = self.ports.read_u16(self.base + reg::DATA);
            pair[0] = word as u8;
            pair[1] = (word >> 8) as u8;
        }

        log_debug!(LOG_ORIGIN, "read sector {}", lba);
        Ok(())
    }

    pub fn write_sector(&mut self, lba: Lba, data: &Sector) -> AtaResult<()> {
        self.select(lba, cmd::WRITE_SECTORS);
        self.wait_drq()?;

        for pair in data.chunks_exact(2) {
            let word = pair[0] as u16 | (pair[1] as u16) << 8;
            self.ports.write_u16(self.base + reg::DATA, word);
        }

        self.outb(reg::COMMAND, cmd::CACHE_FLUSH);
        let st = self.wait_not_busy()?;
        self.check_fault(st)?;

        log_debug!(LOG_ORIGIN, "wrote sector {}", lba);
        Ok(())
    }
}
