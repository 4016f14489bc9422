// Simulated devices for host tests.
//
// `SimKeyboard` replays a scancode script through the 8042 status/data
// ports. `SimDisk` models the primary ATA channel: register file, busy
// phase of configurable length, PIO data phase, fault injection.
//
// The keyboard script must list releases in press order; the driver does
// not model rollover.

use std::collections::{HashMap, VecDeque};

use crate::ata::{cmd, reg, status, ATA_PRIMARY_BASE, SECTOR_SIZE};
use crate::keyboard::{PS2_DATA_PORT, PS2_STATUS_PORT};
use crate::port::PortIo;

/// Make code followed by its break code.
pub fn press(code: u8) -> [u8; 2] {
    [code, code | 0x80]
}

pub struct SimKeyboard {
    codes: VecDeque<u8>,
}

impl SimKeyboard {
    pub fn new(codes: &[u8]) -> Self {
        SimKeyboard {
            codes: codes.iter().copied().collect(),
        }
    }

    /// Script for typing `text` followed by Enter; `\n` inside `text` is
    /// also Enter. Letters, digits, space and a few symbols only; uppercase
    /// goes through left shift.
    pub fn typing(text: &str) -> Self {
        let mut codes = Vec::new();
        for c in text.chars() {
            let (code, shifted) = scancode_for(c);
            if shifted {
                codes.push(0x2A);
            }
            codes.extend(press(code));
            if shifted {
                codes.push(0xAA);
            }
        }
        codes.extend(press(0x1C));
        SimKeyboard::new(&codes)
    }

    pub fn remaining(&self) -> usize {
        self.codes.len()
    }
}

fn scancode_for(c: char) -> (u8, bool) {
    const ROW_NUM: &str = "1234567890";
    const ROW_Q: &str = "qwertyuiop";
    const ROW_A: &str = "asdfghjkl";
    const ROW_Z: &str = "zxcvbnm";
    let lower = c.to_ascii_lowercase();
    let shifted = c.is_ascii_uppercase();
    if let Some(i) = ROW_NUM.find(lower) {
        return (0x02 + i as u8, false);
    }
    if let Some(i) = ROW_Q.find(lower) {
        return (0x10 + i as u8, shifted);
    }
    if let Some(i) = ROW_A.find(lower) {
        return (0x1E + i as u8, shifted);
    }
    if let Some(i) = ROW_Z.find(lower) {
        return (0x2C + i as u8, shifted);
    }
    match c {
        '\n' => (0x1C, false),
        ' ' => (0x39, false),
        '-' => (0x0C, false),
        '.' => (0x34, false),
        '!' => (0x02, true),
        _ => panic!("no scancode for {:?}", c),
    }
}

impl PortIo for SimKeyboard {
    fn read_u8(&mut self, port: u16) -> u8 {
        match port {
            PS2_STATUS_PORT => u8::from(!self.codes.is_empty()),
            PS2_DATA_PORT => self.codes.pop_front().unwrap_or(0),
            _ => 0xFF,
        }
    }

    fn write_u8(&mut self, _port: u16, _value: u8) {}

    fn read_u16(&mut self, _port: u16) -> u16 {
        0xFFFF
    }

    fn write_u16(&mut self, _port: u16, _value: u16) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    DataOut { lba: u32 },
    DataIn,
}

pub struct SimDisk {
    pub present: bool,
    pub sectors: HashMap<u32, [u8; SECTOR_SIZE]>,
    pub busy_polls: u32,
    pub fail_next: Option<u8>,
    pub drive_fault_next: bool,
    pub model: &'static str,
    pub total_sectors: u32,
    pub commands: Vec<u8>,
    regs: [u8; 8],
    busy_left: u32,
    status: u8,
    words: VecDeque<u16>,
    incoming: Vec<u16>,
    phase: Phase,
}

impl SimDisk {
    pub fn new() -> Self {
        SimDisk {
            present: true,
            sectors: HashMap::new(),
            busy_polls: 3,
            fail_next: None,
            drive_fault_next: false,
            model: "SIM HARDDISK",
            total_sectors: 20_480,
            commands: Vec::new(),
            regs: [0; 8],
            busy_left: 0,
            status: status::RDY,
            words: VecDeque::new(),
            incoming: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn absent() -> Self {
        SimDisk {
            present: false,
            ..SimDisk::new()
        }
    }

    pub fn sector(&self, lba: u32) -> [u8; SECTOR_SIZE] {
        self.sectors.get(&lba).copied().unwrap_or([0; SECTOR_SIZE])
    }

    /// The 28-bit address last programmed into the task file.
    pub fn programmed_lba(&self) -> u32 {
        (self.regs[reg::LBA_LO as usize] as u32)
            | (self.regs[reg::LBA_MID as usize] as u32) << 8
            | (self.regs[reg::LBA_HI as usize] as u32) << 16
            | ((self.regs[reg::DRIVE_HEAD as usize] & 0x0F) as u32) << 24
    }

    pub fn drive_head(&self) -> u8 {
        self.regs[reg::DRIVE_HEAD as usize]
    }

    fn identify_words(&self) -> VecDeque<u16> {
        let mut words = vec![0u16; 256];
        let mut model = [b' '; 40];
        for (i, b) in self.model.bytes().take(40).enumerate() {
            model[i] = b;
        }
        // ATA strings are stored byte-swapped within each word
        for i in 0..20 {
            words[27 + i] = (model[2 * i] as u16) << 8 | model[2 * i + 1] as u16;
        }
        words[60] = self.total_sectors as u16;
        words[61] = (self.total_sectors >> 16) as u16;
        words.into_iter().collect()
    }

    fn begin_command(&mut self, command: u8) {
        self.commands.push(command);
        self.busy_left = self.busy_polls;

        if let Some(error) = self.fail_next.take() {
            self.regs[reg::ERROR as usize] = error;
            self.status = status::RDY | status::ERR;
            self.phase = Phase::Idle;
            return;
        }
        if self.drive_fault_next {
            self.drive_fault_next = false;
            self.status = status::RDY | status::DF;
            self.phase = Phase::Idle;
            return;
        }

        let lba = self.programmed_lba();
        match command {
            cmd::IDENTIFY => {
                self.words = self.identify_words();
                self.status = status::RDY | status::DRQ;
                self.phase = Phase::DataIn;
            }
            cmd::READ_SECTORS => {
                let data = self.sector(lba);
                self.words = data
                    .chunks_exact(2)
                    .map(|p| p[0] as u16 | (p[1] as u16) << 8)
                    .collect();
                self.status = status::RDY | status::DRQ;
                self.phase = Phase::DataIn;
            }
            cmd::WRITE_SECTORS => {
                self.incoming.clear();
                self.status = status::RDY | status::DRQ;
                self.phase = Phase::DataOut { lba };
            }
            cmd::CACHE_FLUSH => {
                self.status = status::RDY;
                self.phase = Phase::Idle;
            }
            _ => {
                self.regs[reg::ERROR as usize] = 0x04;
                self.status = status::RDY | status::ERR;
                self.phase = Phase::Idle;
            }
        }
    }
}

impl Default for SimDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for SimDisk {
    fn read_u8(&mut self, port: u16) -> u8 {
        if !self.present {
            return 0;
        }
        let r = port.wrapping_sub(ATA_PRIMARY_BASE);
        if r == reg::STATUS {
            if self.busy_left > 0 {
                self.busy_left -= 1;
                return status::BSY;
            }
            return self.status;
        }
        self.regs.get(r as usize).copied().unwrap_or(0xFF)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        if !self.present {
            return;
        }
        let r = port.wrapping_sub(ATA_PRIMARY_BASE);
        if r == reg::COMMAND {
            self.begin_command(value);
        } else if let Some(slot) = self.regs.get_mut(r as usize) {
            *slot = value;
        }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        if !self.present || port != ATA_PRIMARY_BASE + reg::DATA || self.phase != Phase::DataIn {
            return 0xFFFF;
        }
        let word = self.words.pop_front().unwrap_or(0);
        if self.words.is_empty() {
            self.status = status::RDY;
            self.phase = Phase::Idle;
        }
        word
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        if !self.present || port != ATA_PRIMARY_BASE + reg::DATA {
            return;
        }
        if let Phase::DataOut { lba } = self.phase {
            self.incoming.push(value);
            if self.incoming.len() == SECTOR_SIZE / 2 {
                let mut data = [0u8; SECTOR_SIZE];
                for (i, w) in self.incoming.iter().enumerate() {
                    data[2 * i] = *w as u8;
                    data[2 * i + 1] = (*w >> 8) as u8;
                }
                self.sectors.insert(lba, data);
                self.incoming.clear();
                self.status = status::RDY;
                self.phase = Phase::Idle;
            }
        }
    }
}
