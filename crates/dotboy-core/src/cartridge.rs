use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),
    #[error("ROM image is empty")]
    Empty,
}

/// Mapper kind from the cartridge-type header byte.
///
/// Only the flat (no-MBC) view is implemented; the enum is the strategy
/// slot for banked mappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc3,
    Mbc5,
    Unknown(u8),
}

pub struct Cartridge {
    rom: Vec<u8>,
    pub title: String,
    pub mbc: MbcType,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(&path)?;
        let cart = Self::load(data)?;
        log::info!(
            "loaded ROM: {} ({} bytes, mapper {:?})",
            cart.title,
            cart.rom.len(),
            cart.mbc
        );
        Ok(cart)
    }

    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.is_empty() {
            return Err(CartridgeError::Empty);
        }

        let header = Header::parse(&data);
        let mbc = header.mbc_type();
        let title = header.title();
        if mbc != MbcType::NoMbc {
            log::warn!("cartridge requests mapper {mbc:?}; using a flat ROM view");
        }

        Ok(Self {
            rom: data,
            title,
            mbc,
        })
    }

    /// Read from cartridge address space (0x0000-0x7FFF ROM, 0xA000-0xBFFF
    /// external RAM). Every mapper currently resolves to the flat view; the
    /// flat view has no external RAM, and out-of-image addresses read as
    /// open bus.
    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            _ => 0xFF,
        }
    }

    /// Writes into ROM space latch banking registers on real mappers; the
    /// flat view drops them.
    pub fn write(&mut self, _addr: u16, _val: u8) {}

    pub fn rom_len(&self) -> usize {
        self.rom.len()
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn byte(&self, addr: usize) -> u8 {
        self.data.get(addr).copied().unwrap_or(0)
    }

    fn title(&self) -> String {
        let bytes: Vec<u8> = (0x134..0x144)
            .map(|a| self.byte(a))
            .take_while(|&b| b != 0)
            .collect();
        String::from_utf8_lossy(&bytes).trim().to_string()
    }

    fn mbc_type(&self) -> MbcType {
        match self.byte(0x147) {
            0x00 | 0x08 | 0x09 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            0x0F..=0x13 => MbcType::Mbc3,
            0x19..=0x1E => MbcType::Mbc5,
            other => MbcType::Unknown(other),
        }
    }
}
