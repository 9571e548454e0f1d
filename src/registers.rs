//! Register descriptors for the gateway FPGA
//!
//! Every register of the FPGA register file is described by a static
//! [`Descriptor`]: its base address, the bit position and width of the field,
//! signedness and access rights. A field either fits inside one byte
//! (`offset + length <= 8`) or starts on a byte boundary and spans up to four
//! bytes (`offset == 0`, `length <= 32`). Multi-byte registers are stored
//! least-significant byte first.
//!
//! The shape of a descriptor is resolved once into a [`Layout`]; any other
//! offset/length combination has no layout and is rejected by the driver.

use crate::MuxChannel;

/// Index of a register in a [`RegisterMap`]
pub type RegisterId = u16;

/// Page value for registers that are visible from every page
pub const ALL_PAGES: i8 = -1;

/// Static description of one register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Descriptor {
    /// Register name
    pub name: &'static str,
    /// Page containing the register ([`ALL_PAGES`] for all pages)
    pub page: i8,
    /// Base byte address of the register
    pub address: u8,
    /// Position of the field LSB in the base byte (0-7)
    pub offset: u8,
    /// Field is two's complement
    pub signed: bool,
    /// Field width in bits (1-32)
    pub length: u8,
    /// Writes are rejected
    pub read_only: bool,
    /// Reset value
    pub default: i32,
}

impl Descriptor {
    /// Unsigned read/write register on all pages with a zero default
    pub const fn new(name: &'static str, address: u8, offset: u8, length: u8) -> Self {
        Self {
            name,
            page: ALL_PAGES,
            address,
            offset,
            signed: false,
            length,
            read_only: false,
            default: 0,
        }
    }

    /// Mark the field as two's complement
    #[must_use]
    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Mark the register as read-only
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set the reset value
    #[must_use]
    pub const fn default_value(mut self, default: i32) -> Self {
        self.default = default;
        self
    }

    /// Place the register on a specific page
    #[must_use]
    pub const fn on_page(mut self, page: i8) -> Self {
        self.page = page;
        self
    }

    /// Resolve the bit layout of this register
    ///
    /// Returns `None` when the offset/length combination is not supported.
    #[must_use]
    pub const fn layout(&self) -> Option<Layout> {
        let (offset, length) = (self.offset, self.length);
        if length == 0 || offset > 7 {
            None
        } else if offset == 0 && length == 8 {
            Some(Layout::FullByte)
        } else if offset as u16 + length as u16 <= 8 {
            Some(Layout::SubByte { offset, length })
        } else if offset == 0 && length <= 32 {
            Some(Layout::MultiByte { length })
        } else {
            None
        }
    }
}

/// Supported register shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layout {
    /// Whole byte at the base address
    FullByte,
    /// Field confined to the base byte, updated with read-modify-write
    SubByte {
        /// Bit position of the field LSB (0-7)
        offset: u8,
        /// Field width, `offset + length <= 8`
        length: u8,
    },
    /// Byte-aligned field of 9 to 32 bits, least-significant byte first
    MultiByte {
        /// Field width (9-32)
        length: u8,
    },
}

impl Layout {
    /// Number of bytes covered on the bus
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::FullByte | Self::SubByte { .. } => 1,
            Self::MultiByte { length } => (*length as usize).div_ceil(8),
        }
    }

    /// Field width in bits
    #[must_use]
    pub const fn length(&self) -> u8 {
        match self {
            Self::FullByte => 8,
            Self::SubByte { length, .. } | Self::MultiByte { length } => *length,
        }
    }
}

/// Ordered register table plus the parameters the driver needs to use it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterMap {
    /// Descriptors indexed by [`RegisterId`]
    pub registers: &'static [Descriptor],
    /// Register checked against its default value during connect
    pub version: RegisterId,
    /// Mux channel of the register file
    pub channel: MuxChannel,
}

impl RegisterMap {
    /// Descriptor for a register id
    #[must_use]
    pub fn get(&self, id: RegisterId) -> Option<&Descriptor> {
        self.registers.get(usize::from(id))
    }

    /// Look up a register id by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<RegisterId> {
        self.registers
            .iter()
            .position(|descriptor| descriptor.name == name)
            .and_then(|index| RegisterId::try_from(index).ok())
    }

    /// Number of registers in the map
    #[must_use]
    pub const fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether the map has no registers
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

/// Soft reset of the FPGA
pub const SOFT_RESET: RegisterId = 0;
/// FPGA firmware version, checked on connect
pub const VERSION: RegisterId = 1;
/// FPGA status
pub const FPGA_STATUS: RegisterId = 2;
/// FPGA control
pub const FPGA_CTRL: RegisterId = 3;
/// Spectral scan histogram RAM address
pub const HISTO_RAM_ADDR: RegisterId = 4;
/// Spectral scan histogram RAM data
pub const HISTO_RAM_DATA: RegisterId = 5;
/// Spectral scan histogram tempo
pub const HISTO_TEMPO: RegisterId = 6;
/// Number of RSSI reads per histogram
pub const HISTO_NB_READ: RegisterId = 7;
/// Free-running timestamp counter
pub const TIMESTAMP: RegisterId = 8;
/// SPI mux control
pub const SPI_MUX_CTRL: RegisterId = 9;

/// FPGA firmware version this driver expects
pub const EXPECTED_FPGA_VERSION: i32 = 18;

/// FPGA register file descriptors
pub const FPGA_REGISTERS: [Descriptor; 10] = [
    Descriptor::new("SOFT_RESET", 0, 0, 1),
    Descriptor::new("VERSION", 1, 0, 8)
        .read_only()
        .default_value(EXPECTED_FPGA_VERSION),
    Descriptor::new("FPGA_STATUS", 2, 0, 8).read_only(),
    Descriptor::new("FPGA_CTRL", 3, 0, 8),
    Descriptor::new("HISTO_RAM_ADDR", 4, 0, 8),
    Descriptor::new("HISTO_RAM_DATA", 5, 0, 8).read_only(),
    Descriptor::new("HISTO_TEMPO", 6, 0, 16).default_value(32000),
    Descriptor::new("HISTO_NB_READ", 8, 0, 16).default_value(1000),
    Descriptor::new("TIMESTAMP", 10, 0, 32).read_only(),
    Descriptor::new("SPI_MUX_CTRL", 127, 0, 8),
];

/// Register map of the gateway FPGA
pub const FPGA_MAP: RegisterMap = RegisterMap {
    registers: &FPGA_REGISTERS,
    version: VERSION,
    channel: MuxChannel::FpgaReg,
};
