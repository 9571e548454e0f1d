#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod device;
pub mod interface;
pub mod peer;
pub mod registers;

// Re-export main types
pub use device::FpgaDriver;
pub use interface::{SpiLink, SpiTransport, Transport};
pub use peer::PeerInterface;
pub use registers::{Descriptor, FPGA_MAP, Layout, RegisterId, RegisterMap};

/// Bus values that mean nothing answered the version read
///
/// An unpowered or absent FPGA leaves MISO floating, which reads back as
/// all-zero or all-one bytes.
pub const FLOATING_BUS_VALUES: [u8; 2] = [0x00, 0xFF];

/// SPI mux targets sharing the gateway's SPI bus
///
/// The FPGA routes each SPI frame to one device according to the first byte
/// of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MuxChannel {
    /// SX1301 baseband concentrator
    Sx1301 = 0x00,
    /// FPGA register file (the structured register map)
    FpgaReg = 0x01,
    /// Configuration EEPROM
    Eeprom = 0x02,
    /// SX1272 peer radio
    Sx1272 = 0x03,
}

/// Handshake failures reported by [`FpgaDriver::connect`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handshake<E> {
    /// The version register could not be read
    Bus(E),
    /// The version register read back a floating-bus value (no device)
    NoDevice(u8),
    /// The device answered with an unexpected version
    UnexpectedVersion {
        /// Default value of the version register
        expected: i32,
        /// Value actually read
        found: u8,
    },
}

/// Driver errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Register id is outside the register map
    InvalidRegisterId(RegisterId),
    /// Attempted to write a read-only register
    ReadOnlyRegister(RegisterId),
    /// Burst access of zero bytes
    EmptyBurst,
    /// Burst read does not fit in the output buffer
    BurstTooLong {
        /// Number of bytes requested
        requested: usize,
        /// Capacity of the output buffer
        capacity: usize,
    },
    /// No open connection to the device
    NotConnected,
    /// Descriptor offset/length combination is not supported
    UnsupportedLayout {
        /// Bit offset of the field
        offset: u8,
        /// Bit length of the field
        length: u8,
    },
    /// Device identity check failed during connect
    Handshake(Handshake<E>),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
