//! Bus transport for the gateway FPGA
//!
//! The driver never talks to the SPI peripheral directly. It goes through the
//! [`Transport`] trait, which exposes the byte-level primitives of the FPGA
//! SPI mux: single and burst reads/writes addressed by a [`MuxChannel`] and a
//! 7-bit register address. [`SpiTransport`] implements it on top of an
//! `embedded-hal` [`SpiDevice`](embedded_hal::spi::SpiDevice).

use crate::MuxChannel;
use embedded_hal::spi::{Operation, SpiDevice};

/// Address bit 7 selects a write access
const WRITE_ACCESS: u8 = 0x80;

/// Register addresses are 7 bits wide
const ADDRESS_MASK: u8 = 0x7F;

/// Byte-level access to the devices behind the FPGA SPI mux
///
/// `open` hands out a handle that proves the link is up. The handle is not
/// `Clone`: the driver keeps the only one and gives it back through `close`.
pub trait Transport {
    /// Transport error
    type Error;
    /// Open link token
    type Handle;

    /// Open the link
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be opened.
    fn open(&mut self) -> Result<Self::Handle, Self::Error>;

    /// Close the link
    fn close(&mut self, handle: Self::Handle);

    /// Read one byte at `address` on `channel`
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn read(
        &mut self,
        handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
    ) -> Result<u8, Self::Error>;

    /// Write one byte at `address` on `channel`
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn write(
        &mut self,
        handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
        value: u8,
    ) -> Result<(), Self::Error>;

    /// Read `data.len()` consecutive bytes starting at `address`
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn read_burst(
        &mut self,
        handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
        data: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write `data` to consecutive bytes starting at `address`
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    fn write_burst(
        &mut self,
        handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

/// Open link on a [`SpiTransport`]
///
/// Can only be created by [`SpiTransport::open`].
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiLink {
    _private: (),
}

/// SPI transport for the FPGA mux
///
/// Every frame starts with the mux target, followed by the register address
/// with bit 7 set for writes. Data bytes follow in the same transaction; the
/// FPGA auto-increments the address during bursts.
///
/// # Note on Chip Select
///
/// The `SpiDevice` owns the chip select line, so each primitive is exactly
/// one CS-framed transaction.
///
/// ```ignore
/// let spi_device = embedded_hal_bus::spi::ExclusiveDevice::new(spi_bus, cs_pin, delay);
/// let mut fpga = FpgaDriver::new(SpiTransport::new(spi_device));
/// fpga.connect()?;
/// ```
pub struct SpiTransport<SPI> {
    spi: SPI,
}

impl<SPI> SpiTransport<SPI> {
    /// Create a new SPI transport with the given SPI device
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Consume the transport and return the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }
}

const fn read_header(channel: MuxChannel, address: u8) -> [u8; 2] {
    [channel as u8, address & ADDRESS_MASK]
}

const fn write_header(channel: MuxChannel, address: u8) -> [u8; 2] {
    [channel as u8, WRITE_ACCESS | (address & ADDRESS_MASK)]
}

impl<SPI, E> Transport for SpiTransport<SPI>
where
    SPI: SpiDevice<Error = E>,
{
    type Error = E;
    type Handle = SpiLink;

    fn open(&mut self) -> Result<Self::Handle, Self::Error> {
        Ok(SpiLink { _private: () })
    }

    fn close(&mut self, _handle: Self::Handle) {}

    fn read(
        &mut self,
        _handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
    ) -> Result<u8, Self::Error> {
        let header = read_header(channel, address);
        let mut value = [0u8];
        self.spi.transaction(&mut [
            Operation::Write(&header),
            Operation::Read(&mut value),
        ])?;
        Ok(value[0])
    }

    fn write(
        &mut self,
        _handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
        value: u8,
    ) -> Result<(), Self::Error> {
        let [mux, addr] = write_header(channel, address);
        self.spi.write(&[mux, addr, value])
    }

    fn read_burst(
        &mut self,
        _handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
        data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let header = read_header(channel, address);
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(data)])
    }

    fn write_burst(
        &mut self,
        _handle: &mut Self::Handle,
        channel: MuxChannel,
        address: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let header = write_header(channel, address);
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Write(data)])
    }
}
