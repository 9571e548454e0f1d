//! Register interface for peer devices behind the FPGA mux
//!
//! Devices such as the SX1272 radio share the SPI link with the FPGA register
//! file but do not use its descriptor table. [`PeerInterface`] borrows an
//! open [`FpgaDriver`] and implements the `device-driver` register interface
//! for one mux channel, so a register block generated with
//! `device_driver::create_device!` can drive the peer directly:
//!
//! ```ignore
//! let mut radio = Sx1272::new(fpga.peer(MuxChannel::Sx1272));
//! let version = radio.version().read()?.version();
//! ```
//!
//! Single-byte accesses go through [`FpgaDriver::raw_read`] and
//! [`FpgaDriver::raw_write`]; wider accesses are one burst on the channel.

use crate::device::FpgaDriver;
use crate::interface::Transport;
use crate::{Error, MuxChannel};
use device_driver::RegisterInterface;

/// `device-driver` register interface bound to one mux channel
pub struct PeerInterface<'a, T: Transport> {
    driver: &'a mut FpgaDriver<T>,
    channel: MuxChannel,
}

impl<'a, T: Transport> PeerInterface<'a, T> {
    pub(crate) fn new(driver: &'a mut FpgaDriver<T>, channel: MuxChannel) -> Self {
        Self { driver, channel }
    }

    /// Mux channel this interface talks to
    pub const fn channel(&self) -> MuxChannel {
        self.channel
    }
}

impl<T: Transport> RegisterInterface for PeerInterface<'_, T> {
    type Error = Error<T::Error>;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        match read_data {
            [] => Err(Error::EmptyBurst),
            [byte] => {
                *byte = self.driver.raw_read(self.channel, address)?;
                Ok(())
            }
            data => {
                let (transport, link) = self.driver.bus()?;
                transport.read_burst(link, self.channel, address, data)?;
                Ok(())
            }
        }
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        _size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        match write_data {
            [] => Err(Error::EmptyBurst),
            [byte] => self.driver.raw_write(self.channel, address, *byte),
            data => {
                let (transport, link) = self.driver.bus()?;
                transport.write_burst(link, self.channel, address, data)?;
                Ok(())
            }
        }
    }
}
