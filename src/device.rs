//! High-level driver API for the gateway FPGA
//!
//! [`FpgaDriver`] owns the transport and the only open link to the FPGA. It
//! turns named register accesses into byte transactions:
//!
//! - full-byte registers are read and written directly
//! - sub-byte fields are updated with a single read-modify-write
//! - multi-byte registers move in one burst, least-significant byte first
//! - signed fields are sign extended from their top bit on read
//!
//! # Concurrency
//!
//! All operations block until the transport returns. The driver has no
//! internal locking; every access takes `&mut self`, so sharing one driver
//! between threads requires an external mutex. Read-modify-write is not atomic
//! with respect to other bus masters writing the same byte.

use crate::interface::Transport;
use crate::peer::PeerInterface;
use crate::registers::{Descriptor, FPGA_MAP, Layout, RegisterId, RegisterMap};
use crate::{Error, FLOATING_BUS_VALUES, Handshake, MuxChannel};

/// Widest multi-byte register, in bytes
const MAX_REGISTER_BYTES: usize = 4;

/// Main driver for the gateway FPGA register file
pub struct FpgaDriver<T: Transport> {
    transport: T,
    link: Option<T::Handle>,
    map: RegisterMap,
}

impl<T: Transport> FpgaDriver<T> {
    /// Create a driver for the default FPGA register map
    ///
    /// The link stays closed until [`connect`](Self::connect) succeeds.
    pub const fn new(transport: T) -> Self {
        Self::with_map(transport, FPGA_MAP)
    }

    /// Create a driver for a custom register map
    pub const fn with_map(transport: T, map: RegisterMap) -> Self {
        Self {
            transport,
            link: None,
            map,
        }
    }

    /// Register map used by this driver
    pub const fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    /// Whether the link is open
    pub const fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Close the link if open and return the transport
    pub fn release(mut self) -> T {
        if let Some(link) = self.link.take() {
            self.transport.close(link);
        }
        self.transport
    }

    /// Open the link and check the FPGA version
    ///
    /// An already open link is closed first. The version register is read as
    /// one byte and must match its default value; a floating bus (0x00 or
    /// 0xFF) means no FPGA answered. On any failure the link is closed again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The version register id is not in the register map
    /// - The transport cannot be opened ([`Error::Bus`])
    /// - The version check fails ([`Error::Handshake`])
    pub fn connect(&mut self) -> Result<(), Error<T::Error>> {
        let version = self.descriptor(self.map.version)?;

        if let Some(stale) = self.link.take() {
            #[cfg(feature = "defmt")]
            defmt::warn!("FPGA was already connected, closing previous link");
            self.transport.close(stale);
        }

        let mut link = self.transport.open()?;

        match self.check_version(&mut link, &version) {
            Ok(()) => {
                self.link = Some(link);
                #[cfg(feature = "defmt")]
                defmt::info!("Connected to FPGA (version {=i32})", version.default);
                Ok(())
            }
            Err(failure) => {
                self.transport.close(link);
                Err(Error::Handshake(failure))
            }
        }
    }

    fn check_version(
        &mut self,
        link: &mut T::Handle,
        version: &Descriptor,
    ) -> Result<(), Handshake<T::Error>> {
        let found = self
            .transport
            .read(link, self.map.channel, version.address)
            .map_err(Handshake::Bus)?;

        if FLOATING_BUS_VALUES.contains(&found) {
            #[cfg(feature = "defmt")]
            defmt::error!("FPGA seems disconnected (version read {=u8:#x})", found);
            return Err(Handshake::NoDevice(found));
        }

        if i32::from(found) != version.default {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "Unexpected FPGA version {=u8}, expected {=i32}",
                found,
                version.default
            );
            return Err(Handshake::UnexpectedVersion {
                expected: version.default,
                found,
            });
        }

        Ok(())
    }

    /// Close the link
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the link was already closed. This is
    /// informational; the driver state is unchanged.
    pub fn disconnect(&mut self) -> Result<(), Error<T::Error>> {
        if let Some(link) = self.link.take() {
            self.transport.close(link);
            #[cfg(feature = "defmt")]
            defmt::info!("Disconnected from FPGA");
            Ok(())
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!("FPGA was already disconnected");
            Err(Error::NotConnected)
        }
    }

    /// Write a register
    ///
    /// Full-byte registers take the low byte of `value`. Sub-byte fields are
    /// merged into their byte with one read followed by one write, leaving the
    /// other bits untouched. Multi-byte registers are written in one burst of
    /// `ceil(length / 8)` bytes, least-significant first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `id` is not in the register map
    /// - The link is closed
    /// - The register is read-only
    /// - The register layout is unsupported
    /// - Communication with the device fails (a failed read aborts the
    ///   read-modify-write before anything is written)
    pub fn write_register(&mut self, id: RegisterId, value: i32) -> Result<(), Error<T::Error>> {
        let descriptor = self.descriptor(id)?;
        let channel = self.map.channel;
        let (transport, link) = self.bus()?;

        if descriptor.read_only {
            #[cfg(feature = "defmt")]
            defmt::warn!("Write to read-only register {=str} rejected", descriptor.name);
            return Err(Error::ReadOnlyRegister(id));
        }

        let address = descriptor.address;
        let layout = resolve_layout(&descriptor)?;
        match layout {
            Layout::FullByte => {
                transport.write(link, channel, address, value.to_le_bytes()[0])?;
            }
            Layout::SubByte { offset, length } => {
                let current = transport.read(link, channel, address)?;
                let merged = insert_field(current, offset, length, value);
                transport.write(link, channel, address, merged)?;
            }
            Layout::MultiByte { .. } => {
                let bytes = value.to_le_bytes();
                transport.write_burst(link, channel, address, &bytes[..layout.size()])?;
            }
        }

        Ok(())
    }

    /// Read a register
    ///
    /// Signed fields are sign extended from their top bit, unsigned fields
    /// are zero extended. The result is always an `i32`: an unsigned 32-bit
    /// register whose top bit is set reads back negative, and the caller
    /// reinterprets it with `as u32` when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `id` is not in the register map
    /// - The link is closed
    /// - The register layout is unsupported
    /// - Communication with the device fails
    pub fn read_register(&mut self, id: RegisterId) -> Result<i32, Error<T::Error>> {
        let descriptor = self.descriptor(id)?;
        let channel = self.map.channel;
        let (transport, link) = self.bus()?;

        let address = descriptor.address;
        let signed = descriptor.signed;
        let layout = resolve_layout(&descriptor)?;
        let value = match layout {
            Layout::FullByte => {
                let byte = transport.read(link, channel, address)?;
                extract_field(byte, 0, 8, signed)
            }
            Layout::SubByte { offset, length } => {
                let byte = transport.read(link, channel, address)?;
                extract_field(byte, offset, length, signed)
            }
            Layout::MultiByte { length } => {
                let mut buffer = [0u8; MAX_REGISTER_BYTES];
                let bytes = &mut buffer[..layout.size()];
                transport.read_burst(link, channel, address, bytes)?;
                decode_word(bytes, length, signed)
            }
        };

        Ok(value)
    }

    /// Write raw bytes starting at a register's base address
    ///
    /// The register layout is ignored; `data` goes out in one burst. Used for
    /// memory-like regions whose byte structure is opaque to the driver.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `data` is empty
    /// - `id` is not in the register map
    /// - The link is closed
    /// - The register is read-only
    /// - Communication with the device fails
    pub fn write_burst(&mut self, id: RegisterId, data: &[u8]) -> Result<(), Error<T::Error>> {
        if data.is_empty() {
            return Err(Error::EmptyBurst);
        }

        let descriptor = self.descriptor(id)?;
        let channel = self.map.channel;
        let (transport, link) = self.bus()?;

        if descriptor.read_only {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Burst write to read-only register {=str} rejected",
                descriptor.name
            );
            return Err(Error::ReadOnlyRegister(id));
        }

        transport.write_burst(link, channel, descriptor.address, data)?;
        Ok(())
    }

    /// Read raw bytes starting at a register's base address into `data`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `data` is empty
    /// - `id` is not in the register map
    /// - The link is closed
    /// - Communication with the device fails
    pub fn read_burst(&mut self, id: RegisterId, data: &mut [u8]) -> Result<(), Error<T::Error>> {
        if data.is_empty() {
            return Err(Error::EmptyBurst);
        }

        let descriptor = self.descriptor(id)?;
        let channel = self.map.channel;
        let (transport, link) = self.bus()?;

        transport.read_burst(link, channel, descriptor.address, data)?;
        Ok(())
    }

    /// Read `len` raw bytes starting at a register's base address
    ///
    /// # Errors
    ///
    /// Same as [`read_burst`](Self::read_burst), plus
    /// [`Error::BurstTooLong`] when `len` exceeds `N`.
    pub fn read_burst_vec<const N: usize>(
        &mut self,
        id: RegisterId,
        len: usize,
    ) -> Result<heapless::Vec<u8, N>, Error<T::Error>> {
        if len == 0 {
            return Err(Error::EmptyBurst);
        }

        let too_long = Error::BurstTooLong {
            requested: len,
            capacity: N,
        };
        let mut data = heapless::Vec::new();
        if data.resize(len, 0).is_err() {
            return Err(too_long);
        }

        self.read_burst(id, &mut data)?;
        Ok(data)
    }

    /// Write one byte on any mux channel, bypassing the register map
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or communication fails.
    pub fn raw_write(
        &mut self,
        channel: MuxChannel,
        address: u8,
        value: u8,
    ) -> Result<(), Error<T::Error>> {
        let (transport, link) = self.bus()?;
        transport.write(link, channel, address, value)?;
        Ok(())
    }

    /// Read one byte on any mux channel, bypassing the register map
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or communication fails.
    pub fn raw_read(&mut self, channel: MuxChannel, address: u8) -> Result<u8, Error<T::Error>> {
        let (transport, link) = self.bus()?;
        Ok(transport.read(link, channel, address)?)
    }

    /// Write a register of the SX1272 peer radio
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or communication fails.
    pub fn sx1272_write(&mut self, address: u8, value: u8) -> Result<(), Error<T::Error>> {
        self.raw_write(MuxChannel::Sx1272, address, value)
    }

    /// Read a register of the SX1272 peer radio
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or communication fails.
    pub fn sx1272_read(&mut self, address: u8) -> Result<u8, Error<T::Error>> {
        self.raw_read(MuxChannel::Sx1272, address)
    }

    /// Register interface for a peer device on another mux channel
    ///
    /// The returned view implements `device_driver::RegisterInterface`, so
    /// register blocks generated with `device_driver::create_device!` can
    /// drive the peer through this driver's link.
    pub fn peer(&mut self, channel: MuxChannel) -> PeerInterface<'_, T> {
        PeerInterface::new(self, channel)
    }

    /// Transport and open link, or `NotConnected`
    pub(crate) fn bus(&mut self) -> Result<(&mut T, &mut T::Handle), Error<T::Error>> {
        match self.link.as_mut() {
            Some(link) => Ok((&mut self.transport, link)),
            None => Err(Error::NotConnected),
        }
    }

    fn descriptor(&self, id: RegisterId) -> Result<Descriptor, Error<T::Error>> {
        self.map
            .get(id)
            .copied()
            .ok_or(Error::InvalidRegisterId(id))
    }
}

fn resolve_layout<E>(descriptor: &Descriptor) -> Result<Layout, Error<E>> {
    descriptor.layout().ok_or_else(|| {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "Register {=str} has unsupported offset {=u8} / length {=u8}",
            descriptor.name,
            descriptor.offset,
            descriptor.length
        );
        Error::UnsupportedLayout {
            offset: descriptor.offset,
            length: descriptor.length,
        }
    })
}

/// Replace the `length`-bit field at `offset` in `current` with the low bits of `value`
fn insert_field(current: u8, offset: u8, length: u8, value: i32) -> u8 {
    let mask = (u8::MAX >> (8 - length)) << offset;
    let bits = (value.to_le_bytes()[0] << offset) & mask;
    (current & !mask) | bits
}

/// Extract the `length`-bit field at `offset` from `byte`
fn extract_field(byte: u8, offset: u8, length: u8, signed: bool) -> i32 {
    // Left-align the field, dropping the bits above it
    let aligned = byte << (8 - length - offset);
    let shift = 8 - length;
    if signed {
        i32::from(aligned.cast_signed() >> shift)
    } else {
        i32::from(aligned >> shift)
    }
}

/// Assemble least-significant-first `bytes` into a `length`-bit value
fn decode_word(bytes: &[u8], length: u8, signed: bool) -> i32 {
    let word = bytes
        .iter()
        .rev()
        .fold(0u32, |word, &byte| (word << 8) | u32::from(byte));

    if signed {
        // length is 9..=32, so the shift stays in 0..=23
        let shift = 32 - u32::from(length);
        (word << shift).cast_signed() >> shift
    } else {
        word.cast_signed()
    }
}
