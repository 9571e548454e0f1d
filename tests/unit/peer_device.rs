//! Unit tests for driving a peer device through a generated register block

use crate::common::{MockError, Operation, create_connected_driver, create_mock_driver};
use device_driver::RegisterInterface;
use lgw_fpga_reg::{Error, MuxChannel};

device_driver::create_device!(
    device_name: Sx1272,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = BE;
        }

        /// RegOpMode - Operating mode (0x01)
        register OpMode {
            const ADDRESS = 0x01;
            const SIZE_BITS = 8;

            /// Transceiver mode
            mode: uint = 0..3,
            reserved_6_3: uint = 3..7,
            /// LoRa mode
            long_range_mode: bool = 7,
        },

        /// RegFrf - RF carrier frequency, MSB first (0x06-0x08)
        register Frf {
            const ADDRESS = 0x06;
            const SIZE_BITS = 24;

            /// Frequency in 61.035 Hz steps
            frf: uint = 0..24,
        },

        /// RegVersion - Silicon revision (0x42)
        register Version {
            const ADDRESS = 0x42;
            const SIZE_BITS = 8;

            /// Version code
            version: uint = 0..8,
        },
    }
);

#[test]
fn test_generated_block_reads_peer_register() {
    let (mut driver, transport) = create_connected_driver();
    transport.set_byte(MuxChannel::Sx1272, 0x42, 0x22);

    let mut radio = Sx1272::new(driver.peer(MuxChannel::Sx1272));
    let version = radio.version().read().unwrap().version();

    assert_eq!(version, 0x22);
    assert_eq!(
        transport.operations(),
        vec![Operation::Read {
            channel: MuxChannel::Sx1272,
            address: 0x42,
            value: 0x22,
        }]
    );
}

#[test]
fn test_generated_block_modifies_peer_register() {
    let (mut driver, transport) = create_connected_driver();
    transport.set_byte(MuxChannel::Sx1272, 0x01, 0b0000_1001);

    let mut radio = Sx1272::new(driver.peer(MuxChannel::Sx1272));
    radio
        .op_mode()
        .modify(|w| {
            w.set_long_range_mode(true);
            w.set_mode(0b101);
        })
        .unwrap();

    assert_eq!(transport.get_byte(MuxChannel::Sx1272, 0x01), 0b1000_1101);
}

#[test]
fn test_generated_block_multi_byte_uses_burst() {
    let (mut driver, transport) = create_connected_driver();

    let mut radio = Sx1272::new(driver.peer(MuxChannel::Sx1272));
    radio.frf().write(|w| w.set_frf(0x00D9_0000)).unwrap();
    let frf = radio.frf().read().unwrap().frf();

    assert_eq!(frf, 0x00D9_0000);
    assert_eq!(
        transport.operations()[0],
        Operation::WriteBurst {
            channel: MuxChannel::Sx1272,
            address: 0x06,
            data: vec![0xD9, 0x00, 0x00],
        }
    );
}

#[test]
fn test_peer_interface_requires_connection() {
    let (mut driver, transport) = create_mock_driver();

    let mut peer = driver.peer(MuxChannel::Sx1272);
    assert_eq!(peer.channel(), MuxChannel::Sx1272);

    let mut data = [0u8; 1];
    assert_eq!(
        peer.read_register(0x42, 8, &mut data),
        Err(Error::NotConnected)
    );
    assert_eq!(
        peer.write_register(0x06, 24, &[0xD9, 0x00, 0x00]),
        Err(Error::NotConnected)
    );
    assert!(transport.operations().is_empty());
}

#[test]
fn test_peer_interface_bus_errors() {
    let (mut driver, transport) = create_connected_driver();
    let mut peer = driver.peer(MuxChannel::Sx1272);

    transport.fail_next_read();
    let mut data = [0u8; 3];
    assert_eq!(
        peer.read_register(0x06, 24, &mut data),
        Err(Error::Bus(MockError::Communication))
    );

    assert_eq!(peer.write_register(0x06, 0, &[]), Err(Error::EmptyBurst));
}
