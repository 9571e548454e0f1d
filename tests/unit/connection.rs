//! Unit tests for the connect/disconnect handshake

use crate::common::{
    MockError, MockTransport, Operation, TEST_MAP, create_connected_driver, create_mock_driver, ids,
};
use lgw_fpga_reg::registers::{EXPECTED_FPGA_VERSION, FPGA_CTRL};
use lgw_fpga_reg::{Error, FpgaDriver, Handshake, MuxChannel, RegisterMap};

#[test]
fn test_connect_success() {
    let (mut driver, transport) = create_mock_driver();
    assert!(!driver.is_connected());

    driver.connect().unwrap();

    assert!(driver.is_connected());
    assert_eq!(transport.open_handle_count(), 1);
    assert_eq!(
        transport.operations(),
        vec![
            Operation::Open,
            Operation::Read {
                channel: MuxChannel::FpgaReg,
                address: 0x01,
                value: 18,
            },
        ]
    );
}

#[test]
fn test_connect_open_failure() {
    let (mut driver, transport) = create_mock_driver();
    transport.fail_next_open();

    let result = driver.connect();

    assert_eq!(result, Err(Error::Bus(MockError::OpenFailed)));
    assert!(!driver.is_connected());
    assert!(transport.operations().is_empty());
}

#[test]
fn test_connect_version_read_failure() {
    let (mut driver, transport) = create_mock_driver();
    transport.fail_next_read();

    let result = driver.connect();

    assert_eq!(
        result,
        Err(Error::Handshake(Handshake::Bus(MockError::Communication)))
    );
    assert!(!driver.is_connected());
    assert_eq!(transport.open_handle_count(), 0, "Handle must be closed");
}

#[test]
fn test_connect_floating_bus() {
    for floating in [0x00, 0xFF] {
        let (mut driver, transport) = create_mock_driver();
        transport.set_version(floating);

        let result = driver.connect();

        assert_eq!(
            result,
            Err(Error::Handshake(Handshake::NoDevice(floating))),
            "Version 0x{:02X} should be reported as no device",
            floating
        );
        assert!(!driver.is_connected());
        assert_eq!(transport.open_handle_count(), 0);
    }
}

#[test]
fn test_connect_unexpected_version() {
    let (mut driver, transport) = create_mock_driver();
    transport.set_version(17);

    let result = driver.connect();

    assert_eq!(
        result,
        Err(Error::Handshake(Handshake::UnexpectedVersion {
            expected: EXPECTED_FPGA_VERSION,
            found: 17,
        }))
    );
    assert!(!driver.is_connected());
}

#[test]
fn test_failed_connect_leaves_no_stale_handle() {
    let (mut driver, transport) = create_mock_driver();
    transport.set_version(0x42);
    assert!(driver.connect().is_err());

    // Retry after the device came up: nothing stale to close
    transport.set_version(18);
    transport.clear_operations();
    driver.connect().unwrap();

    let ops = transport.operations();
    assert_eq!(ops[0], Operation::Open, "No close before the new open");
    assert_eq!(transport.close_count(), 0);
    assert_eq!(transport.open_handle_count(), 1);
}

#[test]
fn test_reconnect_closes_previous_link() {
    let (mut driver, transport) = create_connected_driver();

    driver.connect().unwrap();

    let ops = transport.operations();
    assert_eq!(ops[0], Operation::Close);
    assert_eq!(ops[1], Operation::Open);
    assert!(driver.is_connected());
    assert_eq!(transport.open_handle_count(), 1);
}

#[test]
fn test_disconnect() {
    let (mut driver, transport) = create_connected_driver();

    driver.disconnect().unwrap();

    assert!(!driver.is_connected());
    assert_eq!(transport.operations(), vec![Operation::Close]);
    assert_eq!(transport.open_handle_count(), 0);
}

#[test]
fn test_disconnect_when_not_connected() {
    let (mut driver, transport) = create_mock_driver();

    assert_eq!(driver.disconnect(), Err(Error::NotConnected));
    assert!(transport.operations().is_empty());

    // Second disconnect after a real one reports the same condition
    driver.connect().unwrap();
    driver.disconnect().unwrap();
    assert_eq!(driver.disconnect(), Err(Error::NotConnected));
}

#[test]
fn test_operations_require_connection() {
    let (mut driver, transport) = create_mock_driver();

    assert_eq!(driver.read_register(FPGA_CTRL), Err(Error::NotConnected));
    assert_eq!(driver.write_register(FPGA_CTRL, 1), Err(Error::NotConnected));
    assert_eq!(
        driver.raw_read(MuxChannel::Sx1272, 0x42),
        Err(Error::NotConnected)
    );
    assert!(transport.operations().is_empty());
}

#[test]
fn test_release_closes_link() {
    let (driver, transport) = create_connected_driver();

    let _released = driver.release();

    assert_eq!(transport.operations(), vec![Operation::Close]);
    assert_eq!(transport.open_handle_count(), 0);
}

#[test]
fn test_version_register_outside_map() {
    static EMPTY: [lgw_fpga_reg::Descriptor; 0] = [];
    let map = RegisterMap {
        registers: &EMPTY,
        version: 0,
        channel: MuxChannel::FpgaReg,
    };
    let transport = MockTransport::new();
    let mut driver = FpgaDriver::with_map(transport.clone(), map);

    assert_eq!(driver.connect(), Err(Error::InvalidRegisterId(0)));
    assert!(transport.operations().is_empty());
}

#[test]
fn test_register_map_selection() {
    let (driver, _transport) = create_mock_driver();
    assert_eq!(driver.register_map(), &lgw_fpga_reg::FPGA_MAP);
    assert_eq!(driver.register_map().len(), 10);

    let custom = FpgaDriver::with_map(MockTransport::new(), TEST_MAP);
    assert_eq!(custom.register_map().find("WIDE24"), Some(ids::WIDE24));
    assert_eq!(custom.register_map().channel, MuxChannel::FpgaReg);
}
