//! Common test utilities and mock implementations
#![allow(dead_code)]


pub use mock_transport::{MockError, MockTransport, Operation};
pub use test_utils::{
    TEST_MAP, address_of, create_connected_driver, create_mock_driver, create_test_map_driver, ids,
};
