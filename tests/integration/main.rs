//! Integration tests for the SongSwipe client core
//! These tests wire the real components together over a scripted transport

pub mod test_harness;

pub mod pipeline_test;
pub mod session_test;
pub mod transport_test;
