//! Staff model shared by the demo runner and its integration tests.

pub mod staff;
