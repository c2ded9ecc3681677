//! # ethcore Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── benchmarks/       # Performance tests per crate
//!     ├── qc_01_peer_discovery.rs
//!     ├── qc_02_block_storage.rs
//!     └── ...
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo bench -p ethcore-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod benchmarks;
