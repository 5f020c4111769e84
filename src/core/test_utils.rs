//! Test utilities for filesystem-backed tests.
//!
//! Pipeline stages read and write real files, so unit tests run inside a
//! scratch directory that is removed when the fixture is dropped.
