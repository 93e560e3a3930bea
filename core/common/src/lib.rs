//! Common utilities and types shared across burnlink crates.
//!
//! This module provides the workspace-wide error taxonomy and the
//! sensitive-value wrappers used for passcodes and decrypted content.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Passcode, SensitiveBytes};
