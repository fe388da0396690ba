#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod error;
pub mod family;
pub mod layout;
pub mod version;

pub use error::StageError;
pub use family::RuntimeFamily;
pub use layout::{StageLayout, INSTALL_LAYOUT};
pub use version::RuntimeVersion;
