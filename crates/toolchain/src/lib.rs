//! Android Toolchain Location
//!
//! Layered configuration lookup plus paths to the external tools the
//! pipeline invokes (resource packager, bytecode converter, aligner,
//! signer, native toolchain, device tool).

pub mod ndk;
pub mod resolver;
pub mod sdk;

pub use ndk::{Abi, ArchVariant, NdkToolchain};
pub use resolver::{ConfigurationError, ConfigurationResolver};
pub use sdk::SdkTools;

/// Required configuration keys
pub mod keys {
    pub const ANDROID_SDK: &str = "ANDROID_SDK";
    pub const ANDROID_NDK: &str = "ANDROID_NDK";
    pub const ANDROID_KEY_STORE: &str = "ANDROID_KEY_STORE";
    pub const ANDROID_KEY_NAME: &str = "ANDROID_KEY_NAME";
}
