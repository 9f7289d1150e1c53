//! ABI directories the host process can execute.
//!
//! Package archives store native libraries under `lib/<abi>/`. The lists below
//! use the Android ABI directory names, most preferred first, so a 64-bit
//! process falls back to the 32-bit build of the same family when the
//! archive ships nothing better.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")]{
        pub const SUPPORTED_ABIS: &[&str] = &["arm64-v8a", "armeabi-v7a", "armeabi"];
    }else if #[cfg(target_arch = "arm")]{
        pub const SUPPORTED_ABIS: &[&str] = &["armeabi-v7a", "armeabi"];
    }else if #[cfg(target_arch = "x86_64")]{
        pub const SUPPORTED_ABIS: &[&str] = &["x86_64", "x86"];
    }else if #[cfg(target_arch = "x86")]{
        pub const SUPPORTED_ABIS: &[&str] = &["x86"];
    }else if #[cfg(target_arch = "riscv64")]{
        pub const SUPPORTED_ABIS: &[&str] = &["riscv64"];
    }else if #[cfg(target_arch = "loongarch64")]{
        pub const SUPPORTED_ABIS: &[&str] = &["loongarch64"];
    }else {
        pub const SUPPORTED_ABIS: &[&str] = &[];
    }
}

/// The ABI priority list as owned strings.
#[inline]
pub fn supported_abis() -> Vec<String> {
    SUPPORTED_ABIS.iter().map(|abi| abi.to_string()).collect()
}
