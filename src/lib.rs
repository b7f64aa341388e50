#![doc = include_str!("RUSTDOC.md")]

pub mod logger;
pub mod platform;
pub mod tracker;
pub mod util;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
