#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub mod browser;
pub mod environment;
pub mod runtime;
