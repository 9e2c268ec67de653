pub mod environment;
pub mod runtime;

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub mod browser;
