#[cfg(target_arch = "wasm32")]
pub mod browser;

#[cfg(all(feature = "cli", not(target_arch = "wasm32")))]
pub mod cli;
