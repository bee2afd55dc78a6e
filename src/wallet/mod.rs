pub mod bech32;
pub mod provider;
pub mod session;
