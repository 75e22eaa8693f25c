pub mod catalog;
pub mod chain_reader;
pub mod economy;
pub mod host;
pub mod inventory_reader;
pub mod minigames;
pub mod persistence;
pub mod progress;
pub mod session;
pub mod transactions;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cloud_store;
