pub mod keys;
pub mod payloads;
pub mod secret_cracker;
pub mod trust_store;
pub mod utils;
