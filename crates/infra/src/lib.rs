//! Infrastructure layer: adapters for the merchant ports.

pub mod backend;
pub mod in_memory;

pub use backend::InMemoryBackend;
pub use in_memory::{
    InMemoryAccountStore, InMemoryCatalog, InMemoryMemberGateway, InMemoryMerchantRepository,
    StaticValueRegistry,
};

mod integration_tests;
