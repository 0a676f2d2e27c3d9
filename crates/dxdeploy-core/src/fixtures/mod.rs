//! Test fixture seeding.
//!
//! - [`data`]: the declarative fixture graph
//! - [`store`]: traits implemented by fixture databases
//! - [`memory`]: an in-memory store
//! - [`seeder`]: reconciliation of the graph against a store

pub mod data;
pub mod memory;
pub mod seeder;
pub mod store;

pub use data::{
    CollectionFixture, FixtureData, PriceFixture, PropertyValue, PurchaseFixture,
    TableObjectFixture,
};
pub use memory::{FixtureTables, MemoryFixtureStore, MemoryFixtureStoreFactory};
pub use seeder::{SeedReport, seed_fixtures};
pub use store::{FixtureStore, FixtureStoreFactory, FixtureTransaction};
