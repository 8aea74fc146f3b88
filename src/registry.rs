// src/registry.rs
//! Subscription registry: [`SubscriptionRegistry`], [`KvStore`] and backends.

mod registry;
mod store;

pub use registry::Subscriber;
pub use registry::SubscriberSet;
pub use registry::SubscriptionRegistry;
pub use registry::REGISTRY_STORE_KEY;

pub use store::InMemoryKvStore;
pub use store::JsonFileKvStore;
pub use store::KvStore;
pub use store::KvStoreHandle;
pub use store::StoreError;
