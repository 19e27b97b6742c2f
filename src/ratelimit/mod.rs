//! Rate limiting logic and state management.

mod backend;
mod clock;
mod counter;
mod decision;
mod distributed;
mod identifier;
mod key;
mod limiter;
mod local;
mod policy;
mod sweeper;

pub use backend::{CounterStore, StoreKind};
pub use clock::{Clock, MockClock, SystemClock};
pub use counter::CounterEntry;
pub use decision::Decision;
pub use distributed::{RedisStore, RedisStoreConfig};
pub use identifier::{resolve_identifier, FORWARDED_FOR, REAL_IP, UNKNOWN_IDENTIFIER};
pub use key::CounterKey;
pub use limiter::RateLimiter;
pub use local::LocalStore;
pub use policy::{FailurePolicy, PolicyCatalogue, RateLimitConfig, Tier};
pub use sweeper::{sweep_once, CounterTable, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
