//! metricgrid-history — bounded in-memory history of dashboard values.
//!
//! Each key (an instance or a service scope) owns an ordered sequence of
//! [`HistoryPoint`]s capped at `max_points`; the oldest points are evicted
//! first. History lives for the process lifetime only.
//!
//! # Concurrency
//!
//! ```text
//! HistoryStore
//!   └── RwLock<HashMap<key, Arc<Mutex<VecDeque<HistoryPoint>>>>>
//!         ├── outer lock: held only to find or create a key's series
//!         └── inner lock: one append or one copy-out at a time per key
//! ```
//!
//! Readers always receive a copy taken under the per-key lock, so a
//! partially appended point is never observable.

pub mod store;

pub use store::{DEFAULT_MAX_POINTS, HistoryPoint, HistoryStore};
