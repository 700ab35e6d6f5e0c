//! metricgrid-exposition — the line-oriented metrics text format.
//!
//! Parsing is tolerant: a payload never fails to parse, lines that cannot
//! be interpreted are dropped. Values stay as raw tokens so consumers decide
//! how to read them.
//!
//! # Architecture
//!
//! ```text
//! parse(payload) → Snapshot
//!   ├── "# HELP" / "# TYPE" → metadata merge
//!   ├── other "#" lines     → ignored
//!   └── sample lines        → name, labels (state machine), value, timestamp
//!
//! render_scrape_metrics(reports) → exposition text for the scraper itself
//! ```

pub mod labels;
pub mod parser;
pub mod render;

pub use parser::{parse, parse_at};
pub use render::render_scrape_metrics;
