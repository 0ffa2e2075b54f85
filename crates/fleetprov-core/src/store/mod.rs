// ── State store ──
//
// The only shared mutable state of a run: created resources keyed by
// logical name, persisted between runs.

mod record;
mod state_store;

pub use record::ResourceRecord;
pub use state_store::{StateStore, WriteClaim};
