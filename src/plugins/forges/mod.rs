//! Built-in forges.

mod dummy;

pub use dummy::{DUMMY_PR_URL, DummyForge};
