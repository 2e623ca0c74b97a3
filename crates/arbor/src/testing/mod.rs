/// In-memory console and loop drivers.
pub mod backend;
/// Application harness.
pub mod harness;
/// Widgets for tests.
pub mod widgets;

pub use backend::{FakeDriver, FakeLoop, FakeScreen, fake_backend};
pub use harness::Harness;
