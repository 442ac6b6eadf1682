pub mod hit_test;
pub mod index;
pub mod selection;

pub use hit_test::{HitTester, SelectionResult};
pub use index::{SpatialIndex, SpatialItem};
pub use selection::{SelectionArea, SelectionShape};
