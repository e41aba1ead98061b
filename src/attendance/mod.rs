pub mod evaluator;
pub mod verdict;
pub mod window;

pub use evaluator::{evaluate, DurationMode};
pub use verdict::AttendanceVerdict;
pub use window::ClassWindow;
