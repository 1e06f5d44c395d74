// binfronts/src/classify/mod.rs

mod input;
mod subprocess;
mod traits;

pub use input::ClassifierInput;
pub use subprocess::SubprocessClassifier;
pub use traits::{classify_checked, ClassificationResult, FrontClassifier};

pub const FRONT: i32 = 1;
pub const NO_FRONT: i32 = 0;
