pub mod enums;
pub mod report;
pub mod sample;

pub use enums::*;
pub use report::*;
pub use sample::*;
