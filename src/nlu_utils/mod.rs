//! Text processing primitives shared by every stage of the pipeline

pub mod range;
pub mod string;
pub mod token;
