pub mod step;

pub use step::CompletedStep;
