// Adapters layer: concrete implementations for the external systems the pipeline touches.

pub mod excel;
pub mod mistral;
pub mod output;
