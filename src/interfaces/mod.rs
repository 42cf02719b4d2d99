pub mod cli;
pub mod surface;
