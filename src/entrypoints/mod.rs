// Shared modules
mod cli;
mod logging;
mod run;

// Entry point
pub use run::main;
