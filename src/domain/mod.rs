// Signal and trend types produced by the analysis engine
pub mod analysis;

// Market data domain
pub mod market;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
