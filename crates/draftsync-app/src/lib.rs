// Orchestration layer: owns the board and the connection, and serializes
// every mutation through one event loop.

pub mod app;
