pub mod board;
pub mod config;
pub mod errors;
pub mod telemetry;

pub use board::{BoardDb, BoardManager, ManagerHandle, ManagerSettings, Outcome};
pub use errors::{BoardError, Result};
