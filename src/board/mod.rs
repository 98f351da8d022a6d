pub mod changes;
pub mod db;
pub mod export;
pub mod handle;
pub mod history;
pub mod manager;

pub use changes::ChangeFeed;
pub use db::{BoardDb, StoreTx};
pub use export::BoardExport;
pub use handle::ManagerHandle;
pub use history::{DbHistory, HistoryRecorder, NoHistory};
pub use manager::{BoardManager, ManagerSettings, Outcome};
