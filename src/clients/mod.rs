pub mod qbit_engine;
pub mod qbittorrent;

pub use qbit_engine::QBitEngine;
pub use qbittorrent::QBitClient;
