pub mod gas;
pub mod nonce_manager;
pub mod rpc_client;

pub use gas::*;
pub use nonce_manager::*;
pub use rpc_client::*;
