// Interface adapters: wire protocol, network handling, persistence and map files.

pub mod http;
pub mod maps;
pub mod net;
pub mod protocol;
pub mod state;
pub mod store;
pub mod utils;
