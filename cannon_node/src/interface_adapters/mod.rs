// Interface adapters: wire protocol, peer connections and LAN discovery.

pub mod discovery;
pub mod net;
pub mod protocol;
pub mod utils;
