//! agentwatch-client: async side of the streaming monitor client.
//! WebSocket transport driver, TTL clear scheduler, the owned shared
//! state container, and the terminal viewer commands.

pub mod cli;
pub mod cmd_tail;
pub mod cmd_watch;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod transport;
