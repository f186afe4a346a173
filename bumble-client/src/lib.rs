//! bumble-client: keeps an authenticated session to a bumble router alive.
//!
//! Three tasks run side by side:
//!
//! - the [`supervisor`] owns the connect/serve/retry loop,
//! - the [`dispatcher`] turns session events into handler callbacks and
//!   tracks authentication state,
//! - the [`heartbeat`] sends a message to ourselves every tick while
//!   authenticated.
//!
//! [`runtime::Runtime`] wires them together.

pub mod config;
pub mod dispatcher;
pub mod heartbeat;
pub mod runtime;
pub mod state;
pub mod supervisor;
