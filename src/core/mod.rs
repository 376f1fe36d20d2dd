//! Runtime core: the bus facade, dispatch loop, and retry executor.
//!
//! The only public API from this module is [`Bus`]. Internal modules:
//! - [`dispatcher`]: single consumer loop draining the priority queue;
//! - [`delivery`]: one (subscriber, envelope) delivery with retry/backoff.
//!
//! ## System wiring
//! ```text
//! Publishers (many):                                      Subscribers:
//!   orchestrator ──┐
//!   triggers     ──┼─ publish ──► DispatchQueue           MemoryAdapter
//!   tools        ──┘             (priority, FIFO)         LogSubscriber
//!                                       │                 custom ...
//!                                       ▼                      ▲
//!                              Dispatcher::run()               │
//!                                       │ snapshot(topic)      │
//!                                       ▼                      │
//!                        one tracked delivery per subscriber ──┘
//!                        (retry + backoff, panic-isolated)
//!
//! Shutdown path:
//!   stop():     intake closed, loop halts, in-flight deliveries finish
//!   shutdown(): intake closed, queue drained, all deliveries awaited
//! ```

mod bus;
mod delivery;
mod dispatcher;

pub use bus::Bus;
