//! docgen-ledger: the Postgres-backed job ledger and queue listener.
//!
//! Two logical connections, matching the worker's concurrency model: a
//! query connection (`Ledger`) at default isolation, from which each job
//! opens one transaction (`JobTransaction`) covering its skip-locked
//! dequeue through its final delete and commit; and a queue connection
//! (`QueueConnection`/`Listener`) in autocommit mode that serves only the
//! `LISTEN`/`NOTIFY` wake-up channel.

mod connection;
pub mod error;
pub mod ledger;
pub mod queue;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{JobTransaction, Ledger};
pub use queue::{JobProcessor, Listener, QueueConnection};
