//! Handlers for individual contract invocations.

pub mod invocation;

pub use invocation::Invoker;
