//! Automation flows: graph editing and versioned publication.
//!
//! A flow is a directed graph of typed blocks ([`config::NodeConfig`])
//! edited as a draft through [`editor`] and frozen into immutable
//! snapshots by [`publisher`]. The editor always submits the complete
//! graph; saves are full replacements, and edges referencing nodes missing
//! from the submission are dropped rather than rejected.

pub mod config;
pub mod editor;
pub mod error;
pub mod publisher;

pub use config::{Comparison, EdgeCondition, NodeConfig};
pub use editor::{EdgeInput, GraphView, NodeInput};
pub use error::{FlowError, Result};
