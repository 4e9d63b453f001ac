//! Fault and reporting primitives for the Strand sequence toolkit.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fault taxonomy raised by the allocation layer, the channel
//! through which faults abort normal control flow, and the sink
//! abstraction for diagnostic output.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fault;
pub mod report;

pub use fault::{AbortChannel, FailurePolicy, Fault, FaultChannel, PanicChannel};
pub use report::{BufferSink, ReportLevel, ReportSink, StderrSink};
