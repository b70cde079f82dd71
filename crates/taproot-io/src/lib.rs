//! File I/O, validation, and serialization for the taproot pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{RunName, SampleId, SampleTable};
pub use error::IoError;
pub use reader::TableReader;
pub use writer::ResultWriter;
