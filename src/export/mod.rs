pub mod tsm;

pub use tsm::{ExportSpec, Meta, TsmExporter};
