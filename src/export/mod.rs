//! Output projections of the (merged) primary document.

pub mod csv;
pub mod gml;

pub use self::csv::{CsvTable, project_csv, to_csv_string};
pub use self::gml::write_gml;
