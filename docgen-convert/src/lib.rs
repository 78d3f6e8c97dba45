//! docgen-convert: the subprocess and in-process converter drivers that
//! back the `pandoc`, `wkhtmltopdf` and `rdflib-convert` pipeline steps.

pub mod error;
pub mod pandoc;
pub mod rdf;
mod subprocess;
pub mod wkhtmltopdf;

pub use error::{ConvertError, ConvertResult};
pub use pandoc::{Pandoc, PandocConfig};
pub use rdf::RdfLibConvert;
pub use wkhtmltopdf::{WkHtmlToPdf, WkHtmlToPdfConfig};
