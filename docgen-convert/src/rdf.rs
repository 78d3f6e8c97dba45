//! In-process RDF graph parse+serialize, no subprocess. Backed by oxigraph
//! rather than the reference worker's `rdflib`, since that is the RDF
//! crate this codebase's dependency stack already reaches for.

use docgen_core::FileFormat;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};

use crate::error::{ConvertError, ConvertResult};

fn oxigraph_format(tag: &str) -> ConvertResult<RdfFormat> {
    match tag {
        "rdf-xml" => Ok(RdfFormat::RdfXml),
        "n3" => Ok(RdfFormat::N3),
        "ntriples" => Ok(RdfFormat::NTriples),
        "turtle" => Ok(RdfFormat::Turtle),
        "trig" => Ok(RdfFormat::TriG),
        // oxigraph has no native JSON-LD codec; rather than bolt on a
        // second RDF stack just for this one tag, we decline rather than
        // silently lose named-graph/context fidelity.
        "jsonld" => Err(ConvertError::Rdf {
            detail: "JSON-LD is not supported by the in-process RDF converter".to_string(),
        }),
        other => Err(ConvertError::Rdf {
            detail: format!("unsupported RDF format tag: {other}"),
        }),
    }
}

pub struct RdfLibConvert;

impl RdfLibConvert {
    /// Parse `data` as `from.name` and re-serialize it as `to.name`.
    pub fn convert(from: FileFormat, to: FileFormat, data: &[u8]) -> ConvertResult<Vec<u8>> {
        let src_format = oxigraph_format(from.name)?;
        let dst_format = oxigraph_format(to.name)?;

        let quads: Vec<_> = RdfParser::from_format(src_format)
            .for_reader(data)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConvertError::Rdf {
                detail: format!("failed to parse {}: {e}", from.name),
            })?;

        let mut serializer = RdfSerializer::from_format(dst_format).for_writer(Vec::new());
        for quad in &quads {
            serializer
                .serialize_quad(quad.as_ref())
                .map_err(|e| ConvertError::Rdf {
                    detail: format!("failed to serialize {}: {e}", to.name),
                })?;
        }
        serializer.finish().map_err(|e| ConvertError::Rdf {
            detail: format!("failed to finish serializing {}: {e}", to.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_core::format::{NTRIPLES, TURTLE};

    #[test]
    fn round_trips_a_single_triple_between_ntriples_and_turtle() {
        let ntriples = b"<http://example.com/s> <http://example.com/p> \"o\" .\n";
        let turtle = RdfLibConvert::convert(NTRIPLES, TURTLE, ntriples).unwrap();
        assert!(!turtle.is_empty());
    }

    #[test]
    fn jsonld_is_declined_rather_than_silently_lossy() {
        let err = oxigraph_format("jsonld").unwrap_err();
        assert!(matches!(err, ConvertError::Rdf { .. }));
    }
}
