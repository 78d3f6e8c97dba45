//! The closed `FileFormat` table: canonical name -> (content type, extension).

/// A file format known to the pipeline: a canonical name plus the
/// content-type and extension it is stored/served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileFormat {
    pub name: &'static str,
    pub content_type: &'static str,
    pub extension: &'static str,
}

macro_rules! formats {
    ($($ident:ident => ($name:literal, $ct:literal, $ext:literal)),* $(,)?) => {
        $(
            pub const $ident: FileFormat = FileFormat { name: $name, content_type: $ct, extension: $ext };
        )*

        const ALL: &[FileFormat] = &[$($ident),*];
    };
}

formats! {
    JSON => ("json", "application/json", "json"),
    HTML => ("html", "text/html", "html"),
    PDF => ("pdf", "application/pdf", "pdf"),
    DOCX => ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document", "docx"),
    MARKDOWN => ("markdown", "text/markdown", "md"),
    ODT => ("odt", "application/vnd.oasis.opendocument.text", "odt"),
    RST => ("rst", "text/x-rst", "rst"),
    LATEX => ("latex", "application/x-latex", "tex"),
    EPUB => ("epub", "application/epub+zip", "epub"),
    DOCBOOK4 => ("docbook4", "application/docbook+xml", "xml"),
    DOCBOOK5 => ("docbook5", "application/docbook+xml", "xml"),
    PPTX => ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation", "pptx"),
    RTF => ("rtf", "application/rtf", "rtf"),
    ASCIIDOC => ("asciidoc", "text/asciidoc", "adoc"),
    RDF_XML => ("rdf-xml", "application/rdf+xml", "rdf"),
    N3 => ("n3", "text/n3", "n3"),
    NTRIPLES => ("ntriples", "application/n-triples", "nt"),
    TURTLE => ("turtle", "text/turtle", "ttl"),
    TRIG => ("trig", "application/trig", "trig"),
    JSONLD => ("jsonld", "application/ld+json", "jsonld"),
}

impl FileFormat {
    /// Look up a format by its canonical name. Returns `None` for unknown
    /// names so callers can raise `TemplateMalformed`.
    pub fn by_name(name: &str) -> Option<FileFormat> {
        ALL.iter().copied().find(|f| f.name == name)
    }

    /// Resolve a `jinja` step's declared `content-type`/`extension` pair
    /// against the closed table; template authors almost always declare
    /// one of the canonical pairs (the jinja step's defaults are HTML's),
    /// but a template is free to declare an arbitrary content-type for a
    /// root file that is never fed to a downstream converter. Those rare
    /// custom pairs are leaked for the process lifetime rather than
    /// threading a lifetime through every `DocumentFile`.
    pub fn resolve(content_type: &str, extension: &str) -> FileFormat {
        if let Some(f) = ALL.iter().copied().find(|f| f.content_type == content_type) {
            return f;
        }
        if let Some(f) = ALL.iter().copied().find(|f| f.extension == extension) {
            return f;
        }
        FileFormat {
            name: Box::leak(extension.to_string().into_boxed_str()),
            content_type: Box::leak(content_type.to_string().into_boxed_str()),
            extension: Box::leak(extension.to_string().into_boxed_str()),
        }
    }
}

/// Pandoc's accepted input formats.
pub const PANDOC_INPUT: &[FileFormat] = &[DOCX, EPUB, HTML, LATEX, MARKDOWN, ODT, RST];

/// Pandoc's accepted output formats (superset of its inputs).
pub const PANDOC_OUTPUT: &[FileFormat] = &[
    DOCX, EPUB, HTML, LATEX, MARKDOWN, ODT, RST, ASCIIDOC, DOCBOOK4, DOCBOOK5, RTF,
];

/// Formats handled by the in-process RDF graph converter.
pub const RDF_FORMATS: &[FileFormat] = &[RDF_XML, N3, NTRIPLES, TURTLE, TRIG, JSONLD];

/// Resolve an RDF format tag, accepting both `nt` and `ntriples` as aliases
/// for N-Triples (source revisions disagree on which is canonical).
pub fn rdf_format_by_tag(tag: &str) -> Option<FileFormat> {
    match tag {
        "nt" | "ntriples" => Some(NTRIPLES),
        other => RDF_FORMATS.iter().copied().find(|f| f.name == other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_formats() {
        assert_eq!(FileFormat::by_name("pdf"), Some(PDF));
        assert_eq!(FileFormat::by_name("docx").unwrap().extension, "docx");
        assert_eq!(FileFormat::by_name("nope"), None);
    }

    #[test]
    fn accepts_both_ntriples_aliases() {
        assert_eq!(rdf_format_by_tag("nt"), Some(NTRIPLES));
        assert_eq!(rdf_format_by_tag("ntriples"), Some(NTRIPLES));
    }

    #[test]
    fn pandoc_output_is_superset_of_input() {
        for f in PANDOC_INPUT {
            assert!(PANDOC_OUTPUT.contains(f));
        }
    }

    #[test]
    fn resolve_matches_by_content_type_then_extension() {
        assert_eq!(FileFormat::resolve("text/markdown", "md"), MARKDOWN);
        assert_eq!(FileFormat::resolve("application/unknown", "md"), MARKDOWN);
    }

    #[test]
    fn resolve_falls_back_to_a_leaked_custom_pair() {
        let custom = FileFormat::resolve("application/x-custom-report", "xrep");
        assert_eq!(custom.content_type, "application/x-custom-report");
        assert_eq!(custom.extension, "xrep");
        assert_eq!(custom.name, "xrep");
    }
}
