//! Document file naming strategies (`documents.naming.strategy`).

use crate::model::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    Uuid,
    #[default]
    Sanitize,
    Slugify,
}

impl NamingStrategy {
    pub fn parse(s: &str) -> Self {
        match s {
            "uuid" => NamingStrategy::Uuid,
            "slugify" => NamingStrategy::Slugify,
            _ => NamingStrategy::Sanitize,
        }
    }

    /// Compute the file stem (without extension) for a finished document.
    pub fn file_stem(self, document: &Document) -> String {
        match self {
            NamingStrategy::Uuid => document.uuid.clone(),
            NamingStrategy::Sanitize => {
                let sanitized = sanitize(&document.name);
                if sanitized.is_empty() {
                    document.uuid.clone()
                } else {
                    sanitized
                }
            }
            NamingStrategy::Slugify => {
                let slug = slugify(&document.name);
                if slug.is_empty() {
                    document.uuid.clone()
                } else {
                    slug
                }
            }
        }
    }
}

/// Disallowed filename characters, stripped rather than replaced.
const DISALLOWED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !DISALLOWED.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn slugify(name: &str) -> String {
    let mut out = String::new();
    let mut last_was_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !out.is_empty() {
            out.push('-');
            last_was_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentState;
    use crate::tenant::TenantId;

    fn doc(name: &str) -> Document {
        Document {
            uuid: "doc-uuid".into(),
            name: name.into(),
            state: DocumentState::Finished,
            template_id: "t".into(),
            format_uuid: "f".into(),
            creator_uuid: None,
            app_uuid: TenantId::null(),
            retrieved_at: None,
            finished_at: None,
            file_name: None,
            content_type: None,
            file_size: None,
            worker_log: None,
        }
    }

    #[test]
    fn uuid_strategy_always_uses_uuid() {
        assert_eq!(NamingStrategy::Uuid.file_stem(&doc("My Report")), "doc-uuid");
    }

    #[test]
    fn sanitize_strips_disallowed_chars() {
        assert_eq!(
            NamingStrategy::Sanitize.file_stem(&doc("a/b:c")),
            "abc"
        );
    }

    #[test]
    fn sanitize_falls_back_to_uuid_when_empty() {
        assert_eq!(NamingStrategy::Sanitize.file_stem(&doc("///")), "doc-uuid");
    }

    #[test]
    fn slugify_produces_ascii_slug() {
        assert_eq!(NamingStrategy::Slugify.file_stem(&doc("My Report v2")), "my-report-v2");
    }

    #[test]
    fn slugify_falls_back_to_uuid_when_empty() {
        assert_eq!(NamingStrategy::Slugify.file_stem(&doc("***")), "doc-uuid");
    }

    #[test]
    fn parse_defaults_to_sanitize() {
        assert_eq!(NamingStrategy::parse("bogus"), NamingStrategy::Sanitize);
        assert_eq!(NamingStrategy::parse("uuid"), NamingStrategy::Uuid);
        assert_eq!(NamingStrategy::parse("slugify"), NamingStrategy::Slugify);
    }
}
