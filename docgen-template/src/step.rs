//! The tagged-variant step model (§4.5/§9): one enum covering every
//! recognized step name, each declaring which of the two pipeline roles
//! it plays.

use std::collections::BTreeMap;

use docgen_convert::{Pandoc, PandocConfig, RdfLibConvert, WkHtmlToPdf, WkHtmlToPdfConfig};
use docgen_core::{format, DocumentFile, FileFormat, StepDescriptor};
use serde::Serialize;
use serde_json::Value;

use crate::assembler::Workspace;
use crate::environment::build_environment;
use crate::error::{TemplateError, TemplateResult};

/// Which of the two positions a step may be invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Producer,
    Transformer,
}

/// Everything a step needs at construction time beyond its own options:
/// the materialized workspace and the worker-wide converter config.
pub struct StepEnv<'a> {
    pub workspace: &'a Workspace,
    pub composite: &'a docgen_core::TemplateComposite,
    pub pandoc: PandocConfig,
    pub wkhtmltopdf: WkHtmlToPdfConfig,
}

pub enum Step {
    Json,
    Jinja {
        template: String,
        output_format: FileFormat,
    },
    Pandoc {
        from: FileFormat,
        to: FileFormat,
        template_args: String,
    },
    WkHtmlToPdf {
        template_args: String,
    },
    RdfConvert {
        from: FileFormat,
        to: FileFormat,
    },
}

fn string_option(options: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    options.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn required_string(
    name: &str,
    options: &BTreeMap<String, Value>,
    key: &str,
) -> TemplateResult<String> {
    string_option(options, key).ok_or_else(|| TemplateError::MissingOption {
        name: name.to_string(),
        option: key.to_string(),
    })
}

fn resolve_pandoc_format(name: &str, key: &str, allowed: &[FileFormat]) -> TemplateResult<FileFormat> {
    let format = FileFormat::by_name(key).ok_or_else(|| TemplateError::InvalidOption {
        name: name.to_string(),
        option: "from/to".to_string(),
        value: key.to_string(),
    })?;
    if !allowed.contains(&format) {
        return Err(TemplateError::InvalidOption {
            name: name.to_string(),
            option: "from/to".to_string(),
            value: key.to_string(),
        });
    }
    Ok(format)
}

impl Step {
    /// Instantiate one step from its descriptor. Unknown names and
    /// missing/invalid options both fail format preparation
    /// (`TemplateMalformed`).
    pub fn build(descriptor: &StepDescriptor) -> TemplateResult<Step> {
        match descriptor.name.as_str() {
            "json" => Ok(Step::Json),
            "jinja" => {
                let template = required_string("jinja", &descriptor.options, "template")?;
                let content_type =
                    string_option(&descriptor.options, "content-type").unwrap_or_else(|| format::HTML.content_type.to_string());
                let extension = string_option(&descriptor.options, "extension")
                    .unwrap_or_else(|| format::HTML.extension.to_string());
                Ok(Step::Jinja {
                    template,
                    output_format: FileFormat::resolve(&content_type, &extension),
                })
            }
            "pandoc" => {
                let from_tag = required_string("pandoc", &descriptor.options, "from")?;
                let to_tag = required_string("pandoc", &descriptor.options, "to")?;
                let from = resolve_pandoc_format("pandoc", &from_tag, format::PANDOC_INPUT)?;
                let to = resolve_pandoc_format("pandoc", &to_tag, format::PANDOC_OUTPUT)?;
                let template_args = string_option(&descriptor.options, "args").unwrap_or_default();
                Ok(Step::Pandoc {
                    from,
                    to,
                    template_args,
                })
            }
            "wkhtmltopdf" => {
                let template_args = string_option(&descriptor.options, "args").unwrap_or_default();
                Ok(Step::WkHtmlToPdf { template_args })
            }
            "rdflib-convert" => {
                let from_tag = required_string("rdflib-convert", &descriptor.options, "from")?;
                let to_tag = required_string("rdflib-convert", &descriptor.options, "to")?;
                let from = format::rdf_format_by_tag(&from_tag).ok_or_else(|| TemplateError::InvalidOption {
                    name: "rdflib-convert".to_string(),
                    option: "from".to_string(),
                    value: from_tag.clone(),
                })?;
                let to = format::rdf_format_by_tag(&to_tag).ok_or_else(|| TemplateError::InvalidOption {
                    name: "rdflib-convert".to_string(),
                    option: "to".to_string(),
                    value: to_tag.clone(),
                })?;
                Ok(Step::RdfConvert { from, to })
            }
            other => Err(TemplateError::UnknownStep {
                name: other.to_string(),
            }),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Step::Json | Step::Jinja { .. } => Role::Producer,
            Step::Pandoc { .. } | Step::WkHtmlToPdf { .. } | Step::RdfConvert { .. } => {
                Role::Transformer
            }
        }
    }

    /// The input format a transformer expects; `None` for producers.
    pub fn input_format(&self) -> Option<FileFormat> {
        match self {
            Step::Pandoc { from, .. } => Some(*from),
            Step::WkHtmlToPdf { .. } => Some(format::HTML),
            Step::RdfConvert { from, .. } => Some(*from),
            Step::Json | Step::Jinja { .. } => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::Json => "json",
            Step::Jinja { .. } => "jinja",
            Step::Pandoc { .. } => "pandoc",
            Step::WkHtmlToPdf { .. } => "wkhtmltopdf",
            Step::RdfConvert { .. } => "rdflib-convert",
        }
    }

    /// Run a producer step against the job's data context. Fails
    /// (`TransformerExpected`) if this step is actually a transformer.
    pub async fn execute_first(
        &self,
        context: &Value,
        env: &StepEnv<'_>,
    ) -> TemplateResult<DocumentFile> {
        match self {
            Step::Json => {
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(
                    &mut buf,
                    serde_json::ser::PrettyFormatter::with_indent(b"  "),
                );
                sort_keys(context).serialize(&mut ser).map_err(|e| {
                    TemplateError::Render(format!("failed to serialize json step output: {e}"))
                })?;
                Ok(DocumentFile::new(format::JSON, buf))
            }
            Step::Jinja {
                template,
                output_format,
            } => {
                let source = tokio::fs::read_to_string(env.workspace.root().join(template))
                    .await
                    .map_err(TemplateError::Io)?;
                let jinja_env = build_environment(env.workspace, env.composite);
                let rendered = jinja_env
                    .render_str(&source, minijinja::context! { ctx => context })
                    .map_err(|e| TemplateError::Render(e.to_string()))?;
                Ok(DocumentFile::new(*output_format, rendered.into_bytes()))
            }
            _ => Err(TemplateError::TransformerExpected {
                position: 0,
                name: self.name().to_string(),
            }),
        }
    }

    /// Run a transformer step against the prior step's output. Fails
    /// (`ProducerExpected`) if this step is actually a producer; the
    /// pipeline checks the input-format seam itself before calling this.
    pub async fn execute_follow(
        &self,
        input: DocumentFile,
        env: &StepEnv<'_>,
    ) -> TemplateResult<DocumentFile> {
        match self {
            Step::Pandoc {
                from,
                to,
                template_args,
            } => {
                let pandoc = Pandoc::new(env.pandoc.clone());
                let bytes = pandoc
                    .convert(*from, *to, template_args, env.workspace.root(), &input.content)
                    .await?;
                Ok(DocumentFile::new(*to, bytes))
            }
            Step::WkHtmlToPdf { template_args } => {
                let driver = WkHtmlToPdf::new(env.wkhtmltopdf.clone());
                let bytes = driver
                    .convert(template_args, env.workspace.root(), &input.content)
                    .await?;
                Ok(DocumentFile::new(format::PDF, bytes))
            }
            Step::RdfConvert { from, to } => {
                let bytes = RdfLibConvert::convert(*from, *to, &input.content)?;
                Ok(DocumentFile::new(*to, bytes))
            }
            Step::Json | Step::Jinja { .. } => Err(TemplateError::ProducerExpected {
                position: 0,
                name: self.name().to_string(),
            }),
        }
    }
}

/// Recursively sort object keys so the `json` step's output is
/// byte-stable (serde_json's `Map` preserves insertion order unless the
/// `preserve_order` feature pulls in a `BTreeMap`-backed map; we sort
/// explicitly so this doesn't depend on a feature flag).
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_core::StepDescriptor;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn descriptor(name: &str, options: BTreeMap<String, Value>) -> StepDescriptor {
        StepDescriptor {
            name: name.to_string(),
            options,
        }
    }

    #[test]
    fn unknown_step_name_is_rejected() {
        let err = Step::build(&descriptor("nope", BTreeMap::new())).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownStep { .. }));
    }

    #[test]
    fn jinja_requires_template_option() {
        let err = Step::build(&descriptor("jinja", BTreeMap::new())).unwrap_err();
        assert!(matches!(err, TemplateError::MissingOption { .. }));
    }

    #[test]
    fn pandoc_rejects_formats_outside_the_allowed_sets() {
        let mut opts = BTreeMap::new();
        opts.insert("from".to_string(), json!("pdf"));
        opts.insert("to".to_string(), json!("docx"));
        let err = Step::build(&descriptor("pandoc", opts)).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidOption { .. }));
    }

    #[test]
    fn rdflib_convert_accepts_nt_alias() {
        let mut opts = BTreeMap::new();
        opts.insert("from".to_string(), json!("nt"));
        opts.insert("to".to_string(), json!("turtle"));
        let step = Step::build(&descriptor("rdflib-convert", opts)).unwrap();
        assert_eq!(step.role(), Role::Transformer);
    }

    #[tokio::test]
    async fn json_producer_output_is_sorted_and_indented() {
        let step = Step::build(&descriptor("json", BTreeMap::new())).unwrap();
        let workspace_dir = std::env::temp_dir().join(format!("docgen-step-test-{}", std::process::id()));
        std::fs::create_dir_all(&workspace_dir).unwrap();
        let workspace = crate::assembler::Workspace {
            root: workspace_dir.clone(),
            template_id: "t".to_string(),
        };
        let composite = docgen_core::TemplateComposite {
            template: docgen_core::Template {
                id: "t".into(),
                metamodel_version: 1,
                formats: vec![],
            },
            files: vec![],
            assets: vec![],
        };
        let env = StepEnv {
            workspace: &workspace,
            composite: &composite,
            pandoc: PandocConfig {
                executable: "pandoc".into(),
                args: String::new(),
                timeout: None,
            },
            wkhtmltopdf: WkHtmlToPdfConfig {
                executable: "wkhtmltopdf".into(),
                args: String::new(),
                timeout: None,
            },
        };
        let out = step.execute_first(&json!({"b": 2, "a": 1}), &env).await.unwrap();
        assert_eq!(
            String::from_utf8(out.content).unwrap(),
            "{\n  \"a\": 1,\n  \"b\": 2\n}"
        );
        std::fs::remove_dir_all(&workspace_dir).ok();
    }
}
