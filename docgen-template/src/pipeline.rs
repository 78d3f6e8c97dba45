//! Step Factory & Pipeline (C5): instantiates one `Step` per descriptor
//! and threads a `DocumentFile` through the chain, enforcing the
//! producer-first/transformer-follow invariant and the format seam at
//! every join.

use docgen_core::{DocumentFile, FormatDescriptor};
use serde_json::Value;

use crate::error::{TemplateError, TemplateResult};
use crate::step::{Role, Step, StepEnv};

pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Build one step per descriptor in `format`. A well-formed format
    /// begins with exactly one producer followed by zero or more
    /// transformers; that shape is enforced here rather than left to the
    /// first `execute_first`/`execute_follow` call, so a malformed format
    /// fails fast during preparation.
    pub fn build(format: &FormatDescriptor) -> TemplateResult<Pipeline> {
        if format.steps.is_empty() {
            return Err(TemplateError::EmptyFormat);
        }
        let steps = format
            .steps
            .iter()
            .map(Step::build)
            .collect::<TemplateResult<Vec<_>>>()?;

        if steps[0].role() != Role::Producer {
            return Err(TemplateError::ProducerExpected {
                position: 0,
                name: format.steps[0].name.clone(),
            });
        }
        for (i, step) in steps.iter().enumerate().skip(1) {
            if step.role() != Role::Transformer {
                return Err(TemplateError::TransformerExpected {
                    position: i,
                    name: format.steps[i].name.clone(),
                });
            }
        }

        Ok(Pipeline { steps })
    }

    /// The format's final output format, for limit checks and naming that
    /// need it before execution (e.g. the PDF-allowed gate).
    pub fn output_format(&self) -> Option<docgen_core::FileFormat> {
        self.steps.last().and_then(|s| match s {
            Step::Json => Some(docgen_core::format::JSON),
            Step::Jinja { output_format, .. } => Some(*output_format),
            Step::Pandoc { to, .. } => Some(*to),
            Step::WkHtmlToPdf { .. } => Some(docgen_core::format::PDF),
            Step::RdfConvert { to, .. } => Some(*to),
        })
    }

    /// Run the first step against `context`, then thread the result
    /// through every transformer, checking at each seam that the
    /// incoming format matches what the transformer declares.
    pub async fn execute(&self, context: &Value, env: &StepEnv<'_>) -> TemplateResult<DocumentFile> {
        let mut current = self.steps[0].execute_first(context, env).await?;

        for (i, step) in self.steps.iter().enumerate().skip(1) {
            if let Some(expected) = step.input_format() {
                if expected.name != current.file_format.name {
                    return Err(TemplateError::FormatMismatch {
                        position: i,
                        name: format_step_name(step),
                        expected: expected.name,
                        actual: current.file_format.name,
                    });
                }
            }
            current = step.execute_follow(current, env).await?;
        }

        Ok(current)
    }
}

fn format_step_name(step: &Step) -> &'static str {
    match step {
        Step::Json => "json",
        Step::Jinja { .. } => "jinja",
        Step::Pandoc { .. } => "pandoc",
        Step::WkHtmlToPdf { .. } => "wkhtmltopdf",
        Step::RdfConvert { .. } => "rdflib-convert",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_core::StepDescriptor;
    use std::collections::BTreeMap;

    fn step(name: &str, opts: &[(&str, Value)]) -> StepDescriptor {
        StepDescriptor {
            name: name.to_string(),
            options: opts.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn rejects_empty_format() {
        let format = FormatDescriptor {
            uuid: "f".into(),
            name: "default".into(),
            steps: vec![],
        };
        assert!(matches!(Pipeline::build(&format), Err(TemplateError::EmptyFormat)));
    }

    #[test]
    fn rejects_format_not_starting_with_a_producer() {
        let format = FormatDescriptor {
            uuid: "f".into(),
            name: "default".into(),
            steps: vec![step(
                "pandoc",
                &[("from", Value::from("markdown")), ("to", Value::from("docx"))],
            )],
        };
        assert!(matches!(
            Pipeline::build(&format),
            Err(TemplateError::ProducerExpected { position: 0, .. })
        ));
    }

    #[test]
    fn rejects_a_second_producer_in_follow_position() {
        let format = FormatDescriptor {
            uuid: "f".into(),
            name: "default".into(),
            steps: vec![
                step("json", &[]),
                step("jinja", &[("template", Value::from("x.j2"))]),
            ],
        };
        assert!(matches!(
            Pipeline::build(&format),
            Err(TemplateError::TransformerExpected { position: 1, .. })
        ));
    }

    #[test]
    fn accepts_a_well_formed_chain_and_reports_final_output_format() {
        let format = FormatDescriptor {
            uuid: "f".into(),
            name: "default".into(),
            steps: vec![
                step("jinja", &[("template", Value::from("m.md.j2")), ("extension", Value::from("md")), ("content-type", Value::from("text/markdown"))]),
                step("pandoc", &[("from", Value::from("markdown")), ("to", Value::from("docx"))]),
            ],
        };
        let pipeline = Pipeline::build(&format).unwrap();
        assert_eq!(pipeline.output_format().unwrap().name, "docx");
    }
}
