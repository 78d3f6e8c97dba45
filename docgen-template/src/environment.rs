//! Wires the closed filter/test set (§4.7) plus the `asset_path` /
//! `assets` lookups into a `minijinja::Environment` built fresh for one
//! job's render.

use std::path::PathBuf;

use base64::Engine;
use docgen_core::TemplateComposite;
use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind};

use crate::assembler::Workspace;
use crate::filters;

fn to_minijinja_err(detail: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidOperation, detail.to_string())
}

/// Build an environment scoped to one job's workspace and template
/// composite. Assets are read straight off disk since `assembler::materialize`
/// has already downloaded them into the workspace by the time any step runs.
pub fn build_environment(workspace: &Workspace, composite: &TemplateComposite) -> Environment<'static> {
    let mut env = Environment::new();

    env.add_filter("datetime_format", |iso: Option<String>, fmt: String| {
        filters::datetime_format(iso.as_deref(), &fmt)
    });
    env.add_filter("extract", |obj: Value, keys: Vec<String>| -> Value {
        let json = value_to_json(&obj);
        let extracted = filters::extract(&json, &keys);
        Value::from_serialize(&extracted)
    });
    env.add_filter("of_alphabet", |n: i64| filters::of_alphabet(n));
    env.add_filter("roman", |n: i64| filters::roman(n));
    env.add_filter("markdown", |text: Option<String>| -> Value {
        Value::from_safe_string(filters::markdown(text.as_deref()))
    });
    env.add_filter("xmarkdown", |text: Option<String>| -> Value {
        Value::from_safe_string(filters::markdown(text.as_deref()))
    });
    env.add_filter("dot", |text: String| filters::dot(&text));
    env.add_filter("reply_path", |uuids: Vec<String>| filters::reply_path(&uuids));
    env.add_filter("reply_str_value", |reply: Value| {
        filters::reply_str_value(&value_to_json(&reply))
    });
    env.add_filter("reply_int_value", |reply: Value| {
        filters::reply_int_value(&value_to_json(&reply))
    });
    env.add_filter("reply_float_value", |reply: Value| {
        filters::reply_float_value(&value_to_json(&reply))
    });
    env.add_filter("reply_items", |reply: Value| -> Value {
        Value::from_serialize(&filters::reply_items(&value_to_json(&reply)))
    });
    env.add_filter(
        "find_reply",
        |replies: Value, path: String, xtype: Option<String>| -> Value {
            let replies_json = value_to_json(&replies);
            match filters::find_reply(&replies_json, &path, xtype.as_deref().unwrap_or("string")) {
                Some(v) => Value::from_serialize(&v),
                None => Value::from(()),
            }
        },
    );
    env.add_test("not_empty", |x: Value| filters::not_empty(&value_to_json(&x)));

    let root = workspace.root().to_path_buf();
    env.add_function("asset_path", move |file_name: String| -> Result<String, Error> {
        let path: PathBuf = root.join(&file_name);
        Ok(path.to_string_lossy().into_owned())
    });

    // `assets(file_name)`: the bytes+content-type lookup the original binds
    // as `assets=asset_fetcher`, embedded here as a data URI since steps
    // render straight to text.
    let root_for_uri = workspace.root().to_path_buf();
    let template_assets = composite.assets.clone();
    env.add_function("assets", move |file_name: String| -> Result<String, Error> {
        let Some(asset) = template_assets.iter().find(|a| a.file_name == file_name) else {
            return Ok(String::new());
        };
        let bytes = std::fs::read(root_for_uri.join(&file_name)).map_err(to_minijinja_err)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(format!("data:{};base64,{}", asset.content_type, encoded))
    });

    env
}

fn value_to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_core::{FormatDescriptor, Template};

    fn empty_composite() -> TemplateComposite {
        TemplateComposite {
            template: Template {
                id: "org:coord:v1".into(),
                metamodel_version: 1,
                formats: vec![FormatDescriptor {
                    uuid: "f".into(),
                    name: "default".into(),
                    steps: vec![],
                }],
            },
            files: vec![],
            assets: vec![],
        }
    }

    #[test]
    fn renders_with_injected_filters() {
        let tmp = tempfile_workspace();
        let composite = empty_composite();
        let workspace = Workspace {
            root: tmp.clone(),
            template_id: "org:coord:v1".to_string(),
        };
        let env = build_environment(&workspace, &composite);
        let rendered = env
            .render_str("{{ n | roman }}-{{ n | of_alphabet }}", minijinja::context! { n => 26 })
            .unwrap();
        assert_eq!(rendered, "XXVI-aa");
        std::fs::remove_dir_all(&tmp).ok();
    }

    fn tempfile_workspace() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("docgen-env-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
