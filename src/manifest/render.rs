//! Renders Jinja expressions found in manifest string values.
use super::ManifestValue;
use anyhow::{Context, Result};
use minijinja::Environment;

/// Whether `text` contains Jinja syntax worth rendering.
fn has_template(text: &str) -> bool {
    text.contains("{{") || text.contains("{%") || text.contains("{#")
}

/// Render every templated string inside `value` in place.
///
/// Mapping keys are left as written. `path` names the node for error
/// context; pass `""` for the document root.
///
/// # Errors
///
/// Returns an error naming the offending node when a template fails to
/// render.
pub fn render_value(value: &mut ManifestValue, env: &Environment, path: &str) -> Result<()> {
    match value {
        ManifestValue::String(text) if has_template(text) => {
            let rendered = env
                .render_str(text, ())
                .with_context(|| format!("render {}", display_path(path)))?;
            tracing::debug!(path = %display_path(path), "rendered template value");
            *text = rendered;
        }
        ManifestValue::Array(items) => {
            for (idx, item) in items.iter_mut().enumerate() {
                render_value(item, env, &format!("{path}[{idx}]"))?;
            }
        }
        ManifestValue::Object(map) => {
            for (key, item) in map.iter_mut() {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                render_value(item, env, &child)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "manifest" } else { path }
}
