//! Thin Jinja-style template rendering for prompt bodies, built on
//! `minijinja`, here used for prompt text instead of HTML templates.

use articlesmith_core::{Error, Result};
use minijinja::Environment;
use serde::Serialize;

/// Render `template` (a literal prompt body, not a file) against any
/// serializable context record — minijinja accepts a plain `Serialize`
/// value as a template context directly, so every chain just passes its
/// own typed input struct.
///
/// A fresh single-template [`Environment`] is built per call: prompt
/// templates are small and this runs once per chain invocation, so the
/// simplicity of not threading a shared environment through every chain
/// outweighs the reuse it would save.
pub fn render(template: &str, ctx: impl Serialize) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("prompt", template)
        .map_err(|e| Error::Internal(format!("invalid prompt template: {e}")))?;
    let tmpl = env
        .get_template("prompt")
        .map_err(|e| Error::Internal(format!("missing prompt template: {e}")))?;
    tmpl.render(ctx)
        .map_err(|e| Error::Internal(format!("prompt render failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct NameCtx<'a> {
        name: &'a str,
    }

    #[derive(Serialize)]
    struct ItemsCtx {
        items: Vec<&'static str>,
    }

    #[test]
    fn renders_simple_variable_substitution() {
        let out = render("hello {{ name }}", NameCtx { name: "world" }).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn renders_loops_over_lists() {
        let out = render(
            "{% for item in items %}{{ item }},{% endfor %}",
            ItemsCtx { items: vec!["a", "b", "c"] },
        )
        .unwrap();
        assert_eq!(out, "a,b,c,");
    }
}
