//! Template Renderer.
//!
//! Message templates are `minijinja` templates over a [`RenderContext`].
//! Output keeps template whitespace exactly as written and nothing is
//! HTML-escaped: the result is a plain-text chat message.

use std::fmt::Write as _;

use minijinja::value::Kwargs;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior};

use crate::error::Result;
use crate::model::message::RenderContext;

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "{{ Preface }}\nSubject: {{ Subject }}\n\n{{ Body }}\n{{ Epilogue }}";

/// Default format of the `now()` helper.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TEMPLATE_NAME: &str = "message";

/// A compiled message template.
///
/// Compiling validates the syntax once; [`Renderer::render`] can then be
/// called for any number of messages.
#[derive(Debug)]
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Compile `source`, or [`DEFAULT_TEMPLATE`] when it is `None` or blank.
    pub fn new(source: Option<&str>) -> Result<Self> {
        let source = source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_TEMPLATE);

        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        register_helpers(&mut env);
        env.add_template_owned(TEMPLATE_NAME, source.to_string())?;

        Ok(Self { env })
    }

    /// Render one message.
    pub fn render(&self, ctx: &RenderContext<'_>) -> Result<String> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        Ok(template.render(ctx)?)
    }
}

/// Text helpers on top of the minijinja builtins.
fn register_helpers(env: &mut Environment<'static>) {
    env.add_filter("trunc", trunc);
    env.add_filter("abbrev", abbrev);
    env.add_filter("nospace", nospace);
    env.add_filter("oneline", oneline);
    env.add_function("now", now);
    env.add_function("env", env_var);
}

/// First `n` characters.
fn trunc(value: &str, n: usize) -> String {
    value.chars().take(n).collect()
}

/// Shorten to at most `n` characters, marking the cut with `...`.
fn abbrev(value: &str, n: usize) -> String {
    if value.chars().count() <= n {
        return value.to_string();
    }
    let mut out: String = value.chars().take(n.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn nospace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Replace each run of line breaks with one space.
fn oneline(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_break = false;
    for ch in value.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                out.push(' ');
            }
            in_break = true;
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out
}

/// Local time, formatted with `chrono` `strftime` syntax.
fn now(kwargs: Kwargs) -> std::result::Result<String, Error> {
    let format: Option<&str> = kwargs.get("format")?;
    kwargs.assert_all_used()?;
    let format = format.unwrap_or(DEFAULT_TIME_FORMAT);

    let mut out = String::new();
    write!(out, "{}", chrono::Local::now().format(format)).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid time format {format:?}"),
        )
    })?;
    Ok(out)
}

/// Value of an environment variable, empty when unset.
fn env_var(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}
