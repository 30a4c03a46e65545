//! `.lua-eval "<script>" [args...]` and `.lua-eval-file <path-or-url> [args...]`

use std::io::Write;

use super::CommandSpec;
use crate::error::{CLIError, Result};
use crate::lexer::{split_args, take_quoted};
use crate::scripting::source::load_script;
use crate::session::SessionContext;

/// Split `"<script>" args...` into the script body and its arguments
fn parse_inline(spec: &CommandSpec, rest: &str) -> Result<(String, Vec<String>)> {
    let (script, remainder) = take_quoted(rest).ok_or_else(|| CLIError::usage(spec.usage))?;
    Ok((script, split_args(remainder)?))
}

pub(super) fn eval(
    ctx: &mut SessionContext,
    spec: &CommandSpec,
    rest: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let (script, args) = parse_inline(spec, rest)?;
    ctx.scripts.run("=lua-eval", &script, &args, out)
}

pub(super) async fn eval_file(
    ctx: &mut SessionContext,
    spec: &CommandSpec,
    rest: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let mut args = split_args(rest)?;
    if args.is_empty() {
        return Err(CLIError::usage(spec.usage));
    }
    let target = args.remove(0);

    let source = load_script(&ctx.http, &target).await?;
    ctx.scripts.run(&format!("@{}", target), &source, &args, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::find;

    #[test]
    fn test_parse_inline_script_and_args() {
        let spec = find(".lua-eval").unwrap();
        let (script, args) =
            parse_inline(spec, r#""return args[1] .. \"!\"" hello "two words""#).unwrap();
        assert_eq!(script, r#"return args[1] .. "!""#);
        assert_eq!(args, vec!["hello", "two words"]);
    }

    #[test]
    fn test_parse_inline_requires_quotes() {
        let spec = find(".lua-eval").unwrap();
        let err = parse_inline(spec, "return 1").unwrap_err();
        assert_eq!(err.to_string(), format!("usage: {}", spec.usage));
    }
}
