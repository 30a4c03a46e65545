//! `.output_format [format]`

use std::io::Write;

use super::CommandSpec;
use crate::error::{CLIError, Result};
use crate::formatter::OutputFormat;
use crate::session::SessionContext;

/// Every format name with the current one bracketed
fn list_formats(current: OutputFormat) -> String {
    OutputFormat::ALL
        .iter()
        .map(|format| {
            if *format == current {
                format!("[{}]", format)
            } else {
                format.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn run(
    ctx: &mut SessionContext,
    spec: &CommandSpec,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    match args {
        [] => {
            writeln!(out, "{}", list_formats(ctx.format))?;
        }
        [name] => {
            let format: OutputFormat = name.parse()?;
            ctx.format = format;
            writeln!(out, "Output format set to: {}", format)?;
        }
        _ => return Err(CLIError::usage(spec.usage)),
    }
    Ok(())
}
