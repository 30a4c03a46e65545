//! `.ask <question>`

use std::io::Write;

use tracing::debug;

use super::CommandSpec;
use crate::ask::{extract_sql_blocks, refine_question, schema_context, BusyIndicator};
use crate::error::{CLIError, Result};
use crate::select_menu::{MenuChoice, SelectMenu};
use crate::session::SessionContext;

pub(super) async fn run(
    ctx: &mut SessionContext,
    spec: &CommandSpec,
    question: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        return Err(CLIError::usage(spec.usage));
    }

    let tables: Vec<String> = ctx.metadata.read().tables().to_vec();
    let context = match ctx.manager.current() {
        Some(database) => schema_context(&database, question, &tables).await,
        None => String::new(),
    };
    let prompt = if context.is_empty() {
        question.to_string()
    } else {
        refine_question(question, &context)
    };
    debug!("Asking {} ({} bytes)", ctx.ask.endpoint(), prompt.len());

    let indicator = ctx
        .interactive
        .then(|| BusyIndicator::start(std::io::stdout(), "Thinking"));
    let answer = ctx.ask.ask(&prompt).await;
    if let Some(indicator) = indicator {
        indicator.stop();
    }
    let answer = answer?;

    writeln!(out, "{}", answer)?;

    let blocks = extract_sql_blocks(&answer);
    if blocks.is_empty() || !ctx.interactive {
        return Ok(());
    }
    out.flush()?;

    let mut menu = SelectMenu::new("Select a SQL statement to run", blocks, ctx.color);
    if let MenuChoice::Selected(sql) = menu.run()? {
        ctx.suggestion = Some(sql);
    }
    Ok(())
}
