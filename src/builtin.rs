//! Built-in patch set: quiet the per-tool status lines streamed by the chat route.
//!
//! The literals below are the exact bytes found in the route source. `\n`
//! inside them is a backslash followed by `n` (an escape in the TypeScript
//! template string), not a newline.

use crate::config::schema::{Metadata, PatchSet, ReplacementDef};
use crate::replace::Replacement;

/// Target file, relative to the workspace root.
pub const DEFAULT_TARGET: &str = "src/app/api/chat/route.ts";

/// Printed once the run completes, whether or not anything matched.
pub const CONFIRMATION_MESSAGE: &str = "Fixed tool output messages";

pub const PATCH_SET_NAME: &str = "tool-output";

pub const EXEC_ID: &str = "exec-working-once";
pub const EXEC_SEARCH: &str = r#"yield `data: ${JSON.stringify({ choices: [{ delta: { content: `\n🔧 Executing ${toolCall.tool}...\n` } }] })}\n\n`"#;
pub const EXEC_REPLACE: &str = r#"// Show "Working..." only once on first tool
      if (iterations === 1) {
        yield `data: ${JSON.stringify({ choices: [{ delta: { content: `⚡ Working...\n` } }] })}\n\n`;
      }"#;

pub const ERROR_ID: &str = "suppress-tool-error";
pub const ERROR_SEARCH: &str = r#"yield `data: ${JSON.stringify({ choices: [{ delta: { content: `\n❌ Tool error: ${toolResult.error}\n` } }] })}\n\n`;"#;
pub const ERROR_REPLACE: &str = "// Error message suppressed - continue silently";

pub const RESULTS_ID: &str = "suppress-got-results";
pub const RESULTS_SEARCH: &str = r#"yield `data: ${JSON.stringify({ choices: [{ delta: { content: `\n✅ Got results\n` } }] })}\n\n`"#;
pub const RESULTS_REPLACE: &str = "// Results received - continuing silently";

/// The three replacements, in application order.
pub fn replacements() -> Vec<Replacement> {
    vec![
        Replacement::new(EXEC_ID, EXEC_SEARCH, EXEC_REPLACE),
        Replacement::new(ERROR_ID, ERROR_SEARCH, ERROR_REPLACE),
        Replacement::new(RESULTS_ID, RESULTS_SEARCH, RESULTS_REPLACE),
    ]
}

/// The built-in replacements wrapped as a patch set, equal to `patches/tool-output.toml`.
pub fn patch_set() -> PatchSet {
    PatchSet {
        meta: Metadata {
            name: PATCH_SET_NAME.to_string(),
            description: Some(
                "Show a single Working line and silence per-tool error/result messages"
                    .to_string(),
            ),
            target: Some(DEFAULT_TARGET.to_string()),
            message: Some(CONFIRMATION_MESSAGE.to_string()),
        },
        replacements: replacements()
            .into_iter()
            .map(|r| ReplacementDef {
                id: r.id,
                search: r.search,
                replace: r.replace,
            })
            .collect(),
    }
}
