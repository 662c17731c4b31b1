//! Tool Output Patcher: literal text patching for a streaming chat route
//!
//! Rewrites the chat route so tool calls stream a single "Working..." line
//! instead of per-tool status, error and result messages.
//!
//! # Architecture
//!
//! Every change is a [`Replacement`]: an exact literal substring swap. A
//! [`Patcher`] runs an ordered list of them over one file and writes the
//! result back. Replacement lists come from the built-in set ([`builtin`])
//! or from TOML patch sets ([`config`]).
//!
//! # Behavior
//!
//! - Matching is exact; there is no pattern syntax
//! - A replacement whose search text is absent is skipped, not an error
//! - The target is rewritten even when nothing matched
//! - The target is overwritten in place, so its own permissions apply
//! - Targets are confined to the workspace ([`WorkspaceGuard`])
//!
//! # Example
//!
//! ```no_run
//! use tool_output_patcher::Patcher;
//!
//! match Patcher::builtin().patch("src/app/api/chat/route.ts") {
//!     Ok(report) => println!("{} replacements applied", report.applied_count()),
//!     Err(e) => eprintln!("Patch failed: {}", e),
//! }
//! ```

pub mod builtin;
pub mod config;
pub mod patcher;
pub mod replace;
pub mod safety;

// Re-exports
pub use config::{
    discover_patch_files, load_from_path, load_from_str, ConfigError, PatchSet, ValidationError,
};
pub use patcher::{PatchError, PatchReport, Patcher, StepReport};
pub use replace::{ReplaceOutcome, Replacement};
pub use safety::{SafetyError, WorkspaceGuard};
