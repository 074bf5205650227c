//! Apply-commit-push pipeline
//!
//! Steps, in order, each gating the next:
//! 1. Stage - shallow clone and branch discovery
//! 2. Identity - repository-scoped user name and email
//! 3. Apply - ordered patch strategies
//! 4. Commit - stage all, normalized message, author from the request
//! 5. Publish - push to the review ref, collect URLs, post the note

mod apply;
mod commit;
mod execute;
mod identity;
mod progress;
mod publish;
mod reporter;
mod stage;
mod transcript;

pub use apply::{default_strategies, normalize_line_endings, PatchStrategy};
pub use commit::{generate_change_id, is_trailer, prepare_message, CHANGE_ID_PREFIX};
pub use execute::Uploader;
pub use progress::{NoopProgress, ProgressCallback, StdinEcho, Step};
pub use publish::{extract_review_urls, review_ref, shell_quote};
pub use reporter::strip_terminal_escapes;
pub use transcript::{TranscriptEntry, TranscriptRecorder};
