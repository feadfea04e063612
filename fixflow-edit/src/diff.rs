use diffy::PatchFormatter;
use fixflow_types::report::FileChange;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Unified diff of one unit, with git-style headers. Empty when nothing changed.
pub fn render_patch(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "diff --git a/{0} b/{0}", path);
    let _ = writeln!(out, "--- a/{0}\n+++ b/{0}", path);

    let patch = diffy::create_patch(before, after);
    let body = PatchFormatter::new().fmt_patch(&patch).to_string();
    // diffy writes its own `--- original` / `+++ modified` header; hunks start at `@@`.
    let hunks = body.find("@@").map(|at| &body[at..]).unwrap_or("");
    out.push_str(hunks);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Hashes, sizes and patch for a unit whose text changed; `None` when it did not.
pub fn file_change(path: &str, before: &str, after: &str) -> Option<FileChange> {
    if before == after {
        return None;
    }
    Some(FileChange {
        before_sha256: sha256_hex(before.as_bytes()),
        after_sha256: sha256_hex(after.as_bytes()),
        before_bytes: before.len() as u64,
        after_bytes: after.len() as u64,
        patch: render_patch(path, before, after),
    })
}
