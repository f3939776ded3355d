//! Reading files into the conversation.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads a text file, distinguishing the failures a user can act on.
///
/// A missing file is [`Error::FileNotFound`], a permission problem is
/// [`Error::FileNotReadable`], and anything else (a directory, invalid
/// UTF-8, a device error) is [`Error::Io`].
pub async fn read_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::file_not_found(path),
            ErrorKind::PermissionDenied => Error::file_not_readable(path),
            _ => Error::io(format!("failed to read '{}': {e}", path.display()), e),
        })
}

/// The fence tag for a file, chosen from its extension; empty if unknown.
pub fn language_tag(path: impl AsRef<Path>) -> &'static str {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "rb" | "rake" | "gemspec" => "ruby",
        "py" => "python",
        "rs" => "rust",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "sh" | "bash" => "sh",
        "html" | "htm" => "html",
        "css" => "css",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "sql" => "sql",
        "md" => "markdown",
        _ => "",
    }
}

/// Formats file content as the system message added to the context.
pub fn ingest_message(path: &str, content: &str) -> String {
    let tag = language_tag(path);
    let body = content.strip_suffix('\n').unwrap_or(content);
    format!("File: {path}\n```{tag}\n{body}\n```")
}
