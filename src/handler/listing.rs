//! Directory listing module
//!
//! Enumerates a directory's immediate children and renders them as an HTML page or
//! a JSON document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Write;
use std::io;
use std::path::Path;
use tokio::fs;

use crate::http::encoding::{encode_segment, escape_html};
use crate::logger;

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    /// Files only
    pub size_bytes: Option<u64>,
    pub modified_at: DateTime<Utc>,
}

/// List the immediate children of `dir`, ordered case-insensitively by name.
///
/// Children that cannot be stat'ed (removed mid-listing, dangling symlinks) are
/// skipped. Failure to open or read the directory itself is an error.
pub async fn list(dir: &Path) -> io::Result<Vec<DirectoryEntry>> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();

        // fs::metadata follows symlinks, so a link to a directory lists as one
        let meta = match fs::metadata(entry.path()).await {
            Ok(meta) => meta,
            Err(e) => {
                logger::log_debug(&format!("Skipping '{name}' in listing: {e}"));
                continue;
            }
        };

        let is_directory = meta.is_dir();
        entries.push(DirectoryEntry {
            name,
            is_directory,
            size_bytes: (!is_directory).then_some(meta.len()),
            modified_at: meta
                .modified()
                .map_or(DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::from),
        });
    }

    // sort_by is stable: equal names keep enumeration order
    entries.sort_by(|a, b| compare_names(&a.name, &b.name));
    Ok(entries)
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Render a listing page. `request_path` is the decoded URL path, ending in `/`.
pub fn render_html(request_path: &str, entries: &[DirectoryEntry]) -> String {
    let title = escape_html(request_path);
    let mut html = String::with_capacity(512 + entries.len() * 160);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Index of {title}</title>
<style>
body {{ font-family: -apple-system, "Segoe UI", Roboto, Arial, sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; }}
th, td {{ padding: 0.2em 1.5em 0.2em 0; text-align: left; }}
td.size {{ text-align: right; }}
</style>
</head>
<body>
<h1>Index of {title}</h1>
<table>
<thead><tr><th>Name</th><th>Size</th><th>Last Modified</th></tr></thead>
<tbody>
"#
    );

    if request_path != "/" {
        html.push_str("<tr><td><a href=\"../\">../</a></td><td></td><td></td></tr>\n");
    }

    for entry in entries {
        let suffix = if entry.is_directory { "/" } else { "" };
        let size = entry
            .size_bytes
            .map_or_else(|| "-".to_string(), |size| size.to_string());
        let _ = writeln!(
            html,
            "<tr><td><a href=\"{href}{suffix}\">{name}{suffix}</a></td><td class=\"size\">{size}</td><td>{modified}</td></tr>",
            href = encode_segment(&entry.name),
            name = escape_html(&entry.name),
            modified = entry.modified_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

#[derive(Serialize)]
struct Listing<'a> {
    path: &'a str,
    entries: &'a [DirectoryEntry],
}

/// Render a listing as `{"path": ..., "entries": [...]}`
pub fn render_json(request_path: &str, entries: &[DirectoryEntry]) -> serde_json::Result<String> {
    serde_json::to_string(&Listing {
        path: request_path,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_case_insensitive_order_without_grouping() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("b.txt"), "bb").unwrap();
        stdfs::write(dir.path().join("A.txt"), "a").unwrap();
        stdfs::create_dir(dir.path().join("c")).unwrap();
        stdfs::create_dir(dir.path().join("B2")).unwrap();

        let entries = list(dir.path()).await.unwrap();
        assert_eq!(names(&entries), ["A.txt", "b.txt", "B2", "c"]);

        assert_eq!(entries[0].size_bytes, Some(1));
        assert!(!entries[1].is_directory);
        assert_eq!(entries[1].size_bytes, Some(2));
        assert!(entries[2].is_directory);
        assert_eq!(entries[2].size_bytes, None);
        assert!(entries[3].modified_at > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_listing_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "Alpha", "beta", "ALPHA2", "gamma.md"] {
            stdfs::write(dir.path().join(name), name).unwrap();
        }

        let first = list(dir.path()).await.unwrap();
        let second = list(dir.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::create_dir_all(dir.path().join("outer/inner")).unwrap();
        stdfs::write(dir.path().join("outer/inner/deep.txt"), "x").unwrap();

        let entries = list(dir.path()).await.unwrap();
        assert_eq!(names(&entries), ["outer"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_skipped() {
        let dir = tempfile::tempdir().unwrap();
        stdfs::write(dir.path().join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("broken")).unwrap();

        let entries = list(dir.path()).await.unwrap();
        assert_eq!(names(&entries), ["real.txt"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list(&dir.path().join("absent")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    fn entry(name: &str, is_directory: bool) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            is_directory,
            size_bytes: (!is_directory).then_some(42),
            modified_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_html_escapes_names() {
        let entries = [entry("<img src=x>.txt", false), entry("my docs", true)];
        let html = render_html("/sub/", &entries);

        assert!(html.contains("<title>Index of /sub/</title>"));
        assert!(html.contains("<a href=\"../\">../</a>"));
        assert!(html.contains("&lt;img src=x&gt;.txt"));
        assert!(!html.contains("<img src=x>"));
        assert!(html.contains("href=\"%3Cimg%20src%3Dx%3E.txt\""));
        assert!(html.contains("<a href=\"my%20docs/\">my docs/</a>"));
        assert!(html.contains("<td class=\"size\">42</td>"));
        assert!(html.contains("1970-01-01 00:00:00 UTC"));
    }

    #[test]
    fn test_html_root_has_no_parent_link() {
        let html = render_html("/", &[]);
        assert!(html.contains("Index of /"));
        assert!(!html.contains("href=\"../\""));
    }

    #[test]
    fn test_json_listing() {
        let json = render_json("/sub/", &[entry("a.txt", false), entry("d", true)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["path"], "/sub/");
        assert_eq!(value["entries"][0]["name"], "a.txt");
        assert_eq!(value["entries"][0]["size_bytes"], 42);
        assert_eq!(value["entries"][1]["is_directory"], true);
        assert!(value["entries"][1]["size_bytes"].is_null());
        assert_eq!(value["entries"][1]["modified_at"], "1970-01-01T00:00:00Z");
    }
}
