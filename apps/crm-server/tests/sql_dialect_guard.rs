//! Static guard: every SQL literal in the workspace must stay in the
//! Postgres dialect ($n placeholders, no SQLite leftovers).

use std::fs;
use std::path::{Path, PathBuf};

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

fn scanned_roots() -> Vec<PathBuf> {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    vec![
        manifest.join("src"),
        manifest.join("../../libs/crm-db/src"),
    ]
}

/// Pulls every string literal (normal and raw) out of a source file,
/// tagged with its line number.
fn string_literals(content: &str) -> Vec<(usize, String)> {
    let bytes = content.as_bytes();
    let mut literals = Vec::new();
    let mut line = 1usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                line += 1;
                i += 1;
            }
            b'r' if i + 1 < bytes.len() && (bytes[i + 1] == b'"' || bytes[i + 1] == b'#') => {
                let mut j = i + 1;
                let mut hashes = 0usize;
                while j < bytes.len() && bytes[j] == b'#' {
                    hashes += 1;
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'"' {
                    let start = j + 1;
                    let mut close = String::from("\"");
                    close.push_str(&"#".repeat(hashes));
                    if let Some(rel) = content[start..].find(&close) {
                        let end = start + rel;
                        literals.push((line, content[start..end].to_string()));
                        line += content[start..end].bytes().filter(|b| *b == b'\n').count();
                        i = end + close.len();
                        continue;
                    }
                }
                i += 1;
            }
            b'"' => {
                let start = i + 1;
                let mut j = start;
                let mut escaped = false;
                while j < bytes.len() {
                    let b = bytes[j];
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'"' {
                        break;
                    }
                    j += 1;
                }
                if j < bytes.len() {
                    literals.push((line, content[start..j].to_string()));
                    line += content[start..j].bytes().filter(|b| *b == b'\n').count();
                }
                i = j + 1;
            }
            _ => i += 1,
        }
    }
    literals
}

fn looks_like_sql(literal: &str) -> bool {
    let head = literal.trim_start().to_lowercase();
    ["select", "insert", "update", "delete", "create table"]
        .iter()
        .any(|kw| head.starts_with(kw))
}

fn dialect_violation(sql: &str) -> Option<&'static str> {
    let lower = sql.to_lowercase();
    if sql.contains('?') {
        return Some("'?' placeholder (use $n)");
    }
    if sql.contains('`') {
        return Some("backtick-quoted identifier");
    }
    if lower.contains("insert or ignore")
        || lower.contains("autoincrement")
        || lower.contains("strftime(")
        || lower.contains("datetime(")
    {
        return Some("SQLite-only syntax");
    }
    None
}

#[test]
fn sql_literals_stay_in_the_postgres_dialect() {
    let mut files = Vec::new();
    for root in scanned_roots() {
        rust_sources(&root, &mut files);
    }
    assert!(!files.is_empty(), "no source files found to scan");

    let mut violations = Vec::new();
    for file in files {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (line, literal) in string_literals(&content) {
            if !looks_like_sql(&literal) {
                continue;
            }
            if let Some(reason) = dialect_violation(&literal) {
                violations.push(format!("{}:{} {}", file.display(), line, reason));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "non-Postgres SQL found:\n{}",
        violations.join("\n")
    );
}

#[test]
fn sql_literals_are_actually_found() {
    // Guard against the scanner silently going blind after a refactor.
    let mut files = Vec::new();
    for root in scanned_roots() {
        rust_sources(&root, &mut files);
    }
    let mut sql_count = 0usize;
    for file in files {
        if let Ok(content) = fs::read_to_string(&file) {
            sql_count += string_literals(&content)
                .iter()
                .filter(|(_, l)| looks_like_sql(l))
                .count();
        }
    }
    assert!(sql_count >= 10, "expected to find SQL literals, got {sql_count}");
}
