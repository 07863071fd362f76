//! Terminal output helpers.

use crossterm::style::Stylize;
use reclaim_schema::{OperationResult, PreviewTree};

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

/// Line-oriented status printer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn section(&self, title: &str) {
        println!("{}", title.bold());
    }

    pub fn info(&self, msg: &str) {
        println!("  {msg}");
    }

    pub fn success(&self, msg: &str) {
        println!("{} {msg}", "✓".green());
    }

    pub fn warning(&self, msg: &str) {
        println!("{} {msg}", "!".yellow());
    }

    /// One sized row, size right-aligned.
    pub fn row(&self, size: u64, label: &str) {
        println!("  {:>9}  {label}", format_size(size).dark_grey());
    }

    /// Summary of a removing operation.
    pub fn result(&self, result: &OperationResult) {
        if result.items_removed == 0 && result.items_failed == 0 {
            self.success("Nothing to clean.");
            return;
        }
        self.success(&format!(
            "Moved {} item(s) to the trash, freeing {}.",
            result.items_removed,
            format_size(result.bytes_freed)
        ));
        if result.items_failed > 0 {
            self.warning(&format!(
                "{} item(s) could not be moved (set RUST_LOG=warn for details).",
                result.items_failed
            ));
        }
        if !result.trashed.is_empty() {
            self.info(&"Run `reclaim undo` to put them back.".dark_grey().to_string());
        }
    }

    /// Render a staged plan as an indented tree.
    pub fn preview(&self, tree: &PreviewTree) {
        let mut stack: Vec<_> = tree.roots().iter().rev().map(|id| (*id, 0usize)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = tree.get(id) else { continue };
            let size = tree.total_size(id).unwrap_or(node.own_size);
            let indent = "  ".repeat(depth);
            let title = if node.is_leaf() {
                node.title.clone()
            } else {
                node.title.clone().bold().to_string()
            };
            match &node.detail {
                Some(detail) => self.row(size, &format!("{indent}{title} {}", detail.as_str().dark_grey())),
                None => self.row(size, &format!("{indent}{title}")),
            }
            stack.extend(node.children().iter().rev().map(|c| (*c, depth + 1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
