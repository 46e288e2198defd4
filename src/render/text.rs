//! Indented tree rendering of an outline.

use crate::model::OutlineEntry;

/// Options for the tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeTextOptions {
    /// Indentation per depth level
    pub indent: String,
    /// Characters of block text shown before eliding (0 = unlimited)
    pub max_text_chars: usize,
    /// Append the page number to each line
    pub show_pages: bool,
}

impl Default for TreeTextOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            max_text_chars: 80,
            show_pages: true,
        }
    }
}

fn elide(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if max_chars == 0 || single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Render outline entries as an indented tree, one block per line.
pub fn to_tree_text(entries: &[OutlineEntry]) -> String {
    to_tree_text_with(entries, &TreeTextOptions::default())
}

/// Render outline entries as an indented tree with custom options.
pub fn to_tree_text_with(entries: &[OutlineEntry], options: &TreeTextOptions) -> String {
    let mut output = String::new();
    for entry in entries {
        output.push_str(&options.indent.repeat(entry.depth));
        output.push_str(&format!(
            "[{}] {}",
            entry.label,
            elide(&entry.text, options.max_text_chars)
        ));
        if options.show_pages {
            output.push_str(&format!(" (p. {})", entry.page_no));
        }
        output.push('\n');
    }
    output
}
