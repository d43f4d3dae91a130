//! CLI output formatting utilities.

use crate::rag::{ConfidenceCategory, ConfidenceDisplay};
use console::{style, Color};
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a document summary line.
    pub fn document_info(filename: &str, id: &str, chunks: u32, uploaded: &str) {
        println!(
            "  {} {} ({}, {} chunks, uploaded {})",
            style("*").cyan(),
            style(filename).bold(),
            style(id).dim(),
            chunks,
            uploaded
        );
    }

    /// Print a confidence score in its category colour.
    pub fn confidence(display: &ConfidenceDisplay) {
        let color = category_color(display.category);
        println!(
            "  {}: {} ({})",
            style("Confidence").dim(),
            style(&display.percentage).fg(color).bold(),
            style(display.category).fg(color)
        );
    }

    /// Print a source chunk.
    pub fn source(index: usize, chunk_index: u32, similarity: f32, content: &str) {
        println!(
            "\n{} Source {} (chunk {}, similarity: {:.3})",
            style(">>").green(),
            index,
            chunk_index,
            similarity
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn category_color(category: ConfidenceCategory) -> Color {
    match category {
        ConfidenceCategory::High => Color::Green,
        ConfidenceCategory::Medium => Color::Yellow,
        ConfidenceCategory::Low => Color::Red,
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("Carrier:\nSwift", 50), "Carrier: Swift");
        assert_eq!(content_preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_category_colors() {
        assert_eq!(category_color(ConfidenceCategory::High), Color::Green);
        assert_eq!(category_color(ConfidenceCategory::Low), Color::Red);
    }
}
