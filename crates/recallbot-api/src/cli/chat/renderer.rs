//! Terminal output for the chat loop.
//!
//! While a turn streams, the spinner line shows the tail of the reply. Once
//! the turn completes the full reply is rendered as markdown via `termimad`.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use termimad::MadSkin;
use termimad::crossterm::style::Color;

use recallbot_types::llm::{Message, MessageRole};

/// Width of the streamed preview shown next to the spinner.
const PREVIEW_CHARS: usize = 60;

/// Terminal markdown renderer.
pub struct ChatRenderer {
    skin: MadSkin,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.bold.set_fg(Color::Cyan);
        skin.headers[0].set_fg(Color::Cyan);
        skin.headers[1].set_fg(Color::Cyan);
        skin.inline_code.set_fg(Color::Yellow);
        Self { skin }
    }

    /// Render a complete markdown reply.
    pub fn render_final(&self, markdown: &str) -> String {
        self.skin.term_text(markdown).to_string()
    }

    /// A steady-ticking spinner with the given message.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    /// Print the assistant reply.
    pub fn print_reply(&self, reply: &str) {
        println!();
        println!("  {}", style("Assistant").cyan().bold());
        println!("{}", self.render_final(reply.trim()));
    }

    /// Print the stats footer after a reply.
    ///
    /// Format: "| {secs}s . {tools} tool calls . {model}"
    pub fn print_stats_footer(&self, response_ms: u64, tool_calls: usize, model: &str) {
        let seconds = response_ms as f64 / 1000.0;
        println!(
            "  {} {:.1}s {} {} tool calls {} {}",
            style("|").dim(),
            style(seconds).dim(),
            style("\u{00b7}").dim(),
            style(tool_calls).dim(),
            style("\u{00b7}").dim(),
            style(model).dim(),
        );
        println!();
    }

    /// One line per user/assistant turn. Tool turns are skipped.
    pub fn print_history(&self, history: &[Message]) {
        println!();
        let visible: Vec<&Message> = history
            .iter()
            .filter(|m| {
                matches!(m.role, MessageRole::User | MessageRole::Assistant) && !m.content.is_empty()
            })
            .collect();

        if visible.is_empty() {
            println!("  {}", style("No messages yet.").dim());
        }
        for message in visible {
            let label = match message.role {
                MessageRole::User => style("You").green().bold(),
                _ => style("Assistant").cyan().bold(),
            };
            println!("  {label} {}", preview(&message.content, 100));
        }
        println!();
    }

    pub fn print_notice(&self, text: &str) {
        println!("\n  {} {text}\n", style("*").cyan().bold());
    }

    pub fn print_warning(&self, text: &str) {
        println!("\n  {} {text}\n", style("!").yellow().bold());
    }

    pub fn print_error(&self, text: &str) {
        eprintln!("\n  {} {text}", style("!").red().bold());
        eprintln!("  {}", style("Type a message to retry, /exit to quit.").dim());
        eprintln!();
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-line preview of `text`, at most `max` characters.
pub fn preview(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    let count = flat.chars().count();
    if count <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Spinner text for a reply that is still streaming: its last characters.
pub fn streaming_preview(text: &str) -> String {
    let flat = preview(text, usize::MAX);
    let count = flat.chars().count();
    if count <= PREVIEW_CHARS {
        flat
    } else {
        let tail: String = flat.chars().skip(count - PREVIEW_CHARS).collect();
        format!("...{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line one\nline two", 100), "line one line two");
        assert_eq!(preview("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_streaming_preview_keeps_tail() {
        let text = "a".repeat(100) + "END";
        let shown = streaming_preview(&text);
        assert!(shown.starts_with("..."));
        assert!(shown.ends_with("END"));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(streaming_preview("hi"), "hi");
    }

    #[test]
    fn test_render_final_keeps_text() {
        let rendered = ChatRenderer::new().render_final("Email **sent** to a@b.com");
        assert!(rendered.contains("sent"));
        assert!(rendered.contains("a@b.com"));
    }
}
