//! Welcome banner display for chat sessions.

use console::style;

/// Print the welcome banner at the start of a chat session.
pub fn print_welcome_banner(user_id: &str, model: &str) {
    println!();
    println!("  @ {}", style("Email assistant").cyan().bold());
    println!(
        "  {}",
        style("Drafts and sends emails, remembers what you tell it.").dim()
    );
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!("  {}   {}", style("User:").bold(), style(user_id).dim());
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
