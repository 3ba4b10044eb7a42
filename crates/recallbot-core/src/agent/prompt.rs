//! System prompts for the two agents.
//!
//! Both prompts embed the context summary the memory service derived from
//! the user's earlier sessions. The support persona is replaceable through
//! configuration; `{memories}` marks where the summary goes.

/// Placeholder substituted with the context summary in persona templates.
pub const MEMORIES_PLACEHOLDER: &str = "{memories}";

/// Built-in persona for the WhatsApp support bot.
pub const DEFAULT_SUPPORT_PERSONA: &str = "\
You are a customer support assistant on WhatsApp with access to a long-term \
memory system that recalls past interactions and customer preferences.

MEMORIES ABOUT THE USER:
{memories}

Resolve customer queries swiftly, accurately, and empathetically:
1. Greet the customer warmly and acknowledge any past interactions.
2. Ask focused questions until the issue is clear.
3. Show genuine empathy and take ownership of the issue.
4. Explain the steps you will take to resolve it.
5. Close the conversation on a positive note.

Keep the tone professional yet friendly. Only give short and concise \
responses, avoiding unnecessary details.";

/// Build the system prompt for the interactive email agent.
///
/// ```text
/// <role>...</role>
/// <memories>{context}</memories>
/// <instructions>...</instructions>
/// ```
pub fn email_agent_prompt(context: &str) -> String {
    let mut sections = Vec::with_capacity(3);

    sections.push(
        "<role>\nYou are a helpful personal assistant that can send emails on the \
         user's behalf. You have a long-term memory of previous conversations with \
         this user.\n</role>"
            .to_string(),
    );

    let context = context.trim();
    if !context.is_empty() {
        sections.push(format!("<memories>\n{context}\n</memories>"));
    }

    sections.push(
        "<instructions>\n\
         - Use the send_email tool when the user asks you to send an email.\n\
         - Ask for the recipient address, subject, or content if any of them is unclear; \
         never invent an address.\n\
         - After a tool call, tell the user whether the email was sent.\n\
         - Keep replies short.\n\
         </instructions>"
            .to_string(),
    );

    sections.join("\n\n")
}

/// Build the support bot system prompt from a persona template.
///
/// `None` selects [`DEFAULT_SUPPORT_PERSONA`]. A template without the
/// placeholder gets the summary appended in its own section.
pub fn support_prompt(template: Option<&str>, context: &str) -> String {
    let template = template.unwrap_or(DEFAULT_SUPPORT_PERSONA);
    let context = context.trim();

    if template.contains(MEMORIES_PLACEHOLDER) {
        template.replace(MEMORIES_PLACEHOLDER, context)
    } else if context.is_empty() {
        template.to_string()
    } else {
        format!("{template}\n\nMEMORIES ABOUT THE USER:\n{context}")
    }
}
