//! Reassembly of streamed tool calls.
//!
//! Chat completion streams deliver a tool call as a series of fragments
//! keyed by the call's index: the first fragment carries the id and the
//! function name, later fragments carry slices of the JSON argument text.
//! Fragments for different calls may interleave.

use std::collections::BTreeMap;

use recallbot_types::llm::ToolCall;

/// One tool call under construction.
#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: String,
    name: String,
    json_buffer: String,
}

impl PartialToolCall {
    fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && serde_json::from_str::<serde_json::Value>(&self.json_buffer).is_ok()
    }
}

/// Accumulates tool-call fragments keyed by index.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fragment. Any of the parts may be absent.
    pub fn push(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let call = self.calls.entry(index).or_default();

        // id and name arrive once, on the first fragment
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            call.id = id.to_string();
        }
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            call.name = name.to_string();
        }
        if let Some(arguments) = arguments {
            call.json_buffer.push_str(arguments);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Whether every buffered call has a name and decodable JSON arguments.
    pub fn is_complete(&self) -> bool {
        !self.calls.is_empty() && self.calls.values().all(PartialToolCall::is_complete)
    }

    /// Drain all buffered calls in index order.
    ///
    /// Arguments are handed over verbatim, even when they do not decode;
    /// the dispatcher reports undecodable arguments back to the model.
    pub fn finish(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                },
                name: call.name,
                arguments: call.json_buffer,
            })
            .collect()
    }
}
