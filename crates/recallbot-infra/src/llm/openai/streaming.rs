//! OpenAI stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`StreamEvent`] enum. Tool call arguments arrive as
//! partial JSON fragments across chunks, keyed by tool call index. They are
//! accumulated and emitted as [`StreamEvent::ToolCallComplete`] when a
//! finish_reason arrives, or at the end of the stream if the provider never
//! sent one.

use std::pin::Pin;

use async_openai::types::chat::ChatCompletionResponseStream;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use recallbot_core::llm::accumulator::ToolCallAccumulator;
use recallbot_types::llm::{LlmError, StreamEvent, Usage};

use super::{map_openai_error, stop_reason};

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `Connected` -- immediately on entry
/// 2. `TextDelta` -- for each text content chunk
/// 3. `ToolCallComplete` -- when tool call arguments are fully assembled
/// 4. `MessageDelta` -- with the stop reason when finish_reason appears
/// 5. `Usage` -- token usage (requested via `stream_options.include_usage`)
/// 6. `Done` -- at the end of the stream
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;
        let mut tool_calls = ToolCallAccumulator::new();

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(map_openai_error)?;

            // The final chunk carries usage with an empty choices array.
            if let Some(usage) = &chunk.usage {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield StreamEvent::TextDelta { text };
                }

                for fragment in choice.delta.tool_calls.iter().flatten() {
                    let function = fragment.function.as_ref();
                    tool_calls.push(
                        fragment.index,
                        fragment.id.as_deref(),
                        function.and_then(|f| f.name.as_deref()),
                        function.and_then(|f| f.arguments.as_deref()),
                    );
                }

                if let Some(reason) = choice.finish_reason {
                    for call in tool_calls.finish() {
                        debug!(tool = %call.name, call_id = %call.id, "Tool call assembled");
                        yield StreamEvent::ToolCallComplete(call);
                    }
                    yield StreamEvent::MessageDelta {
                        stop_reason: stop_reason(&reason),
                    };
                }
            }
        }

        // Streams cut short still hand over whatever calls were started
        for call in tool_calls.finish() {
            yield StreamEvent::ToolCallComplete(call);
        }

        yield StreamEvent::Done;
    })
}
