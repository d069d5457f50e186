pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiClient;
pub use provider::{ChatClient, ChatRequest, ChatStream, StreamEvent};
pub use types::{
    ContentPart, ImageDetail, ImageUrl, Message, ToolCallRequest, ToolDefinition, UserContent,
};
