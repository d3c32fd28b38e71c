pub mod inference;
pub mod tools_client;

pub use inference::InferenceClient;
pub use tools_client::ToolServerClient;
