pub mod extract;
pub mod loop_;
pub mod system_prompt;

pub use extract::extract_tool_call;
pub use loop_::{run_interactive, QueryClient};
