pub mod error;
pub mod openrouter;
pub mod util;

pub use error::{AiError, Result};
pub use openrouter::types::{
    ChatRequest, ChatResponse, Choice, ContentPart, ImageUrl, ReplyMessage, Role, Usage,
    WireMessage,
};
pub use openrouter::OpenRouter;
pub use util::{encode_base64, jpeg_data_uri, truncate_to_char_boundary};
