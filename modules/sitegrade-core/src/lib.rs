pub mod collect;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod gateway;
pub mod prompt;
pub mod types;

pub use collect::{
    BrowserlessRenderer, HeaderSource, HttpHeaderInspector, HttpMarkupFetcher, MarkupSource,
    PageRenderer, ScreenshotStore,
};
pub use config::{AppConfig, ModelSelection};
pub use error::{CollectError, CollectResult, EvaluationError, EvaluationResult};
pub use evaluator::{Evaluator, Report};
pub use extract::{extract_information, extract_reply};
pub use gateway::{ModelGateway, ModelRequest, OpenRouterGateway};
pub use prompt::compose;
pub use types::*;
