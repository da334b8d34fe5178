pub mod catalog;
pub mod openrouter;
pub mod sse;

pub use catalog::{CatalogSource, ModelCatalog};
pub use openrouter::{CompletionRequest, OpenRouterClient};
