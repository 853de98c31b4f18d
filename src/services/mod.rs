pub mod classifier;
pub mod corpus;
pub mod estimator;
pub mod gemini; // Google Gemini text generation
pub mod huggingface; // Hugging Face hosted inference, text and images
pub mod openai; // DALL-E images
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use corpus::RecipeCorpus;
