pub mod http;
pub mod model;
pub mod template;

pub use http::{
    HttpModelConfig, HttpModelLoader, HttpTextGenerator, API_KEY_ENV, ENDPOINT_ENV,
};
pub use model::{ModelSynthesisOptions, ModelSynthesizer, SharedModel};
pub use template::TemplateSynthesizer;
