// Interview analysis: stage output models, their validation, the advisory
// quality review and the HTTP surface that drives the pipeline.

pub mod handlers;
pub mod models;
pub mod quality;
pub mod validator;
