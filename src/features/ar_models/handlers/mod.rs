mod ar_model_handler;

pub use ar_model_handler::*;
