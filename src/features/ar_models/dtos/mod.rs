mod ar_model_dto;

pub use ar_model_dto::*;
