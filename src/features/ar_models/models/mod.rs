mod ar_model;

pub use ar_model::{ArModel, MatchStrategy, NewArModel};
