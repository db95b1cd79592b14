pub mod ar_models;
