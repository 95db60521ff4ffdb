pub use courseboard_models::students::*;
