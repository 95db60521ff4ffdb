pub use courseboard_models::courses::*;
