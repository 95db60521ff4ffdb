pub use courseboard_models::teachers::*;
