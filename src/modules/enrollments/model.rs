pub use courseboard_models::enrollments::*;
