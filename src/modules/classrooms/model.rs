pub use courseboard_models::classrooms::*;
