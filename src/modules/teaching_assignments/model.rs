pub use courseboard_models::teaching_assignments::*;
