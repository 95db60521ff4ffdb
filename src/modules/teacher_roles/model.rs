pub use courseboard_models::teacher_roles::*;
