pub use courseboard_models::users::*;
pub use courseboard_models::UserRole;
