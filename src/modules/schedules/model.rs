pub use courseboard_models::schedules::*;
