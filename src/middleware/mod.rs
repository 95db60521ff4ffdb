//! Request extractors and route guards.
//!
//! - [`auth`]: the `AuthUser` bearer-token extractor
//! - [`role`]: role checks for whole routers
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. `AuthUser` verifies the token and exposes its claims
//! 3. The handler turns it into a [`courseboard_auth::Caller`] and passes it
//!    to the service, which authorizes the operation
//!
//! ```ignore
//! async fn create_course(
//!     State(state): State<AppState>,
//!     auth_user: AuthUser,
//!     ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
//! ) -> Result<(StatusCode, Json<Course>), AppError> {
//!     let course = CourseService::create_course(&state.db, &auth_user.caller(), dto).await?;
//!     Ok((StatusCode::CREATED, Json(course)))
//! }
//! ```

pub mod auth;
pub mod role;
