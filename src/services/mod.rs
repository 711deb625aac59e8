pub mod analytics;

pub mod analytics_service;
pub mod analytics_service_impl;
pub use analytics_service::{AnalyticsError, AnalyticsFilter, AnalyticsService};
pub use analytics_service_impl::SeaOrmAnalyticsService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, ProfileUpdate, SignupRequest};
pub use auth_service_impl::SeaOrmAuthService;

pub mod course_service;
pub mod course_service_impl;
pub use course_service::{CourseError, CourseInput, CourseService, MaterialInput, VideoInput};
pub use course_service_impl::SeaOrmCourseService;

pub mod enrollment_service;
pub mod enrollment_service_impl;
pub use enrollment_service::{EnrollmentError, EnrollmentFilter, EnrollmentService};
pub use enrollment_service_impl::SeaOrmEnrollmentService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserError, UserFilter, UserService};
pub use user_service_impl::SeaOrmUserService;
