pub use super::course_materials::Entity as CourseMaterials;
pub use super::course_videos::Entity as CourseVideos;
pub use super::courses::Entity as Courses;
pub use super::enrollments::Entity as Enrollments;
pub use super::profiles::Entity as Profiles;
pub use super::users::Entity as Users;
