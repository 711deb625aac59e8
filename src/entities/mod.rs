pub mod prelude;

pub mod course_materials;
pub mod course_videos;
pub mod courses;
pub mod enrollments;
pub mod profiles;
pub mod users;
