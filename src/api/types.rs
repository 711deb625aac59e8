use serde::{Deserialize, Serialize};

use crate::db::repositories::course::Course;
use crate::db::repositories::enrollment::Enrollment;
use crate::db::repositories::material::Material;
use crate::db::repositories::profile::Profile;
use crate::db::repositories::video::Video;
use crate::db::{EnrollmentRow, User, UserWithRole};
use crate::services::analytics::EnrollmentTotals;
use crate::storage::BlobStore;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set on 403 responses: the caller's landing path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            redirect: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            redirect: None,
        }
    }

    pub fn redirect(message: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            redirect: Some(to.into()),
            ..Self::error(message)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AccountDto {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<String>,
    pub bio: String,
    pub phone: String,
    pub profile_picture_url: Option<String>,
    /// Landing path for the account's role.
    pub home: &'static str,
}

impl AccountDto {
    #[must_use]
    pub fn new(user: User, profile: Option<Profile>, blobs: &dyn BlobStore) -> Self {
        let home = profile
            .as_ref()
            .and_then(|p| p.role.parse::<crate::domain::Role>().ok())
            .map_or("/", |r| r.home_path());

        match profile {
            Some(profile) => Self {
                user,
                role: Some(profile.role),
                bio: profile.bio,
                phone: profile.phone,
                profile_picture_url: profile.profile_picture.map(|key| blobs.url(&key)),
                home,
            },
            None => Self {
                user,
                role: None,
                bio: String::new(),
                phone: String::new(),
                profile_picture_url: None,
                home,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseDto {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub instructor_id: i32,
    pub level: String,
    pub duration_hours: i32,
    pub price: f64,
    pub is_published: bool,
    pub thumbnail_url: Option<String>,
    pub enrollment_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl CourseDto {
    #[must_use]
    pub fn new(course: Course, enrollment_count: u64, blobs: &dyn BlobStore) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let price = course.price_cents as f64 / 100.0;

        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            instructor_id: course.instructor_id,
            level: course.level,
            duration_hours: course.duration_hours,
            price,
            is_published: course.is_published,
            thumbnail_url: course.thumbnail.map(|key| blobs.url(&key)),
            enrollment_count,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MaterialDto {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
    pub material_type: String,
    pub file_url: String,
    pub uploaded_at: String,
    pub order: i32,
}

impl MaterialDto {
    #[must_use]
    pub fn new(material: Material, blobs: &dyn BlobStore) -> Self {
        Self {
            id: material.id,
            course_id: material.course_id,
            title: material.title,
            material_type: material.material_type,
            file_url: blobs.url(&material.file),
            uploaded_at: material.uploaded_at,
            order: material.order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoDto {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
    pub description: String,
    pub file_url: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: i32,
    pub order: i32,
    pub uploaded_at: String,
}

impl VideoDto {
    #[must_use]
    pub fn new(video: Video, blobs: &dyn BlobStore) -> Self {
        Self {
            id: video.id,
            course_id: video.course_id,
            title: video.title,
            description: video.description,
            file_url: video.video_file.map(|key| blobs.url(&key)),
            video_url: video.video_url,
            duration_minutes: video.duration_minutes,
            order: video.order,
            uploaded_at: video.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseDetailDto {
    #[serde(flatten)]
    pub course: CourseDto,
    pub materials: Vec<MaterialDto>,
    pub videos: Vec<VideoDto>,
    pub is_enrolled: bool,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentDto {
    pub id: i32,
    pub student_id: i32,
    pub course_id: i32,
    pub status: String,
    pub progress: i32,
    pub enrolled_at: String,
    pub completed_at: Option<String>,
}

impl From<Enrollment> for EnrollmentDto {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            course_id: e.course_id,
            status: e.status,
            progress: e.progress,
            enrolled_at: e.enrolled_at,
            completed_at: e.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub enrollment: EnrollmentDto,
    pub already_enrolled: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub enrollments: Vec<EnrollmentRow>,
    pub available_courses: Vec<CourseDto>,
    pub totals: EnrollmentTotals,
    pub overall_progress: i32,
}

#[derive(Debug, Serialize)]
pub struct StudentAnalyticsDto {
    pub student: UserWithRole,
    pub enrollments: Vec<EnrollmentRow>,
    pub totals: EnrollmentTotals,
    pub average_progress: i32,
    pub recent_activity: Vec<EnrollmentRow>,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub total_users: u64,
    pub total_courses: u64,
    pub total_enrollments: u64,
    pub recent_enrollments: Vec<EnrollmentRow>,
    pub recent_users: Vec<UserWithRole>,
    pub courses: Vec<CourseDto>,
    pub system_status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TeachingCourseDto {
    #[serde(flatten)]
    pub course: CourseDto,
    pub completed: u64,
    pub average_progress: i32,
}

#[derive(Debug, Serialize)]
pub struct TeachingDashboard {
    pub courses: Vec<TeachingCourseDto>,
    pub total_students: u64,
    pub total_enrollments: u64,
}
