//! `SeaORM` implementation of the `CourseService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::types::{CourseDetailDto, CourseDto, MaterialDto, VideoDto};
use crate::config::Config;
use crate::db::repositories::course::{Course, CourseFields};
use crate::db::repositories::material::NewMaterial;
use crate::db::repositories::video::NewVideo;
use crate::db::{CourseVisibility, Page, Store};
use crate::domain::access::{self, Action, Principal};
use crate::domain::{CourseId, CourseLevel, MaterialType, Role};
use crate::services::course_service::{
    CourseError, CourseInput, CourseService, MaterialInput, VideoInput,
};
use crate::storage::{BlobKind, BlobStore, Upload, blob_key};

const MAX_TITLE_LEN: usize = 200;
const MAX_PRICE_CENTS: i64 = 99_999_999_99;
const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub struct SeaOrmCourseService {
    store: Store,
    config: Arc<Config>,
    blobs: Arc<dyn BlobStore>,
}

impl SeaOrmCourseService {
    #[must_use]
    pub fn new(store: Store, config: Arc<Config>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            config,
            blobs,
        }
    }

    fn visibility(principal: Option<&Principal>) -> CourseVisibility {
        match principal.and_then(Principal::role) {
            Some(Role::Admin) => CourseVisibility::All,
            Some(Role::Instructor) => {
                CourseVisibility::PublishedOrOwnedBy(principal.map_or(0, |p| p.user_id.value()))
            }
            Some(Role::Student) | None => CourseVisibility::PublishedOnly,
        }
    }

    async fn load(&self, id: CourseId) -> Result<Course, CourseError> {
        self.store
            .course_repo()
            .get(id.value())
            .await?
            .ok_or(CourseError::NotFound(id))
    }

    async fn to_dto(&self, course: Course) -> Result<CourseDto, CourseError> {
        let count = self
            .store
            .enrollment_repo()
            .counts_for_courses(&[course.id])
            .await?
            .get(&course.id)
            .copied()
            .unwrap_or(0);

        Ok(CourseDto::new(course, count, self.blobs.as_ref()))
    }

    fn check_upload(&self, upload: &Upload) -> Result<(), CourseError> {
        if upload.bytes.is_empty() {
            return Err(CourseError::Validation("The uploaded file is empty".to_string()));
        }
        let max = self.config.storage.max_upload_mb * 1024 * 1024;
        if upload.bytes.len() > max {
            return Err(CourseError::Validation(format!(
                "Uploads must be {} MB or smaller",
                self.config.storage.max_upload_mb
            )));
        }
        Ok(())
    }

    async fn remove_blobs(&self, keys: impl IntoIterator<Item = String>) {
        for key in keys {
            if let Err(e) = self.blobs.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to remove stored file");
            }
        }
    }
}

fn required_title(title: &str) -> Result<String, CourseError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CourseError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CourseError::Validation(format!(
            "Title must be {MAX_TITLE_LEN} characters or fewer"
        )));
    }
    Ok(title.to_string())
}

fn price_to_cents(price: f64) -> Result<i64, CourseError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CourseError::Validation(
            "Price must be a non-negative number".to_string(),
        ));
    }

    #[allow(clippy::cast_possible_truncation)]
    let cents = (price * 100.0).round() as i64;
    if cents > MAX_PRICE_CENTS {
        return Err(CourseError::Validation("Price is too large".to_string()));
    }
    Ok(cents)
}

fn course_fields(input: CourseInput) -> Result<CourseFields, CourseError> {
    let level: CourseLevel = input
        .level
        .parse()
        .map_err(|e: crate::domain::ParseEnumError| CourseError::Validation(e.to_string()))?;

    if input.duration_hours < 0 {
        return Err(CourseError::Validation(
            "Duration must not be negative".to_string(),
        ));
    }

    Ok(CourseFields {
        title: required_title(&input.title)?,
        description: input.description.trim().to_string(),
        level,
        duration_hours: input.duration_hours,
        price_cents: price_to_cents(input.price)?,
        is_published: input.is_published,
    })
}

fn external_video_url(raw: &str) -> Result<String, CourseError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| CourseError::Validation(format!("Invalid video URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CourseError::Validation(
            "Video URL must use http or https".to_string(),
        ));
    }
    Ok(parsed.to_string())
}

#[async_trait]
impl CourseService for SeaOrmCourseService {
    async fn list(&self, principal: Option<&Principal>, page: u64) -> Result<Page<CourseDto>, CourseError> {
        let page = self
            .store
            .course_repo()
            .list(
                Self::visibility(principal),
                page.max(1),
                self.config.server.courses_per_page,
            )
            .await?;

        let ids: Vec<i32> = page.items.iter().map(|c| c.id).collect();
        let counts = self.store.enrollment_repo().counts_for_courses(&ids).await?;

        Ok(page.map(|course| {
            let count = counts.get(&course.id).copied().unwrap_or(0);
            CourseDto::new(course, count, self.blobs.as_ref())
        }))
    }

    async fn detail(&self, principal: Option<&Principal>, id: CourseId) -> Result<CourseDetailDto, CourseError> {
        let course = self.load(id).await?;
        if !Self::visibility(principal).allows(&course) {
            return Err(CourseError::NotFound(id));
        }

        let owner = course.instructor_id.into();
        let (material_repo, video_repo) = (self.store.material_repo(), self.store.video_repo());
        let (materials, videos) = futures::try_join!(
            material_repo.list_for_course(course.id),
            video_repo.list_for_course(course.id),
        )?;

        let (is_enrolled, can_edit) = match principal {
            Some(p) => (
                p.role() == Some(Role::Student)
                    && self
                        .store
                        .enrollment_repo()
                        .is_enrolled(p.user_id.value(), course.id)
                        .await?,
                access::authorize(p, Action::UpdateCourse { owner }).is_allowed(),
            ),
            None => (false, false),
        };

        let blobs = self.blobs.as_ref();
        Ok(CourseDetailDto {
            course: self.to_dto(course).await?,
            materials: materials
                .into_iter()
                .map(|m| MaterialDto::new(m, blobs))
                .collect(),
            videos: videos.into_iter().map(|v| VideoDto::new(v, blobs)).collect(),
            is_enrolled,
            can_edit,
        })
    }

    async fn create(&self, principal: &Principal, input: CourseInput) -> Result<CourseDto, CourseError> {
        access::require(principal, Action::CreateCourse)?;
        let fields = course_fields(input)?;

        let course = self
            .store
            .course_repo()
            .create(principal.user_id.value(), fields)
            .await?;

        info!(course_id = course.id, instructor_id = %principal.user_id, "Course created");
        Ok(CourseDto::new(course, 0, self.blobs.as_ref()))
    }

    async fn update(
        &self,
        principal: &Principal,
        id: CourseId,
        input: CourseInput,
    ) -> Result<CourseDto, CourseError> {
        let course = self.load(id).await?;
        access::require(
            principal,
            Action::UpdateCourse {
                owner: course.instructor_id.into(),
            },
        )?;
        let fields = course_fields(input)?;

        let course = self.store.course_repo().update(course, fields).await?;
        info!(course_id = course.id, "Course updated");
        self.to_dto(course).await
    }

    async fn delete(&self, principal: &Principal, id: CourseId) -> Result<(), CourseError> {
        let course = self.load(id).await?;
        access::require(
            principal,
            Action::DeleteCourse {
                owner: course.instructor_id.into(),
            },
        )?;

        let mut keys: Vec<String> = course.thumbnail.iter().cloned().collect();
        keys.extend(self.store.material_repo().files_for_course(course.id).await?);
        keys.extend(
            self.store
                .video_repo()
                .list_for_course(course.id)
                .await?
                .into_iter()
                .filter_map(|v| v.video_file),
        );

        self.store.course_repo().delete(course.id).await?;
        info!(course_id = course.id, files = keys.len(), "Course deleted");

        self.remove_blobs(keys).await;
        Ok(())
    }

    async fn set_thumbnail(
        &self,
        principal: &Principal,
        id: CourseId,
        upload: Upload,
    ) -> Result<CourseDto, CourseError> {
        let course = self.load(id).await?;
        access::require(
            principal,
            Action::ManageCourseContent {
                owner: course.instructor_id.into(),
            },
        )?;
        self.check_upload(&upload)?;
        if !upload
            .extension()
            .is_some_and(|ext| THUMBNAIL_EXTENSIONS.contains(&ext.as_str()))
        {
            return Err(CourseError::Validation(format!(
                "Thumbnails must be one of: {}",
                THUMBNAIL_EXTENSIONS.join(", ")
            )));
        }

        let key = blob_key(BlobKind::CourseThumbnail, course.id, &upload.filename);
        self.blobs.put(&key, upload.bytes).await?;

        let previous = course.thumbnail.clone();
        let course = self.store.course_repo().set_thumbnail(course, key).await?;
        self.remove_blobs(previous).await;

        self.to_dto(course).await
    }

    async fn add_material(
        &self,
        principal: &Principal,
        id: CourseId,
        input: MaterialInput,
    ) -> Result<MaterialDto, CourseError> {
        let course = self.load(id).await?;
        access::require(
            principal,
            Action::ManageCourseContent {
                owner: course.instructor_id.into(),
            },
        )?;

        let title = required_title(&input.title)?;
        let material_type: MaterialType = input
            .material_type
            .parse()
            .map_err(|e: crate::domain::ParseEnumError| CourseError::Validation(e.to_string()))?;
        let upload = input
            .file
            .ok_or_else(|| CourseError::Validation("A file is required".to_string()))?;
        self.check_upload(&upload)?;

        let key = blob_key(BlobKind::CourseMaterial, course.id, &upload.filename);
        self.blobs.put(&key, upload.bytes).await?;

        let material = self
            .store
            .material_repo()
            .create(NewMaterial {
                course_id: course.id,
                title,
                material_type,
                file: key,
                order: input.order,
            })
            .await?;

        info!(course_id = course.id, material_id = material.id, "Material added");
        Ok(MaterialDto::new(material, self.blobs.as_ref()))
    }

    async fn add_video(
        &self,
        principal: &Principal,
        id: CourseId,
        input: VideoInput,
    ) -> Result<VideoDto, CourseError> {
        let course = self.load(id).await?;
        access::require(
            principal,
            Action::ManageCourseContent {
                owner: course.instructor_id.into(),
            },
        )?;

        let title = required_title(&input.title)?;
        if input.duration_minutes < 0 {
            return Err(CourseError::Validation(
                "Duration must not be negative".to_string(),
            ));
        }

        let video_url = input
            .video_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(external_video_url)
            .transpose()?;

        if input.file.is_none() && video_url.is_none() {
            return Err(CourseError::Validation(
                "Provide a video file or a video URL".to_string(),
            ));
        }

        let video_file = match input.file {
            Some(upload) => {
                self.check_upload(&upload)?;
                let key = blob_key(BlobKind::CourseVideo, course.id, &upload.filename);
                self.blobs.put(&key, upload.bytes).await?;
                Some(key)
            }
            None => None,
        };

        let video = self
            .store
            .video_repo()
            .create(NewVideo {
                course_id: course.id,
                title,
                description: input.description.trim().to_string(),
                video_file,
                video_url,
                duration_minutes: input.duration_minutes,
                order: input.order,
            })
            .await?;

        info!(course_id = course.id, video_id = video.id, "Video added");
        Ok(VideoDto::new(video, self.blobs.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::Standing;

    fn input() -> CourseInput {
        CourseInput {
            title: "  Rust 101 ".to_string(),
            description: "Ownership".to_string(),
            level: "beginner".to_string(),
            duration_hours: 10,
            price: 19.99,
            is_published: true,
        }
    }

    #[test]
    fn course_fields_are_validated() {
        let fields = course_fields(input()).unwrap();
        assert_eq!(fields.title, "Rust 101");
        assert_eq!(fields.price_cents, 1999);

        let mut bad = input();
        bad.level = "expert".to_string();
        assert!(matches!(course_fields(bad), Err(CourseError::Validation(_))));

        let mut bad = input();
        bad.price = -1.0;
        assert!(course_fields(bad).is_err());

        let mut bad = input();
        bad.price = f64::NAN;
        assert!(course_fields(bad).is_err());

        let mut bad = input();
        bad.title = "   ".to_string();
        assert!(course_fields(bad).is_err());
    }

    #[test]
    fn video_urls_must_be_http() {
        assert!(external_video_url("https://videos.example.com/watch?v=1").is_ok());
        assert!(external_video_url("ftp://example.com/a.mp4").is_err());
        assert!(external_video_url("not a url").is_err());
    }

    #[test]
    fn visibility_follows_role() {
        let admin = Principal::new(1, "a", Standing::Role(Role::Admin));
        let tutor = Principal::new(2, "t", Standing::Role(Role::Instructor));
        let student = Principal::new(3, "s", Standing::Role(Role::Student));

        assert_eq!(SeaOrmCourseService::visibility(None), CourseVisibility::PublishedOnly);
        assert_eq!(SeaOrmCourseService::visibility(Some(&admin)), CourseVisibility::All);
        assert_eq!(
            SeaOrmCourseService::visibility(Some(&tutor)),
            CourseVisibility::PublishedOrOwnedBy(2)
        );
        assert_eq!(
            SeaOrmCourseService::visibility(Some(&student)),
            CourseVisibility::PublishedOnly
        );
    }
}
