//! Role-based authorization.
//!
//! Every permission decision in the service goes through [`authorize`]. Call
//! sites describe *what* they want to do as an [`Action`] (carrying the
//! ownership facts the rule needs) and get back a [`Decision`].

use super::{Role, UserId};
use serde::Serialize;
use std::fmt;

/// The authenticated caller as seen by the authorization rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub standing: Standing,
}

/// What the caller's profile says about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Standing {
    Role(Role),
    /// Profile exists but its stored role is outside the enumeration.
    UnknownRole(String),
    NoProfile,
}

impl Standing {
    /// Builds a standing from an optional stored role string.
    #[must_use]
    pub fn from_stored(role: Option<&str>) -> Self {
        match role {
            None => Self::NoProfile,
            Some(raw) => raw
                .parse::<Role>()
                .map_or_else(|_| Self::UnknownRole(raw.to_string()), Self::Role),
        }
    }
}

impl Principal {
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>, standing: Standing) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            standing,
        }
    }

    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self.standing {
            Standing::Role(role) => Some(role),
            _ => None,
        }
    }

    /// Landing path used when a request is denied.
    #[must_use]
    pub fn home_path(&self) -> &'static str {
        self.role().map_or("/", |r| r.home_path())
    }
}

/// An operation a caller wants to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateCourse,
    UpdateCourse { owner: UserId },
    DeleteCourse { owner: UserId },
    /// Materials, videos and thumbnails of a course.
    ManageCourseContent { owner: UserId },
    Enroll,
    UpdateProgress { student: UserId, course_owner: UserId },
    ManageEnrollments,
    ManageUsers,
    ViewAnalytics,
    ViewAdminDashboard,
    ViewTeachingDashboard,
    /// The caller's own learner dashboard and achievements.
    ViewStudentDashboard,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateCourse => "create courses",
            Self::UpdateCourse { .. } => "edit this course",
            Self::DeleteCourse { .. } => "delete this course",
            Self::ManageCourseContent { .. } => "manage this course's content",
            Self::Enroll => "enroll in courses",
            Self::UpdateProgress { .. } => "update this enrollment",
            Self::ManageEnrollments => "manage enrollments",
            Self::ManageUsers => "manage users",
            Self::ViewAnalytics => "view analytics",
            Self::ViewAdminDashboard => "view the admin dashboard",
            Self::ViewTeachingDashboard => "view the instructor dashboard",
            Self::ViewStudentDashboard => "view the student dashboard",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    ProfileMissing,
    UnknownRole,
    InsufficientRole,
    NotOwner,
    /// Admins and instructors manage courses rather than take them.
    CannotEnroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    const fn from_bool(allowed: bool, reason: DenyReason) -> Self {
        if allowed { Self::Allow } else { Self::Deny(reason) }
    }
}

/// Decides whether `principal` may perform `action`.
#[must_use]
pub fn authorize(principal: &Principal, action: Action) -> Decision {
    let role = match &principal.standing {
        Standing::Role(role) => *role,
        Standing::UnknownRole(_) => return Decision::Deny(DenyReason::UnknownRole),
        Standing::NoProfile => return Decision::Deny(DenyReason::ProfileMissing),
    };
    let me = principal.user_id;

    match (role, action) {
        (Role::Admin, Action::Enroll) => Decision::Deny(DenyReason::CannotEnroll),
        (Role::Admin, Action::ViewStudentDashboard) => Decision::Deny(DenyReason::InsufficientRole),
        (Role::Admin, _) => Decision::Allow,

        (Role::Instructor, Action::CreateCourse | Action::ViewTeachingDashboard) => {
            Decision::Allow
        }
        (
            Role::Instructor,
            Action::UpdateCourse { owner }
            | Action::DeleteCourse { owner }
            | Action::ManageCourseContent { owner }
            | Action::UpdateProgress {
                course_owner: owner,
                ..
            },
        ) => Decision::from_bool(owner == me, DenyReason::NotOwner),
        (Role::Instructor, Action::Enroll) => Decision::Deny(DenyReason::CannotEnroll),

        (Role::Student, Action::Enroll | Action::ViewStudentDashboard) => Decision::Allow,
        (Role::Student, Action::UpdateProgress { student, .. }) => {
            Decision::from_bool(student == me, DenyReason::NotOwner)
        }

        _ => Decision::Deny(DenyReason::InsufficientRole),
    }
}

/// A denied request, ready to be reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Denied {
    pub reason: DenyReason,
    pub message: String,
    /// Where the caller should be sent instead.
    pub redirect: &'static str,
}

/// [`authorize`], turned into a `Result` for `?` at call sites.
pub fn require(principal: &Principal, action: Action) -> Result<(), Denied> {
    match authorize(principal, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(
                user = %principal.username,
                action = %action,
                reason = ?reason,
                "Authorization denied"
            );
            Err(Denied {
                reason,
                message: deny_message(action, reason),
                redirect: principal.home_path(),
            })
        }
    }
}

/// Human-readable explanation for a denied action.
#[must_use]
pub fn deny_message(action: Action, reason: DenyReason) -> String {
    match reason {
        DenyReason::ProfileMissing => "User profile not found. Please contact support.".to_string(),
        DenyReason::UnknownRole => "Your account role is not recognised.".to_string(),
        DenyReason::CannotEnroll => {
            "Only students can enroll in courses. Use your dashboard to manage courses.".to_string()
        }
        DenyReason::NotOwner => format!("You can only {action} if it belongs to you."),
        DenyReason::InsufficientRole => format!("You do not have permission to {action}."),
    }
}
