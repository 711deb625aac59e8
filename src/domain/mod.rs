//! Domain types for the course catalog with strong typing.
//!
//! Stored values (roles, statuses, levels) live in the database as plain
//! strings. The enums here are the only place those strings are spelled out;
//! parsing is case-sensitive and rejects anything outside the enumeration.

pub mod access;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an identity (user account).
///
/// # Examples
///
/// ```rust
/// use campus::domain::UserId;
///
/// let id = UserId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "UserId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<UserId> for i32 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CourseId(i32);

impl CourseId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "CourseId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for CourseId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<CourseId> for i32 {
    fn from(id: CourseId) -> Self {
        id.0
    }
}

/// Error returned when a stored or submitted string is not part of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Implements `as_str`, `Display`, `FromStr` and string serde for a
/// unit-only enum from a single table of variants.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Role tag carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

string_enum!(Role, "role", {
    Student => "student",
    Instructor => "instructor",
    Admin => "admin",
});

impl Role {
    /// Path of the landing view for this role. Denied requests point callers here.
    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        match self {
            Self::Student => "/student/dashboard",
            Self::Instructor => "/instructor/dashboard",
            Self::Admin => "/admin/dashboard",
        }
    }
}

/// Enrollment status. `enrolled` doubles as "in progress"; there is no separate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnrollmentStatus {
    #[default]
    Enrolled,
    Completed,
    Dropped,
}

string_enum!(EnrollmentStatus, "enrollment status", {
    Enrolled => "enrolled",
    Completed => "completed",
    Dropped => "dropped",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

string_enum!(CourseLevel, "course level", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialType {
    Pdf,
    Doc,
    Ppt,
    Zip,
    Other,
}

string_enum!(MaterialType, "material type", {
    Pdf => "pdf",
    Doc => "doc",
    Ppt => "ppt",
    Zip => "zip",
    Other => "other",
});

/// Course progress as a whole percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Progress(i32);

impl Progress {
    pub const MAX: i32 = 100;

    /// Validates a raw percentage.
    pub fn new(value: i32) -> Result<Self, ParseEnumError> {
        if (0..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ParseEnumError::new("progress", &value.to_string()))
        }
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_exact() {
        assert_eq!("student".parse::<Role>(), Ok(Role::Student));
        assert_eq!("instructor".parse::<Role>(), Ok(Role::Instructor));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("Admin".parse::<Role>().is_err());
        assert!("teacher".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn in_progress_is_not_a_status() {
        let err = "in_progress".parse::<EnrollmentStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid enrollment status: 'in_progress'");
        assert!("pending".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn enums_round_trip_through_serde() {
        let json = serde_json::to_string(&EnrollmentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let level: CourseLevel = serde_json::from_str("\"advanced\"").unwrap();
        assert_eq!(level, CourseLevel::Advanced);
        assert!(serde_json::from_str::<MaterialType>("\"mp3\"").is_err());
    }

    #[test]
    fn progress_bounds() {
        assert!(Progress::new(0).is_ok());
        assert!(Progress::new(100).is_ok());
        assert!(Progress::new(-1).is_err());
        assert!(Progress::new(101).is_err());
    }

    #[test]
    fn home_paths_per_role() {
        assert_eq!(Role::Student.home_path(), "/student/dashboard");
        assert_eq!(Role::Admin.home_path(), "/admin/dashboard");
    }

    #[test]
    fn ids_convert() {
        let id = CourseId::new(3);
        assert_eq!(i32::from(id), 3);
        assert_eq!(UserId::from(9).value(), 9);
    }
}
