use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfkeep_core::{
    FacultyProfile, Profile, StudentProfile, User, UserFactory,
    constants::DEFAULT_STUDENT_YEAR,
};

/// Row form of an account as stored in the `users` table.
///
/// The persistence contract keeps identity, credential and role string in
/// fixed columns; role-specific profile fields live in nullable columns that
/// only the matching role uses.
///
/// # Fields
///
/// * `id` - Role-prefixed primary key (`STU100`, `FAC100`, `LIB100`)
/// * `name` - Display name, 1-100 characters
/// * `email` - Normalized login key, unique
/// * `credential_hash` - Salted hash in `salt:digest` form
/// * `user_type` - Stored role string (`Student`, `Faculty`, `Librarian`, `Head Librarian`)
/// * `major`, `year_of_study`, `fines_cents` - Student profile
/// * `department`, `position` - Faculty profile
/// * `hire_date` - Librarian profile
/// * `created_at` - Registration timestamp
///
/// # Examples
///
/// ```
/// use shelfkeep_core::{Role, UserFactory};
/// use shelfkeep_storage::models::UserRecord;
///
/// let user = UserFactory::create_for_role(Role::Student, "STU100", "Ann", "ann@x.edu", "s:d");
/// let record = UserRecord::from_user(&user);
/// assert_eq!(record.user_type, "Student");
///
/// let restored = record.into_user().expect("known role");
/// assert_eq!(restored, user);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub user_type: String,
    pub major: Option<String>,
    pub year_of_study: Option<i64>,
    pub fines_cents: i64,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Flatten a domain user into its row form.
    pub fn from_user(user: &User) -> Self {
        let mut record = Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            credential_hash: user.credential_hash.clone(),
            user_type: user.user_type().to_string(),
            major: None,
            year_of_study: None,
            fines_cents: 0,
            department: None,
            position: None,
            hire_date: None,
            created_at: Utc::now(),
        };

        match &user.profile {
            Profile::Student(p) => {
                record.major = Some(p.major.clone());
                record.year_of_study = Some(i64::from(p.year));
                record.fines_cents = p.fines_cents;
            }
            Profile::Faculty(p) => {
                record.department = Some(p.department.clone());
                record.position = Some(p.position.clone());
            }
            Profile::Librarian(p) => {
                record.hire_date = Some(p.hire_date);
            }
        }

        record
    }

    /// Rebuild the role-typed user through [`UserFactory`].
    ///
    /// Returns `None` if the stored role string is not recognized. Missing
    /// profile columns fall back to the factory defaults.
    pub fn into_user(self) -> Option<User> {
        let mut user = UserFactory::create(
            &self.user_type,
            &self.id,
            &self.name,
            &self.email,
            &self.credential_hash,
        )?;

        match &mut user.profile {
            Profile::Student(p) => {
                let defaults = StudentProfile::default();
                *p = StudentProfile {
                    major: self.major.unwrap_or(defaults.major),
                    year: self
                        .year_of_study
                        .and_then(|y| u8::try_from(y).ok())
                        .unwrap_or(DEFAULT_STUDENT_YEAR),
                    fines_cents: self.fines_cents,
                };
            }
            Profile::Faculty(p) => {
                let defaults = FacultyProfile::default();
                *p = FacultyProfile {
                    department: self.department.unwrap_or(defaults.department),
                    position: self.position.unwrap_or(defaults.position),
                };
            }
            Profile::Librarian(p) => {
                p.hire_date = self.hire_date.unwrap_or(self.created_at);
            }
        }

        Some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfkeep_core::Role;

    #[test]
    fn test_student_round_trip() {
        let mut user = UserFactory::create_for_role(Role::Student, "STU100", "Ann", "ann@x.edu", "h");
        if let Profile::Student(p) = &mut user.profile {
            p.major = "Physics".to_string();
            p.year = 3;
            p.fines_cents = 125;
        }

        let record = UserRecord::from_user(&user);
        assert_eq!(record.major.as_deref(), Some("Physics"));
        assert_eq!(record.year_of_study, Some(3));
        assert_eq!(record.fines_cents, 125);
        assert!(record.department.is_none());

        assert_eq!(record.into_user().unwrap(), user);
    }

    #[test]
    fn test_head_librarian_round_trip() {
        let user =
            UserFactory::create_for_role(Role::HeadLibrarian, "LIB100", "Admin", "a@x.edu", "h");
        let record = UserRecord::from_user(&user);
        assert_eq!(record.user_type, "Head Librarian");

        let restored = record.into_user().unwrap();
        assert_eq!(restored.role(), Role::HeadLibrarian);
        assert_eq!(restored, user);
    }

    #[test]
    fn test_missing_profile_columns_use_defaults() {
        let user = UserFactory::create_for_role(Role::Faculty, "FAC100", "Bo", "bo@x.edu", "h");
        let mut record = UserRecord::from_user(&user);
        record.department = None;
        record.position = None;

        let restored = record.into_user().unwrap();
        assert_eq!(restored.profile, Profile::Faculty(FacultyProfile::default()));
    }

    #[test]
    fn test_unknown_stored_role() {
        let user = UserFactory::create_for_role(Role::Student, "STU100", "Ann", "ann@x.edu", "h");
        let mut record = UserRecord::from_user(&user);
        record.user_type = "Visitor".to_string();
        assert!(record.into_user().is_none());
    }
}
