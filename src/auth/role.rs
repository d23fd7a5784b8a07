use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Prodi,
    #[serde(alias = "lecturer")]
    Dosen,
    Student,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Prodi, Role::Dosen, Role::Student];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Prodi => "prodi",
            Role::Dosen => "dosen",
            Role::Student => "student",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Admin => "Administrator: program studi and user management",
            Role::Prodi => "Program studi staff: curriculum and OBE data management",
            Role::Dosen => "Lecturer: teaching and assessment access",
            Role::Student => "Student: read-only course and OBE access",
        }
    }

    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Role::Admin => &[
                "user.view",
                "user.create",
                "user.edit",
                "user.delete",
                "program_studi.view",
                "program_studi.create",
                "program_studi.edit",
                "program_studi.delete",
            ],
            Role::Prodi => &[
                "kurikulum.view",
                "kurikulum.create",
                "kurikulum.edit",
                "cpl.view",
                "cpl.create",
                "cpl.edit",
                "mata_kuliah.view",
                "mata_kuliah.create",
                "mata_kuliah.edit",
                "cpmk.view",
                "cpmk.create",
                "cpmk.edit",
                "obe.view",
                "obe.manage",
                "report.view",
            ],
            Role::Dosen => &[
                "student.view",
                "course.view",
                "course.edit",
                "obe.view",
                "assessment.view",
                "assessment.create",
                "assessment.edit",
                "assessment.grade",
                "report.view",
            ],
            Role::Student => &["course.view", "obe.view", "assessment.view", "report.view"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "prodi" => Ok(Role::Prodi),
            "dosen" | "lecturer" => Ok(Role::Dosen),
            "student" => Ok(Role::Student),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// Route groups with a shared access rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// PL, CPL, CPMK, MK, BK, Kurikulum and every mapping
    Curriculum,
    /// Program studi and user accounts
    Administration,
}

impl Area {
    pub fn permits(self, role: Role) -> bool {
        match (self, role) {
            (Area::Curriculum, Role::Admin | Role::Prodi) => true,
            (Area::Curriculum, Role::Dosen | Role::Student) => false,
            (Area::Administration, Role::Admin) => true,
            (Area::Administration, Role::Prodi | Role::Dosen | Role::Student) => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict parse for user input; the first unknown name is an error
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names
            .iter()
            .map(|name| name.as_ref().parse::<Role>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map(RoleSet)
    }

    /// Lenient parse for stored rows; unknown names are dropped
    pub fn from_stored<S: AsRef<str>>(names: &[S]) -> Self {
        RoleSet(
            names
                .iter()
                .filter_map(|name| match name.as_ref().parse::<Role>() {
                    Ok(role) => Some(role),
                    Err(e) => {
                        tracing::warn!("Ignoring stored role: {}", e);
                        None
                    }
                })
                .collect(),
        )
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    pub fn allows(&self, area: Area) -> bool {
        self.iter().any(|role| area.permits(role))
    }

    /// Union of the permissions of every held role, sorted
    pub fn permissions(&self) -> Vec<String> {
        self.iter()
            .flat_map(|role| role.permissions().iter())
            .map(|p| p.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|role| role.as_str().to_string()).collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lecturer_is_an_alias_for_dosen() {
        assert_eq!("lecturer".parse::<Role>().unwrap(), Role::Dosen);
        assert_eq!("DOSEN".parse::<Role>().unwrap(), Role::Dosen);
        let parsed: Role = serde_json::from_str("\"lecturer\"").unwrap();
        assert_eq!(parsed, Role::Dosen);
        assert_eq!(serde_json::to_string(&Role::Dosen).unwrap(), "\"dosen\"");
    }

    #[test]
    fn area_policy() {
        assert!(Area::Curriculum.permits(Role::Admin));
        assert!(Area::Curriculum.permits(Role::Prodi));
        assert!(!Area::Curriculum.permits(Role::Dosen));
        assert!(!Area::Curriculum.permits(Role::Student));
        assert!(Area::Administration.permits(Role::Admin));
        assert!(!Area::Administration.permits(Role::Prodi));
    }

    #[test]
    fn role_set_allows_when_any_role_permits() {
        let set: RoleSet = [Role::Student, Role::Prodi].into_iter().collect();
        assert!(set.allows(Area::Curriculum));
        assert!(!set.allows(Area::Administration));
        assert!(!RoleSet::new().allows(Area::Curriculum));
    }

    #[test]
    fn strict_and_lenient_parsing() {
        assert!(RoleSet::parse(&["admin", "superuser"]).is_err());
        let set = RoleSet::from_stored(&["admin", "superuser", "lecturer"]);
        assert_eq!(set.to_strings(), vec!["admin", "dosen"]);
    }

    #[test]
    fn permissions_are_merged_and_sorted() {
        let set: RoleSet = [Role::Dosen, Role::Student].into_iter().collect();
        let perms = set.permissions();
        assert_eq!(perms.iter().filter(|p| *p == "obe.view").count(), 1);
        let mut sorted = perms.clone();
        sorted.sort();
        assert_eq!(perms, sorted);
    }
}
