use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, Role, RoleSet};
use crate::config::config;
use crate::database::manager::ConstraintViolation;
use crate::database::models::user::{CreateUserInput, UpdateUserInput, User, UserView};
use crate::database::query_builder::{QueryBuilder, SqlParam};
use crate::database::repository::ListParams;
use crate::services::ServiceError;
use crate::validation::{optional_text, FieldErrors, NAME_LEN};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub roles: RoleSet,
    pub is_active: bool,
    pub program_studi_id: Option<Uuid>,
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !errors.max_len("email", "Email", email, NAME_LEN) {
        return;
    }
    let valid = email
        .split_once('@')
        .map_or(false, |(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        errors.add("email", "Email is not valid");
    }
}

fn check_full_name(errors: &mut FieldErrors, full_name: &Option<String>) {
    if let Some(name) = full_name {
        errors.max_len("full_name", "Full name", name, NAME_LEN);
    }
}

fn check_password(errors: &mut FieldErrors, password: &str, min_length: usize) {
    if password.chars().count() < min_length {
        errors.add("password", format!("Password must be at least {} characters", min_length));
    }
}

fn parse_roles(errors: &mut FieldErrors, names: &[String]) -> Option<RoleSet> {
    match RoleSet::parse(names) {
        Ok(roles) if roles.is_empty() => {
            errors.add("roles", "At least one role is required");
            None
        }
        Ok(roles) => Some(roles),
        Err(e) => {
            errors.add("roles", e);
            None
        }
    }
}

fn check_binding(errors: &mut FieldErrors, roles: &RoleSet, program_studi_id: Option<Uuid>) {
    if roles.contains(Role::Prodi) && program_studi_id.is_none() {
        errors.add("program_studi_id", "Program studi is required for prodi users");
    }
}

pub fn validate_new_user(input: CreateUserInput, min_password: usize) -> Result<NewUser, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = errors
        .required_text("email", "Email", input.email)
        .map(|e| e.to_lowercase());
    if let Some(email) = &email {
        check_email(&mut errors, email);
    }
    let password = errors.required("password", "Password", input.password);
    if let Some(password) = &password {
        check_password(&mut errors, password, min_password);
    }
    let roles = parse_roles(&mut errors, &input.roles.unwrap_or_default());
    if let Some(roles) = &roles {
        check_binding(&mut errors, roles, input.program_studi_id);
    }

    let full_name = optional_text(input.full_name);
    check_full_name(&mut errors, &full_name);

    let (Some(email), Some(password), Some(roles)) = (email, password, roles) else {
        return Err(errors);
    };
    errors.into_result()?;

    Ok(NewUser {
        email,
        password,
        full_name,
        roles,
        is_active: input.is_active.unwrap_or(true),
        program_studi_id: input.program_studi_id,
    })
}

/// Merge a partial update over the stored row
pub fn merge_update(current: &User, input: UpdateUserInput, min_password: usize) -> Result<(NewUser, bool), FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = match input.email {
        Some(email) => errors.required_text("email", "Email", Some(email)).map(|e| e.to_lowercase()),
        None => Some(current.email.clone()),
    };
    if let Some(email) = &email {
        check_email(&mut errors, email);
    }

    let password_changed = input.password.is_some();
    if let Some(password) = &input.password {
        check_password(&mut errors, password, min_password);
    }

    let roles = match input.roles {
        Some(names) => parse_roles(&mut errors, &names),
        None => Some(current.role_set()),
    };
    let program_studi_id = input.program_studi_id.unwrap_or(current.program_studi_id);
    if let Some(roles) = &roles {
        check_binding(&mut errors, roles, program_studi_id);
    }

    let full_name = match input.full_name {
        Some(name) => optional_text(Some(name)),
        None => current.full_name.clone(),
    };
    check_full_name(&mut errors, &full_name);

    let (Some(email), Some(roles)) = (email, roles) else {
        return Err(errors);
    };
    errors.into_result()?;

    Ok((
        NewUser {
            email,
            password: input.password.unwrap_or_default(),
            full_name,
            roles,
            is_active: input.is_active.unwrap_or(current.is_active),
            program_studi_id,
        },
        password_changed,
    ))
}

fn duplicate_email() -> ServiceError {
    ServiceError::Duplicate {
        field: "email".to_string(),
        message: "Email already registered".to_string(),
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("User not found".to_string())
}

fn map_write_error(err: sqlx::Error) -> ServiceError {
    match ConstraintViolation::classify(&err) {
        Some(ConstraintViolation::Unique(_)) => duplicate_email(),
        Some(ConstraintViolation::ForeignKey(_)) => ServiceError::field("program_studi_id", "Program studi not found"),
        _ => err.into(),
    }
}

/// Accounts and login
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<UserView>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let users = QueryBuilder::<User>::new("users")
            .search(&["email", "full_name"], params.search.as_deref())
            .order_by("email ASC")
            .paginate(params.limit, params.offset)
            .select_all(&mut conn)
            .await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let user = QueryBuilder::<User>::new("users")
            .where_eq("id", SqlParam::Uuid(id))
            .select_optional(&mut conn)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserView, ServiceError> {
        self.find(id).await?.map(UserView::from).ok_or_else(not_found)
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn create(&self, input: CreateUserInput) -> Result<UserView, ServiceError> {
        let user = validate_new_user(input, config().security.password_min_length)?;
        if self.email_taken(&user.email, None).await? {
            return Err(duplicate_email());
        }
        let password_hash = hash_password(&user.password)?;

        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, roles, is_active, program_studi_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&password_hash)
        .bind(&user.full_name)
        .bind(user.roles.to_strings())
        .bind(user.is_active)
        .bind(user.program_studi_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        tracing::info!(id = %row.id, email = %row.email, "user created");
        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, input: UpdateUserInput) -> Result<UserView, ServiceError> {
        let current = self.find(id).await?.ok_or_else(not_found)?;
        let (user, password_changed) = merge_update(&current, input, config().security.password_min_length)?;

        if user.email != current.email && self.email_taken(&user.email, Some(id)).await? {
            return Err(duplicate_email());
        }
        let password_hash = if password_changed {
            hash_password(&user.password)?
        } else {
            current.password_hash.clone()
        };

        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, full_name = $4, roles = $5, is_active = $6,
                program_studi_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.email)
        .bind(&password_hash)
        .bind(&user.full_name)
        .bind(user.roles.to_strings())
        .bind(user.is_active)
        .bind(user.program_studi_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or_else(not_found)?;

        tracing::info!(id = %id, password_changed, "user updated");
        Ok(row.into())
    }

    pub async fn delete(&self, id: Uuid, acting_user: Uuid) -> Result<(), ServiceError> {
        if id == acting_user {
            return Err(ServiceError::Rejected("You cannot delete your own account".to_string()));
        }
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tracing::info!(id = %id, "user deleted");
        Ok(())
    }

    /// Active account matching the credentials. Unknown email, inactive
    /// account and wrong password are not distinguished.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, ServiceError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        let Some(user) = user.filter(|u| u.is_active) else {
            return Ok(None);
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(e) => {
                tracing::warn!(user_id = %user.id, "Stored password hash unusable: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_input() -> CreateUserInput {
        CreateUserInput {
            email: Some(" Kaprodi@Example.ac.id ".into()),
            password: Some("rahasia123".into()),
            roles: Some(vec!["prodi".into()]),
            program_studi_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    fn stored() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "dosen@example.ac.id".into(),
            password_hash: "$argon2id$stored".into(),
            full_name: Some("Dosen".into()),
            roles: vec!["dosen".into()],
            is_active: true,
            program_studi_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_user_is_normalized() {
        let user = validate_new_user(create_input(), 6).unwrap();
        assert_eq!(user.email, "kaprodi@example.ac.id");
        assert!(user.roles.contains(Role::Prodi));
        assert!(user.is_active);
    }

    #[test]
    fn new_user_rules() {
        let mut input = create_input();
        input.password = Some("123".into());
        input.roles = Some(vec!["superuser".into()]);
        input.email = Some("not-an-email".into());
        let errors = validate_new_user(input, 6).unwrap_err();
        assert!(errors.get("password").is_some());
        assert!(errors.get("roles").is_some());
        assert!(errors.get("email").is_some());
    }

    #[test]
    fn prodi_needs_program_studi() {
        let mut input = create_input();
        input.program_studi_id = None;
        let errors = validate_new_user(input, 6).unwrap_err();
        assert!(errors.get("program_studi_id").is_some());
    }

    #[test]
    fn partial_update_keeps_stored_fields() {
        let current = stored();
        let (merged, password_changed) = merge_update(
            &current,
            UpdateUserInput {
                full_name: Some("Dr. Dosen".into()),
                ..Default::default()
            },
            6,
        )
        .unwrap();
        assert!(!password_changed);
        assert_eq!(merged.email, current.email);
        assert_eq!(merged.full_name.as_deref(), Some("Dr. Dosen"));
        assert!(merged.roles.contains(Role::Dosen));
    }

    #[test]
    fn demotion_can_clear_program_studi() {
        let mut current = stored();
        current.roles = vec!["prodi".into()];
        current.program_studi_id = Some(Uuid::new_v4());

        let (merged, _) = merge_update(
            &current,
            UpdateUserInput {
                roles: Some(vec!["dosen".into()]),
                program_studi_id: Some(None),
                ..Default::default()
            },
            6,
        )
        .unwrap();
        assert_eq!(merged.program_studi_id, None);
        assert!(merged.roles.contains(Role::Dosen));

        // Absent keeps the binding
        let (kept, _) = merge_update(&current, UpdateUserInput::default(), 6).unwrap();
        assert_eq!(kept.program_studi_id, current.program_studi_id);
    }

    #[test]
    fn prodi_cannot_lose_program_studi() {
        let mut current = stored();
        current.roles = vec!["prodi".into()];
        current.program_studi_id = Some(Uuid::new_v4());
        let errors = merge_update(
            &current,
            UpdateUserInput {
                program_studi_id: Some(None),
                ..Default::default()
            },
            6,
        )
        .unwrap_err();
        assert!(errors.get("program_studi_id").is_some());
    }

    #[test]
    fn overlong_email_is_a_field_error() {
        let mut input = create_input();
        input.email = Some(format!("{}@example.ac.id", "a".repeat(300)));
        let errors = validate_new_user(input, 6).unwrap_err();
        assert_eq!(errors.get("email"), Some("Email must be at most 255 characters"));
    }

    #[test]
    fn update_to_prodi_checks_binding() {
        let errors = merge_update(
            &stored(),
            UpdateUserInput {
                roles: Some(vec!["prodi".into()]),
                ..Default::default()
            },
            6,
        )
        .unwrap_err();
        assert!(errors.get("program_studi_id").is_some());
    }
}
