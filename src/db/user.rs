use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role, exposed in the public identity view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Player,
    Author,
    Editor,
    Administrator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Player => "player",
            UserRole::Author => "author",
            UserRole::Editor => "editor",
            UserRole::Administrator => "administrator",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "author" => UserRole::Author,
            "editor" => UserRole::Editor,
            "administrator" => UserRole::Administrator,
            _ => UserRole::Player,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub date_of_birth: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    display_name: String,
    date_of_birth: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            date_of_birth: row.date_of_birth,
            role: UserRole::from_str(&row.role),
        }
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub display_name: &'a str,
    /// ISO 8601 date (YYYY-MM-DD)
    pub date_of_birth: &'a str,
    pub role: UserRole,
}

/// Column whose uniqueness constraint rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::Username => "username",
        }
    }
}

#[derive(Debug)]
pub enum CreateUserError {
    /// Email or username already taken
    Duplicate(UniqueField),
    Database(sqlx::Error),
}

impl std::fmt::Display for CreateUserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateUserError::Duplicate(field) => write!(f, "{} already used", field.as_str()),
            CreateUserError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for CreateUserError {}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    /// Uniqueness is enforced by the table constraints, not by a prior lookup.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, CreateUserError> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, display_name, date_of_birth, role) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.display_name)
        .bind(user.date_of_birth)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => Ok(result.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                // SQLite reports the violated column as "users.<column>".
                let field = if e.message().contains("users.email") {
                    UniqueField::Email
                } else {
                    UniqueField::Username
                };
                Err(CreateUserError::Duplicate(field))
            }
            Err(e) => Err(CreateUserError::Database(e)),
        }
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, display_name, date_of_birth, role FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Find a user by email, falling back to username.
    pub async fn find_by_email_or_username(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, display_name, date_of_birth, role FROM users WHERE email = ?1 OR username = ?1 ORDER BY email = ?1 DESC LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }
}
