use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{db_time, opt_db_time, opt_time_column, parsed_column, time_column, Storage};
use crate::error::Result;
use crate::model::{LocalizedName, User};

const USER_COLUMNS: &str = "id, username, english_name, arabic_name, email, password_hash, \
     apartment_id, role, is_active, preferred_language, created_at, created_by, updated_at, \
     last_login, password_changed_at";

impl Storage {
    /// Insert or overwrite an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including a
    /// username already taken by another id.
    pub fn put_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
                 ON CONFLICT(id) DO UPDATE SET \
                 username = excluded.username, english_name = excluded.english_name, \
                 arabic_name = excluded.arabic_name, email = excluded.email, \
                 password_hash = excluded.password_hash, apartment_id = excluded.apartment_id, \
                 role = excluded.role, is_active = excluded.is_active, \
                 preferred_language = excluded.preferred_language, \
                 created_at = excluded.created_at, created_by = excluded.created_by, \
                 updated_at = excluded.updated_at, last_login = excluded.last_login, \
                 password_changed_at = excluded.password_changed_at"
            ),
            params![
                user.id,
                user.username,
                user.name.english_name,
                user.name.arabic_name,
                user.email,
                user.password_hash,
                user.apartment_id,
                user.role.as_str(),
                user.is_active,
                user.preferred_language.code(),
                db_time(&user.created_at),
                user.created_by,
                db_time(&user.updated_at),
                opt_db_time(user.last_login.as_ref()),
                opt_db_time(user.password_changed_at.as_ref()),
            ],
        )?;
        debug!(id = %user.id, username = %user.username, "Saved user");
        Ok(())
    }

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get an account by login name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List accounts, optionally only those of one apartment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self, apartment_id: Option<&str>) -> Result<Vec<User>> {
        let users = match apartment_id {
            Some(apartment) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE apartment_id = ?1 ORDER BY username"
                ))?;
                let rows = stmt
                    .query_map([apartment], Self::row_to_user)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))?;
                let rows = stmt
                    .query_map([], Self::row_to_user)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(users)
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            name: LocalizedName {
                english_name: row.get(2)?,
                arabic_name: row.get(3)?,
            },
            email: row.get(4)?,
            password_hash: row.get(5)?,
            apartment_id: row.get(6)?,
            role: parsed_column(row, 7)?,
            is_active: row.get(8)?,
            preferred_language: parsed_column(row, 9)?,
            created_at: time_column(row, 10)?,
            created_by: row.get(11)?,
            updated_at: time_column(row, 12)?,
            last_login: opt_time_column(row, 13)?,
            password_changed_at: opt_time_column(row, 14)?,
        })
    }
}
