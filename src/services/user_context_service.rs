use crate::error::AppError;
use crate::models::UserContext;
use rusqlite::Connection;

const DEVICE_ID_KEY: &str = "device_id";

/// Loads the persisted user context (with the device id filled in)
pub fn load_user_context(conn: &Connection) -> Result<Option<UserContext>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, jwt_token, auto_upload_enabled, wifi_only_upload, background_upload_enabled, updated_at
         FROM user_context
         WHERE id = 1",
    )?;

    let result = stmt.query_row([], |row| {
        Ok(UserContext {
            user_id: row.get(0)?,
            jwt_token: row.get(1)?,
            auto_upload_enabled: row.get(2)?,
            wifi_only_upload: row.get(3)?,
            background_upload_enabled: row.get(4)?,
            device_id: None,
            updated_at: row.get(5)?,
        })
    });

    match result {
        Ok(mut context) => {
            context.device_id = Some(get_device_id(conn)?);
            Ok(Some(context))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// Saves or replaces the user context
pub fn save_user_context(conn: &Connection, context: &UserContext) -> Result<(), AppError> {
    if context.user_id.trim().is_empty() {
        return Err(AppError::Validation("user id must not be empty".to_string()));
    }

    conn.execute(
        "INSERT INTO user_context (id, user_id, jwt_token, auto_upload_enabled, wifi_only_upload, background_upload_enabled)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            user_id = excluded.user_id,
            jwt_token = excluded.jwt_token,
            auto_upload_enabled = excluded.auto_upload_enabled,
            wifi_only_upload = excluded.wifi_only_upload,
            background_upload_enabled = excluded.background_upload_enabled",
        (
            &context.user_id,
            &context.jwt_token,
            context.auto_upload_enabled,
            context.wifi_only_upload,
            context.background_upload_enabled,
        ),
    )?;

    log::info!(
        "User context saved for {} (auto-upload: {}, wifi-only: {}, background: {})",
        context.user_id,
        context.auto_upload_enabled,
        context.wifi_only_upload,
        context.background_upload_enabled
    );
    Ok(())
}

/// Signs out: removes the user context. The device id is kept.
pub fn clear_user_context(conn: &Connection) -> Result<(), AppError> {
    conn.execute("DELETE FROM user_context", [])?;
    log::info!("User context cleared");
    Ok(())
}

/// Stable device id (generated and stored on first use)
pub fn get_device_id(conn: &Connection) -> Result<String, AppError> {
    let existing = conn.query_row(
        "SELECT value FROM app_settings WHERE key = ?1",
        [DEVICE_ID_KEY],
        |row| row.get::<_, String>(0),
    );

    match existing {
        Ok(id) => Ok(id),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let new_id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO app_settings (key, value) VALUES (?1, ?2)",
                (DEVICE_ID_KEY, &new_id),
            )?;
            log::info!("Generated device id {}", new_id);
            Ok(new_id)
        }
        Err(e) => Err(AppError::Database(e)),
    }
}
