use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::warn;

use crate::db::repositories::secret_repository::SecretRepository;
use crate::db::repositories::settings_repository::{AppSettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::schedule::TEMPLATE_COUNT;
use crate::models::settings::AppSettings;
use crate::models::tracker::WeightUnit;
use crate::utils::crypto::CryptoVault;

pub const KEY_OPENAI_API: &str = "openai_api_key";
pub const KEY_RAPIDAPI: &str = "rapidapi_key";
const KEY_ROTATION_OFFSET: &str = "rotation_offset";
const KEY_TIMEZONE: &str = "timezone";
const KEY_WEIGHT_UNIT: &str = "weight_unit";
const KEY_THEME: &str = "theme";

const DEFAULT_ROTATION_OFFSET: u8 = 0;
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_WEIGHT_UNIT: WeightUnit = WeightUnit::Kg;
const DEFAULT_THEME: &str = "system";
const THEME_OPTIONS: [&str; 3] = ["system", "light", "dark"];

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub openai_api_key: Option<Option<String>>,
    pub rapidapi_key: Option<Option<String>>,
    pub rotation_offset: Option<u8>,
    pub timezone: Option<String>,
    pub weight_unit: Option<WeightUnit>,
    pub theme: Option<String>,
}

pub struct SettingsService {
    db: DbPool,
    vault: CryptoVault,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> AppResult<Self> {
        let vault = CryptoVault::from_database_path(db.path())?;
        Ok(Self {
            db,
            vault,
            cache: RwLock::new(None),
        })
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut current = self.get()?;

        if let Some(offset) = input.rotation_offset {
            ensure_valid_offset(offset)?;
            current.rotation_offset = offset;
        }

        if let Some(timezone) = input.timezone.as_ref() {
            let trimmed = timezone.trim();
            if trimmed.parse::<chrono_tz::Tz>().is_err() {
                return Err(AppError::validation(format!(
                    "无效的时区名称: {trimmed}"
                )));
            }
            current.timezone = trimmed.to_string();
        }

        if let Some(unit) = input.weight_unit {
            current.weight_unit = unit;
        }

        if let Some(theme) = input.theme.as_ref() {
            let normalized = theme.trim().to_lowercase();
            if normalized.is_empty() {
                return Err(AppError::validation("主题不能为空"));
            }
            if !THEME_OPTIONS.contains(&normalized.as_str()) {
                return Err(AppError::validation("主题仅支持 system、light 或 dark"));
            }
            current.theme = normalized;
        }

        let openai_instr = self.prepare_secret_instruction(&input.openai_api_key)?;
        let rapidapi_instr = self.prepare_secret_instruction(&input.rapidapi_key)?;

        apply_masked(&mut current.openai_api_key, &openai_instr);
        apply_masked(&mut current.rapidapi_key, &rapidapi_instr);

        let now = Utc::now().to_rfc3339();
        self.persist_changes(&input, &openai_instr, &rapidapi_instr)?;
        current.updated_at = now;

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    /// Remove every stored API key and the master secret they were wrapped with.
    pub fn clear_sensitive(&self) -> AppResult<()> {
        self.db.with_connection(|conn| {
            SecretRepository::delete(conn, KEY_OPENAI_API)?;
            SecretRepository::delete(conn, KEY_RAPIDAPI)?;
            Ok(())
        })?;

        if let Err(err) = self.vault.clear_master_secret() {
            warn!(
                target: "app::settings",
                error = %err,
                "failed to clear vault master secret"
            );
        }

        if let Ok(mut guard) = self.cache.write() {
            if let Some(settings) = guard.as_mut() {
                settings.openai_api_key = None;
                settings.rapidapi_key = None;
                settings.updated_at = Utc::now().to_rfc3339();
            }
        }

        Ok(())
    }

    fn persist_changes(
        &self,
        input: &SettingsUpdateInput,
        openai_instr: &SecretInstruction,
        rapidapi_instr: &SecretInstruction,
    ) -> AppResult<()> {
        let rotation_offset = input.rotation_offset;
        let timezone = input.timezone.as_ref().map(|value| value.trim().to_string());
        let weight_unit = input.weight_unit;
        let theme = input.theme.as_ref().map(|value| value.trim().to_lowercase());

        self.db.with_connection(|conn| {
            openai_instr.apply(conn, KEY_OPENAI_API)?;
            rapidapi_instr.apply(conn, KEY_RAPIDAPI)?;

            if let Some(value) = rotation_offset {
                SettingsRepository::upsert(conn, KEY_ROTATION_OFFSET, &value.to_string())?;
            }

            if let Some(value) = timezone {
                SettingsRepository::upsert(conn, KEY_TIMEZONE, &value)?;
            }

            if let Some(value) = weight_unit {
                SettingsRepository::upsert(conn, KEY_WEIGHT_UNIT, value.as_str())?;
            }

            if let Some(value) = theme {
                SettingsRepository::upsert(conn, KEY_THEME, &value)?;
            }

            Ok(())
        })
    }

    fn prepare_secret_instruction(
        &self,
        input: &Option<Option<String>>,
    ) -> AppResult<SecretInstruction> {
        match input {
            None => Ok(SecretInstruction::no_change()),
            Some(None) => Ok(SecretInstruction::clear()),
            Some(Some(value)) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::validation("API Key 不能为空"));
                }
                let cipher = self.vault.encrypt(trimmed.as_bytes())?;
                Ok(SecretInstruction::set(cipher, mask_api_key(trimmed)))
            }
        }
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        self.db.with_connection(|conn| {
            let rows = SettingsRepository::list(conn)?;
            let mut map: HashMap<String, AppSettingRow> = HashMap::new();
            let mut latest_updated_at: Option<String> = None;

            for row in rows {
                latest_updated_at = match latest_updated_at {
                    Some(ref current) if current >= &row.updated_at => Some(current.clone()),
                    _ => Some(row.updated_at.clone()),
                };
                map.insert(row.key.clone(), row);
            }

            let openai_api_key = self.masked_secret(conn, KEY_OPENAI_API, &mut latest_updated_at)?;
            let rapidapi_key = self.masked_secret(conn, KEY_RAPIDAPI, &mut latest_updated_at)?;

            let rotation_offset = map
                .get(KEY_ROTATION_OFFSET)
                .and_then(|row| row.value.parse::<u8>().ok())
                .filter(|value| (*value as usize) < TEMPLATE_COUNT)
                .unwrap_or(DEFAULT_ROTATION_OFFSET);

            let timezone = map
                .get(KEY_TIMEZONE)
                .map(|row| row.value.clone())
                .filter(|value| value.parse::<chrono_tz::Tz>().is_ok())
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

            let weight_unit = map
                .get(KEY_WEIGHT_UNIT)
                .and_then(|row| WeightUnit::try_from(row.value.as_str()).ok())
                .unwrap_or(DEFAULT_WEIGHT_UNIT);

            let theme = map
                .get(KEY_THEME)
                .map(|row| row.value.to_lowercase())
                .filter(|value| THEME_OPTIONS.contains(&value.as_str()))
                .unwrap_or_else(|| DEFAULT_THEME.to_string());

            let updated_at = latest_updated_at.unwrap_or_else(|| Utc::now().to_rfc3339());

            Ok(AppSettings {
                openai_api_key,
                rapidapi_key,
                rotation_offset,
                timezone,
                weight_unit,
                theme,
                updated_at,
            })
        })
    }

    fn masked_secret(
        &self,
        conn: &rusqlite::Connection,
        key: &str,
        latest_updated_at: &mut Option<String>,
    ) -> AppResult<Option<String>> {
        let row = match SecretRepository::get(conn, key)? {
            Some(row) => row,
            None => return Ok(None),
        };

        *latest_updated_at = match latest_updated_at.take() {
            Some(current) if current >= row.updated_at => Some(current),
            _ => Some(row.updated_at.clone()),
        };

        match self.decrypt_secret(&row.value) {
            Ok(plain) => Ok(Some(mask_api_key(&plain))),
            Err(err) => {
                warn!(
                    target: "app::settings",
                    %key,
                    error = %err,
                    "failed to decrypt stored api key"
                );
                Ok(None)
            }
        }
    }

    /// Plaintext secret for provider configuration. Stored value only; env
    /// overrides are resolved by the services that own the provider.
    pub fn stored_secret_plaintext(&self, key: &str) -> AppResult<Option<String>> {
        let row = self
            .db
            .with_connection(|conn| SecretRepository::get(conn, key))?;

        match row {
            Some(row) => {
                let plain = self.decrypt_secret(&row.value)?;
                let trimmed = plain.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            None => Ok(None),
        }
    }

    fn decrypt_secret(&self, ciphertext: &str) -> AppResult<String> {
        let plain = self.vault.decrypt(ciphertext)?;
        String::from_utf8(plain).map_err(|_| AppError::other("密钥内容包含非法字符"))
    }
}

#[derive(Debug, Clone)]
struct SecretInstruction {
    action: SecretAction,
    ciphertext: Option<String>,
    masked: Option<String>,
}

impl SecretInstruction {
    fn no_change() -> Self {
        Self {
            action: SecretAction::NoChange,
            ciphertext: None,
            masked: None,
        }
    }

    fn clear() -> Self {
        Self {
            action: SecretAction::Clear,
            ciphertext: None,
            masked: None,
        }
    }

    fn set(ciphertext: String, masked: String) -> Self {
        Self {
            action: SecretAction::Set,
            ciphertext: Some(ciphertext),
            masked: Some(masked),
        }
    }

    fn apply(&self, conn: &rusqlite::Connection, key: &str) -> AppResult<()> {
        match self.action {
            SecretAction::Set => {
                if let Some(cipher) = self.ciphertext.as_ref() {
                    SecretRepository::upsert(conn, key, cipher)?;
                }
            }
            SecretAction::Clear => {
                SecretRepository::delete(conn, key)?;
            }
            SecretAction::NoChange => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SecretAction {
    Set,
    Clear,
    NoChange,
}

fn apply_masked(slot: &mut Option<String>, instr: &SecretInstruction) {
    match instr.action {
        SecretAction::Set => {
            if let Some(masked) = instr.masked.clone() {
                *slot = Some(masked);
            }
        }
        SecretAction::Clear => {
            *slot = None;
        }
        SecretAction::NoChange => {}
    }
}

fn mask_api_key(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    let masked_prefix = "*".repeat(chars.len() - 4);
    format!("{}{}", masked_prefix, visible)
}

fn ensure_valid_offset(value: u8) -> AppResult<()> {
    if (value as usize) >= TEMPLATE_COUNT {
        return Err(AppError::validation(format!(
            "排程偏移必须在 0~{} 之间",
            TEMPLATE_COUNT - 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("settings.db");
        let pool = DbPool::new(&db_path).unwrap();
        let service = SettingsService::new(pool).unwrap();
        (service, temp_dir)
    }

    #[test]
    fn defaults_are_returned_when_no_settings_exist() {
        let (service, _guard) = setup_service();
        let settings = service.get().unwrap();

        assert_eq!(settings.rotation_offset, DEFAULT_ROTATION_OFFSET);
        assert_eq!(settings.timezone, DEFAULT_TIMEZONE);
        assert_eq!(settings.weight_unit, WeightUnit::Kg);
        assert_eq!(settings.theme, DEFAULT_THEME);
        assert!(settings.openai_api_key.is_none());
        assert!(settings.rapidapi_key.is_none());
    }

    #[test]
    fn update_persists_and_masks_api_key() {
        let (service, _guard) = setup_service();
        let input = SettingsUpdateInput {
            openai_api_key: Some(Some("sk-test-123456".to_string())),
            rotation_offset: Some(3),
            timezone: Some("America/Toronto".to_string()),
            weight_unit: Some(WeightUnit::Lbs),
            theme: Some("dark".to_string()),
            ..Default::default()
        };

        let updated = service.update(input).unwrap();
        assert_eq!(updated.rotation_offset, 3);
        assert_eq!(updated.timezone, "America/Toronto");
        assert_eq!(updated.weight_unit, WeightUnit::Lbs);
        assert_eq!(updated.theme, "dark");
        assert_eq!(updated.openai_api_key, Some("**********3456".to_string()));

        let settings = service.get().unwrap();
        assert_eq!(settings.openai_api_key, Some("**********3456".to_string()));
        assert_eq!(
            service.stored_secret_plaintext(KEY_OPENAI_API).unwrap(),
            Some("sk-test-123456".to_string())
        );
    }

    #[test]
    fn rotation_offset_out_of_range_is_rejected() {
        let (service, _guard) = setup_service();
        let result = service.update(SettingsUpdateInput {
            rotation_offset: Some(7),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let (service, _guard) = setup_service();
        let result = service.update(SettingsUpdateInput {
            timezone: Some("Mars/Olympus_Mons".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn clear_sensitive_removes_api_keys() {
        let (service, _guard) = setup_service();
        service
            .update(SettingsUpdateInput {
                openai_api_key: Some(Some("sk-should-remove".to_string())),
                rapidapi_key: Some(Some("rapid-should-remove".to_string())),
                ..Default::default()
            })
            .unwrap();

        service.clear_sensitive().unwrap();
        let settings = service.get().unwrap();
        assert!(settings.openai_api_key.is_none());
        assert!(settings.rapidapi_key.is_none());
        assert!(service
            .stored_secret_plaintext(KEY_OPENAI_API)
            .unwrap()
            .is_none());
    }

    #[test]
    fn persisted_settings_survive_service_restart() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("settings.db");

        {
            let pool = DbPool::new(&db_path).unwrap();
            let service = SettingsService::new(pool).unwrap();
            service
                .update(SettingsUpdateInput {
                    rotation_offset: Some(5),
                    ..Default::default()
                })
                .unwrap();
        }

        let pool = DbPool::new(&db_path).unwrap();
        let service = SettingsService::new(pool).unwrap();
        assert_eq!(service.get().unwrap().rotation_offset, 5);
    }
}
