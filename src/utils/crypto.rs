use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

const MASTER_SECRET_FILE: &str = "vault.key";
const VERSION_PREFIX: &str = "v1:";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 120_000;

/// Encrypts stored API keys at rest. The master secret lives in a
/// file next to the database; per-entry keys are derived from it with a
/// random salt so identical plaintexts never share ciphertext.
#[derive(Clone)]
pub struct CryptoVault {
    secret_path: PathBuf,
}

impl CryptoVault {
    pub fn from_database_path(path: &Path) -> AppResult<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| AppError::other("数据库路径缺少父目录，无法定位密钥文件"))?;
        Ok(Self {
            secret_path: parent.join(MASTER_SECRET_FILE),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> AppResult<String> {
        let master = self.load_or_create_master_secret()?;
        encrypt_with_master(&master, plaintext)
    }

    pub fn decrypt(&self, ciphertext: &str) -> AppResult<Vec<u8>> {
        let master = self.load_or_create_master_secret()?;
        decrypt_with_master(&master, ciphertext)
    }

    pub fn clear_master_secret(&self) -> AppResult<()> {
        match fs::remove_file(&self.secret_path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::other(format!("无法删除主密钥文件: {err}"))),
        }
    }

    fn load_or_create_master_secret(&self) -> AppResult<Vec<u8>> {
        match fs::read_to_string(&self.secret_path) {
            Ok(encoded) => decode_master_secret(encoded.trim()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => self.create_master_secret(),
            Err(err) => Err(AppError::other(format!("无法读取主密钥文件: {err}"))),
        }
    }

    fn create_master_secret(&self) -> AppResult<Vec<u8>> {
        let mut secret = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut secret);
        let encoded = Base64.encode(&secret);

        if let Some(parent) = self.secret_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.secret_path, &encoded)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.secret_path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(secret)
    }
}

pub(crate) fn encrypt_with_master(master_secret: &[u8], plaintext: &[u8]) -> AppResult<String> {
    if master_secret.len() != KEY_LEN {
        return Err(AppError::other("主密钥长度无效"));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(master_secret, &salt);
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| AppError::other("无法初始化加密器"))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| AppError::other("加密失败"))?;

    let mut payload = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&salt);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);

    Ok(format!("{VERSION_PREFIX}{}", Base64.encode(payload)))
}

pub(crate) fn decrypt_with_master(master_secret: &[u8], ciphertext: &str) -> AppResult<Vec<u8>> {
    if master_secret.len() != KEY_LEN {
        return Err(AppError::other("主密钥长度无效"));
    }

    let encoded = ciphertext
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| AppError::other("密文格式不受支持"))?;

    let decoded = Base64
        .decode(encoded.as_bytes())
        .map_err(|_| AppError::other("密文损坏，无法解码"))?;

    if decoded.len() <= SALT_LEN + NONCE_LEN {
        return Err(AppError::other("密文数据长度无效"));
    }

    let (salt, rest) = decoded.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext_bytes) = rest.split_at(NONCE_LEN);

    let key = derive_key(master_secret, salt);
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| AppError::other("无法初始化解密器"))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext_bytes)
        .map_err(|_| AppError::other("解密失败"))
}

fn derive_key(master: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(master, salt, PBKDF2_ITERATIONS, &mut key);
    key
}

fn decode_master_secret(encoded: &str) -> AppResult<Vec<u8>> {
    let secret = Base64
        .decode(encoded.as_bytes())
        .map_err(|_| AppError::other("主密钥文件内容损坏"))?;
    if secret.len() != KEY_LEN {
        return Err(AppError::other("主密钥文件内容长度无效"));
    }
    Ok(secret)
}
