use crate::common::paths::write_atomic;
use crate::common::{FacegateError, Result};
use crate::core::identity;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// One credential record in the account store. `hash_face` binds the
/// account to its enrolled identity through the two-stage hash chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub username: String,
    pub face_added: bool,
    pub hash_pass: String,
    pub hash_face: String,
}

/// Field subset accepted by `update_fields`; `None` leaves a field alone.
#[derive(Debug, Default)]
pub struct AccountUpdate {
    pub hash_pass: Option<String>,
    pub hash_face: Option<String>,
    pub face_added: Option<bool>,
}

/// Account store contract. The document store behind it is an external
/// collaborator; only this surface is assumed.
pub trait AccountStore {
    fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>>;
    /// Insert a record and return the generated record id.
    fn insert(&self, record: &AccountRecord) -> Result<String>;
    fn update_fields(&self, id: &str, update: AccountUpdate) -> Result<()>;
}

/// File-backed store: one bincode file per username, ids generated locally.
pub struct FileAccountStore {
    dir: PathBuf,
}

impl FileAccountStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}.bincode", username))
    }

    fn generate_id() -> String {
        let mut rng = rand::thread_rng();
        (0..12).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
    }

    fn write_record(&self, record: &AccountRecord) -> Result<()> {
        let encoded = bincode::serialize(record)
            .map_err(|e| FacegateError::Storage(format!("Failed to serialize account: {}", e)))?;
        write_atomic(&self.record_path(&record.username), &encoded)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<AccountRecord>> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            let data = fs::read(entry.path())?;
            let record: AccountRecord = bincode::deserialize(&data).map_err(|e| {
                FacegateError::Storage(format!("Failed to deserialize account: {}", e))
            })?;
            if record.id == id {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl AccountStore for FileAccountStore {
    fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>> {
        let path = self.record_path(username);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)?;
        let record = bincode::deserialize(&data)
            .map_err(|e| FacegateError::Storage(format!("Failed to deserialize account: {}", e)))?;
        Ok(Some(record))
    }

    fn insert(&self, record: &AccountRecord) -> Result<String> {
        if self.record_path(&record.username).exists() {
            return Err(FacegateError::Storage(format!(
                "Account '{}' already exists",
                record.username
            )));
        }
        let mut stored = record.clone();
        stored.id = Self::generate_id();
        self.write_record(&stored)?;
        Ok(stored.id)
    }

    fn update_fields(&self, id: &str, update: AccountUpdate) -> Result<()> {
        let mut record = self
            .find_by_id(id)?
            .ok_or_else(|| FacegateError::AccountNotFound(format!("id {}", id)))?;

        if let Some(hash_pass) = update.hash_pass {
            record.hash_pass = hash_pass;
        }
        if let Some(hash_face) = update.hash_face {
            record.hash_face = hash_face;
        }
        if let Some(face_added) = update.face_added {
            record.face_added = face_added;
        }
        self.write_record(&record)
    }
}

/// Two-phase account creation. The record id only exists after the first
/// insert, so the record goes in with the provisional stage1 hash, the
/// generated id is read back, and hash_face is recomputed with the full
/// chain. Skipping the overwrite would leave an unusable id-less hash.
pub fn create_account(
    store: &dyn AccountStore,
    name: &str,
    username: &str,
    password: &str,
) -> Result<AccountRecord> {
    let record = AccountRecord {
        id: String::new(),
        name: name.to_string(),
        username: username.to_string(),
        face_added: false,
        hash_pass: identity::hash_password(password),
        hash_face: identity::stage1_digest(username, name),
    };

    let id = store.insert(&record)?;
    let hash_face = identity::derive_at_enrollment(username, name, &id);
    store.update_fields(
        &id,
        AccountUpdate {
            hash_face: Some(hash_face),
            ..AccountUpdate::default()
        },
    )?;

    store
        .find_by_username(username)?
        .ok_or_else(|| FacegateError::AccountNotFound(username.to_string()))
}

pub fn login_with_password(
    store: &dyn AccountStore,
    username: &str,
    password: &str,
) -> Result<bool> {
    match store.find_by_username(username)? {
        Some(record) => Ok(record.hash_pass == identity::hash_password(password)),
        None => Ok(false),
    }
}

/// Re-hash and store a new password after checking the old one.
pub fn change_password(
    store: &dyn AccountStore,
    username: &str,
    old_password: &str,
    new_password: &str,
) -> Result<bool> {
    if !login_with_password(store, username, old_password)? {
        return Ok(false);
    }
    let record = store
        .find_by_username(username)?
        .ok_or_else(|| FacegateError::AccountNotFound(username.to_string()))?;
    store.update_fields(
        &record.id,
        AccountUpdate {
            hash_pass: Some(identity::hash_password(new_password)),
            ..AccountUpdate::default()
        },
    )?;
    Ok(true)
}
