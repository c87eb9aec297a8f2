//!
//! EasyPrep storage module
//! -----------------------
//! On-disk store for company job postings. The layout under the configured
//! data root is deliberately small: `companies.json` holds every posting,
//! `users.json` (owned by the user store) holds accounts, and `uploads/`
//! holds the original eligibility spreadsheets referenced by postings.
//!
//! The public API centers around the `Store` type, wrapped in a thread-safe
//! `SharedStore` (`Arc<Mutex<Store>>`) by the server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::eligibility::EligibilityList;
use crate::error::{AppError, AppResult};

/// A company job posting visible to students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub role_title: String,
    #[serde(default)]
    pub description: String,
    /// Offered package, free text (e.g. "6.5 LPA").
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub visit_date: Option<String>,
    /// Student departments the posting is open to.
    #[serde(default)]
    pub eligible_departments: Vec<String>,
    /// Original uploaded spreadsheet, served from /uploads/{filename}.
    #[serde(default)]
    pub eligible_students_file: Option<String>,
    /// Extracted register-number list, attached after upload.
    #[serde(default)]
    pub eligibility: Option<EligibilityList>,
    pub created_at: i64,
}

/// Fields supplied when creating a posting; the store assigns id and timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub role_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub visit_date: Option<String>,
    #[serde(default)]
    pub eligible_departments: Vec<String>,
    #[serde(default)]
    pub eligible_students_file: Option<String>,
}

/// File-rooted store for postings.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a new Store rooted at the given filesystem path.
    /// The directory (and uploads/) is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating data root {}", root.display()))?;
        fs::create_dir_all(root.join("uploads"))
            .with_context(|| format!("creating uploads dir under {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    fn companies_path(&self) -> PathBuf {
        self.root.join("companies.json")
    }

    fn read_all(&self) -> Result<Vec<Company>> {
        let path = self.companies_path();
        if !path.exists() { return Ok(Vec::new()); }
        let bytes = fs::read(&path)
            .with_context(|| format!("reading company store {}", path.display()))?;
        let companies = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing company store {}", path.display()))?;
        Ok(companies)
    }

    fn write_all(&self, companies: &[Company]) -> Result<()> {
        let path = self.companies_path();
        let json = serde_json::to_vec_pretty(companies).context("serializing company store")?;
        fs::write(&path, json)
            .with_context(|| format!("writing company store {}", path.display()))?;
        Ok(())
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        self.read_all()
    }

    pub fn get_company(&self, id: &str) -> AppResult<Company> {
        let companies = self.read_all()?;
        companies
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("company_not_found", format!("no company with id {}", id).as_str()))
    }

    pub fn add_company(&self, new: NewCompany) -> Result<Company> {
        let mut companies = self.read_all()?;
        let company = Company {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            role_title: new.role_title,
            description: new.description,
            package: new.package,
            visit_date: new.visit_date,
            eligible_departments: new.eligible_departments,
            eligible_students_file: new.eligible_students_file,
            eligibility: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        debug!(company = %company.id, name = %company.name, "adding company posting");
        companies.push(company.clone());
        self.write_all(&companies)?;
        Ok(company)
    }

    pub fn delete_company(&self, id: &str) -> AppResult<()> {
        let mut companies = self.read_all()?;
        let before = companies.len();
        companies.retain(|c| c.id != id);
        if companies.len() == before {
            return Err(AppError::not_found("company_not_found", format!("no company with id {}", id).as_str()));
        }
        self.write_all(&companies)?;
        Ok(())
    }

    /// Attach an extracted eligibility list to a posting, replacing any
    /// previous list wholesale.
    pub fn set_eligibility(&self, id: &str, list: EligibilityList) -> AppResult<Company> {
        let mut companies = self.read_all()?;
        let Some(company) = companies.iter_mut().find(|c| c.id == id) else {
            return Err(AppError::not_found("company_not_found", format!("no company with id {}", id).as_str()));
        };
        company.eligibility = Some(list);
        let updated = company.clone();
        self.write_all(&companies)?;
        Ok(updated)
    }

    /// Resolve an upload filename to a path inside uploads/, rejecting any
    /// name that would escape the directory.
    pub fn upload_path(&self, filename: &str) -> AppResult<PathBuf> {
        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err(AppError::user("bad_filename", "invalid upload filename"));
        }
        Ok(self.uploads_dir().join(filename))
    }

    /// Read an uploaded file's bytes; `NotFound` when absent.
    pub fn read_upload(&self, filename: &str) -> AppResult<Vec<u8>> {
        let path = self.upload_path(filename)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::not_found("upload_not_found", format!("no upload named {}", filename).as_str()))
            }
            Err(e) => Err(AppError::io("upload_read", e.to_string().as_str())),
        }
    }
}

/// Thread-safe shared handle used by the HTTP layer.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Store::new(root)?))))
    }
}
