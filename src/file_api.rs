use crate::constants::ALLOWED_IMAGE_EXTENSIONS;
use crate::error::Error;
use crate::error::ErrorContext;
use crate::error::Result;
use chrono::DateTime;
use chrono::Utc;
use lazy_static::lazy_static;
use log::debug;
use log::warn;
use regex::Regex;
use std::fs::create_dir_all;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Upper bound on `_1`, `_2`, ... suffixes tried when a stored name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
}

/// A file part received with a post submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn is_allowed_image(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}

/// Reduce a client supplied filename to a safe, flat name:
/// path separators and whitespace become `_`, anything outside `[A-Za-z0-9_.-]` is dropped
/// and leading/trailing dots and underscores are trimmed.
/// Non-ASCII letters are dropped, not transliterated: `"ünïcode.png"` becomes `"ncode.png"`.
/// May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let flattened = filename.replace(&['/', '\\'][..], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Accept the upload if it is an allowed image and persist it under a timestamp-prefixed name.
///
/// Returns the stored filename, or `None` when there is nothing acceptable to store.
/// A rejected file is not an error: the item is simply posted without a photo.
pub fn store_upload(
    uploads_dir: &Path,
    upload: Option<&Upload>,
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    let upload = match upload {
        Some(upload) if !upload.filename.is_empty() && is_allowed_image(&upload.filename) => {
            upload
        }
        Some(upload) => {
            debug!("Ignoring upload with filename {:?}", upload.filename);
            return Ok(None);
        }
        None => return Ok(None),
    };
    let safe_name = secure_filename(&upload.filename);
    if !is_allowed_image(&safe_name) {
        debug!("Ignoring upload {:?}, nothing left after sanitizing", upload.filename);
        return Ok(None);
    }
    create_dir_all(uploads_dir).context(|| {
        format!("Failed to create uploads directory {}", uploads_dir.display())
    })?;

    let prefix = now.format("%Y%m%d_%H%M%S").to_string();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let stored_name = if attempt == 0 {
            format!("{}_{}", prefix, safe_name)
        } else {
            format!("{}_{}_{}", prefix, attempt, safe_name)
        };
        let path = uploads_dir.join(&stored_name);
        let file = OpenOptions::new().write(true).create_new(true).open(&path);
        let mut file = match file {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(Error::internal(format!(
                    "Failed to create upload file {}, {}",
                    path.display(),
                    err
                )))
            }
        };
        if let Err(err) = file.write_all(&upload.bytes) {
            drop(file);
            remove_upload(uploads_dir, &stored_name)?;
            return Err(Error::internal(format!(
                "Failed to write data to upload file {}, {}",
                path.display(),
                err
            )));
        }
        return Ok(Some(stored_name));
    }
    Err(Error::internal(format!(
        "Could not find a free upload filename for {}",
        safe_name
    )))
}

/// Delete a stored upload. An already missing file is not an error.
pub fn remove_upload(uploads_dir: &Path, stored_name: &str) -> Result<()> {
    let path = upload_path(uploads_dir, stored_name)?;
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Upload {} was already gone", path.display());
            Ok(())
        }
        Err(err) => Err(Error::internal(format!(
            "Failed to remove upload {}, {}",
            path.display(),
            err
        ))),
    }
}

/// Move a stored upload out of the served name, so that it can be restored
/// if the deletion of its item does not go through.
///
/// Returns the temporary path, or `None` if the upload was already gone.
/// Anything but a regular file under that name is refused.
pub fn set_aside_upload(uploads_dir: &Path, stored_name: &str) -> Result<Option<PathBuf>> {
    let path = upload_path(uploads_dir, stored_name)?;
    match std::fs::symlink_metadata(&path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(Error::internal(format!(
                "Upload {} is not a regular file",
                path.display()
            )))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Upload {} was already gone", path.display());
            return Ok(None);
        }
        Err(err) => {
            return Err(Error::internal(format!(
                "Failed to inspect upload {}, {}",
                path.display(),
                err
            )))
        }
    }
    let aside = uploads_dir.join(format!(".{}.removing", stored_name));
    std::fs::rename(&path, &aside)
        .context(|| format!("Failed to move upload {} aside", path.display()))?;
    Ok(Some(aside))
}

/// Put an upload moved by `set_aside_upload` back under its stored name.
pub fn restore_upload(uploads_dir: &Path, stored_name: &str, aside: &Path) -> Result<()> {
    let path = upload_path(uploads_dir, stored_name)?;
    std::fs::rename(aside, &path)
        .context(|| format!("Failed to restore upload {}", path.display()))
}

/// Path of a stored upload. Only flat names (as produced by `store_upload`) are accepted.
pub fn upload_path(uploads_dir: &Path, stored_name: &str) -> Result<PathBuf> {
    if stored_name.is_empty() || secure_filename(stored_name) != stored_name {
        return Err(Error::bad_request(format!(
            "Not a stored upload name: {:?}",
            stored_name
        )));
    }
    Ok(uploads_dir.join(stored_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::Rng;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "lostfound-uploads-{}",
            rand::thread_rng().gen::<u64>()
        ))
    }

    fn upload(filename: &str) -> Upload {
        Upload {
            filename: filename.to_string(),
            bytes: b"\x89PNG fake".to_vec(),
        }
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(is_allowed_image("wallet.png"));
        assert!(is_allowed_image("wallet.JPG"));
        assert!(is_allowed_image("scan.final.jpeg"));
        assert!(is_allowed_image("a.Gif"));
        assert!(!is_allowed_image("wallet.pdf"));
        assert!(!is_allowed_image("png"));
        assert!(!is_allowed_image("wallet."));
        assert!(!is_allowed_image(""));
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool photo.jpg"), "My_cool_photo.jpg");
        assert_eq!(secure_filename("../../etc/passwd.png"), "etc_passwd.png");
        assert_eq!(secure_filename("C:\\Users\\me\\cat.gif"), "C_Users_me_cat.gif");
        assert_eq!(secure_filename("<script>.png"), "script.png");
        assert_eq!(secure_filename("ünïcode.png"), "ncode.png");
        assert_eq!(secure_filename("../.."), "");
    }

    #[test]
    fn test_store_and_remove() -> Result<()> {
        let dir = temp_dir();
        let now = Utc.ymd(2024, 3, 1).and_hms(9, 30, 5);

        let first = store_upload(&dir, Some(&upload("wallet photo.PNG")), now)?;
        assert_eq!(first.as_deref(), Some("20240301_093005_wallet_photo.PNG"));
        let second = store_upload(&dir, Some(&upload("wallet photo.PNG")), now)?;
        assert_eq!(second.as_deref(), Some("20240301_093005_1_wallet_photo.PNG"));

        let first = first.unwrap();
        assert_eq!(std::fs::read(dir.join(&first))?, b"\x89PNG fake".to_vec());
        remove_upload(&dir, &first)?;
        assert!(!dir.join(&first).exists());
        // Removing twice is harmless
        remove_upload(&dir, &first)?;

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_rejected_uploads_are_ignored() -> Result<()> {
        let dir = temp_dir();
        let now = Utc::now();
        assert_eq!(store_upload(&dir, None, now)?, None);
        assert_eq!(store_upload(&dir, Some(&upload("")), now)?, None);
        assert_eq!(store_upload(&dir, Some(&upload("notes.txt")), now)?, None);
        assert_eq!(store_upload(&dir, Some(&upload("../..png")), now)?, None);
        assert!(!dir.exists());
        Ok(())
    }

    #[test]
    fn test_set_aside_and_restore() -> Result<()> {
        let dir = temp_dir();
        let stored = store_upload(&dir, Some(&upload("keys.png")), Utc::now())?.unwrap();

        let aside = set_aside_upload(&dir, &stored)?.expect("upload exists");
        assert!(!dir.join(&stored).exists());
        assert!(aside.exists());
        restore_upload(&dir, &stored, &aside)?;
        assert_eq!(std::fs::read(dir.join(&stored))?, b"\x89PNG fake".to_vec());

        remove_upload(&dir, &stored)?;
        assert_eq!(set_aside_upload(&dir, &stored)?, None);

        std::fs::create_dir_all(dir.join(&stored).join("inner"))?;
        assert!(set_aside_upload(&dir, &stored).is_err());
        assert!(dir.join(&stored).is_dir());

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_upload_path_refuses_traversal() {
        let dir = PathBuf::from("/srv/uploads");
        assert!(upload_path(&dir, "../secret.png").is_err());
        assert!(upload_path(&dir, "a/b.png").is_err());
        assert!(upload_path(&dir, "").is_err());
        assert_eq!(
            upload_path(&dir, "20240301_093005_a.png").unwrap(),
            dir.join("20240301_093005_a.png")
        );
    }
}
