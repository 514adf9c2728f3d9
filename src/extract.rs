/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::extract
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Unpack downloaded release archives (zip, tar.gz) into a
    directory ready to be committed to the tool cache.

  Security / Safety Notes:
    Zip entries whose names escape the destination are skipped;
    tar unpacking refuses `..` components by construction.

  Dependencies:
    zip, flate2 and tar for the archive formats.

  Operational Scope:
    Runs once per cache miss, on a blocking worker thread.

  Revision History:
    2025-11-02 COD  Authored archive extraction.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Format chosen explicitly, never sniffed
    - Every failure mapped to an extraction error
============================================================*/

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Result, SetupError};
use crate::resolver::ArchiveKind;

/// Extract `archive` into `dest` and return `dest`.
pub fn extract_archive(kind: ArchiveKind, archive: &Path, dest: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest).map_err(|err| {
        SetupError::Extraction(format!("Failed to create {}: {err}", dest.display()))
    })?;
    match kind {
        ArchiveKind::Zip => extract_zip(archive, dest),
        ArchiveKind::TarGz => extract_tar_gz(archive, dest),
    }?;
    Ok(dest.to_path_buf())
}

/// Extract an archive whose format is implied by its file name.
pub fn extract_archive_by_name(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ArchiveKind::from_file_name(&name)?;
    extract_archive(kind, archive, dest)
}

fn open(archive: &Path) -> Result<BufReader<File>> {
    File::open(archive).map(BufReader::new).map_err(|err| {
        SetupError::Extraction(format!("Failed to open {}: {err}", archive.display()))
    })
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let mut tarball = Archive::new(GzDecoder::new(open(archive)?));
    tarball.set_preserve_permissions(true);
    tarball.unpack(dest).map_err(|err| {
        SetupError::Extraction(format!("Failed to extract {}: {err}", archive.display()))
    })
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let zip_err = |err: zip::result::ZipError| {
        SetupError::Extraction(format!("Failed to read zip {}: {err}", archive.display()))
    };
    let io_err = |err: io::Error| {
        SetupError::Extraction(format!("Failed to extract {}: {err}", archive.display()))
    };

    let mut zipped = zip::ZipArchive::new(open(archive)?).map_err(zip_err)?;
    for index in 0..zipped.len() {
        let mut file = zipped.by_index(index).map_err(zip_err)?;
        let Some(relative) = file.enclosed_name() else {
            continue;
        };
        let outpath = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath).map_err(io_err)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut out = File::create(&outpath).map_err(io_err)?;
        io::copy(&mut file, &mut out).map_err(io_err)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode)).map_err(io_err)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    /// Write a tar.gz holding `files` (path, contents) to `path`.
    pub fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    /// Write a zip holding `files` (path, contents) to `path`.
    pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        for (name, data) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
}
