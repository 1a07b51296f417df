use std::{
    fs,
    io::{Cursor, Write},
    path::Path,
};

use jwalk::WalkDir;
use tracing::debug;
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

use crate::error::Result;

/// Zip everything below `root` into memory.
///
/// Entries are sorted and stamped with a fixed time, so the same tree always
/// produces the same bytes.
pub fn zip_directory(root: &Path) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = entry?;
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((name, path, entry.file_type().is_dir()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, path, is_dir) in &entries {
        if *is_dir {
            writer.add_directory(format!("{name}/"), options.unix_permissions(0o755))?;
        } else {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&fs::read(path)?)?;
        }
    }
    let bytes = writer.finish()?.into_inner();

    debug!(entries = entries.len(), bytes = bytes.len(), "packaged archive");
    Ok(bytes)
}
