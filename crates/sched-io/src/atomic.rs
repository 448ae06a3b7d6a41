use std::fs;
use std::path::Path;

use sched_core::ScheduleResult;

/// Writes `bytes` to `final_path` atomically: write to a sibling `.tmp`
/// file, then `rename` onto the final path. A crash mid-write leaves only
/// the stale temp file behind, never a half-written final file.
///
/// Any temp file left over from a previous crash is removed first.
pub fn write_atomic(final_path: &Path, bytes: &[u8]) -> ScheduleResult<()> {
    let tmp_path = final_path.with_extension(tmp_extension(final_path));
    if tmp_path.exists() {
        fs::remove_file(&tmp_path)?;
    }
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let write_result = fs::write(&tmp_path, bytes);
    match write_result {
        Ok(()) => {
            fs::rename(&tmp_path, final_path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e.into())
        }
    }
}

fn tmp_extension(final_path: &Path) -> String {
    match final_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_final_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.csv");
        write_atomic(&final_path, b"a,b\n1,2\n").unwrap();
        assert_eq!(fs::read_to_string(&final_path).unwrap(), "a,b\n1,2\n");
        assert!(!final_path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn overwrites_existing_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.csv");
        write_atomic(&final_path, b"first\n").unwrap();
        write_atomic(&final_path, b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&final_path).unwrap(), "second\n");
    }

    #[test]
    fn removes_stale_temp_file_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.csv");
        let tmp_path = final_path.with_extension("csv.tmp");
        fs::write(&tmp_path, b"stale").unwrap();
        write_atomic(&final_path, b"fresh\n").unwrap();
        assert_eq!(fs::read_to_string(&final_path).unwrap(), "fresh\n");
        assert!(!tmp_path.exists());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("nested").join("deep").join("out.txt");
        write_atomic(&final_path, b"ok").unwrap();
        assert_eq!(fs::read_to_string(&final_path).unwrap(), "ok");
    }
}
