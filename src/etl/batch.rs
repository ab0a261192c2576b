//! File discovery and the per-file transaction loop.

use super::EtlError;
use crate::warehouse::{SqliteWarehouse, WarehouseWriter};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Visit directory entries sorted by file name instead of in directory order.
    pub sort_files: bool,
    /// Roll back and skip a failing file instead of aborting the batch.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            sort_files: true,
            continue_on_error: false,
        }
    }
}

/// Outcome of one [`process_data`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub root: PathBuf,
    pub files_found: usize,
    pub files_processed: usize,
    /// Files rolled back and skipped, only populated with `continue_on_error`.
    pub skipped: Vec<PathBuf>,
}

/// Recursively collects every file ending in `.json` under `root`, including
/// symlinks to files, as absolute paths.
pub fn find_json_files(root: &Path, sort_files: bool) -> Result<Vec<PathBuf>, EtlError> {
    let root = root.canonicalize().map_err(|source| EtlError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut walker = WalkDir::new(&root);
    if sort_files {
        walker = walker.sort_by_file_name();
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| EtlError::Walk {
            root: root.clone(),
            source,
        })?;
        let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
        // follows symlinks, unlike entry.file_type()
        if is_json && entry.path().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Runs `handler` over every JSON file under `root`, one transaction per file.
///
/// A file is committed only when the handler succeeds for all of its records.
/// On failure the file is rolled back, then either skipped or reported as
/// [`EtlError::File`] depending on `options.continue_on_error`. Files committed
/// before a failure stay committed.
pub fn process_data<F>(
    warehouse: &mut SqliteWarehouse,
    root: &Path,
    options: BatchOptions,
    handler: F,
) -> Result<BatchReport, EtlError>
where
    F: FnMut(&dyn WarehouseWriter, &Path) -> Result<(), EtlError>,
{
    run_batch(warehouse, root, options, handler, &mut std::io::stdout())
}

/// [`process_data`] with the progress lines written to `progress`.
fn run_batch<F, W>(
    warehouse: &mut SqliteWarehouse,
    root: &Path,
    options: BatchOptions,
    mut handler: F,
    progress: &mut W,
) -> Result<BatchReport, EtlError>
where
    F: FnMut(&dyn WarehouseWriter, &Path) -> Result<(), EtlError>,
    W: Write,
{
    let progress_error = |source: std::io::Error| EtlError::Io {
        path: root.to_path_buf(),
        source,
    };

    let files = find_json_files(root, options.sort_files)?;
    let num_files = files.len();
    writeln!(progress, "{} files found in {}", num_files, root.display())
        .map_err(progress_error)?;

    let mut report = BatchReport {
        root: root.to_path_buf(),
        files_found: num_files,
        ..Default::default()
    };

    for (i, path) in files.iter().enumerate() {
        let tx = warehouse.begin_file()?;
        let handled = handler(&tx, path);
        let outcome = match handled {
            Ok(()) => tx.commit().map_err(EtlError::from),
            Err(e) => {
                // rollback failures are secondary to the handler error
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback of {} failed: {}", path.display(), rollback_err);
                }
                Err(e)
            }
        };

        match outcome {
            Ok(()) => {
                report.files_processed += 1;
                debug!("Committed {}", path.display());
                writeln!(progress, "{}/{} files processed.", i + 1, num_files)
                    .map_err(progress_error)?;
            }
            Err(e) if options.continue_on_error => {
                warn!("Skipping {}: {}", path.display(), e);
                report.skipped.push(path.clone());
                writeln!(
                    progress,
                    "{}/{} files processed, skipped {}.",
                    i + 1,
                    num_files,
                    path.display()
                )
                .map_err(progress_error)?;
            }
            Err(e) => {
                error!("Aborting batch at {}: {}", path.display(), e);
                return Err(EtlError::File {
                    path: path.clone(),
                    source: Box::new(e),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::process_song_file;
    use crate::warehouse::WarehouseSettings;
    use std::fs;
    use tempfile::TempDir;

    fn song_line(song_id: &str, artist_id: &str) -> String {
        format!(
            r#"{{"artist_id": "{}", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "Artist", "song_id": "{}", "title": "Title", "duration": 200.0, "year": 2000}}"#,
            artist_id, song_id
        )
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_find_json_files_recurses_and_filters() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("A/B/C/b.json"), "{}");
        write(&root.join("A/a.json"), "{}");
        write(&root.join("A/notes.txt"), "");
        write(&root.join("A/B/data.json.bak"), "");
        fs::create_dir_all(root.join("A/dir.json")).unwrap();

        let files = find_json_files(root, true).unwrap();
        let canonical_root = root.canonicalize().unwrap();
        assert_eq!(
            files,
            vec![
                canonical_root.join("A/B/C/b.json"),
                canonical_root.join("A/a.json"),
            ]
        );
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_json_files_follows_symlinked_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        write(&root.join("b.json"), "{}");
        let target = temp_dir.path().join("elsewhere/real.json");
        write(&target, "{}");
        std::os::unix::fs::symlink(&target, root.join("a.json")).unwrap();

        let files = find_json_files(&root, true).unwrap();
        let canonical_root = root.canonicalize().unwrap();
        assert_eq!(
            files,
            vec![canonical_root.join("a.json"), canonical_root.join("b.json")]
        );
    }

    #[test]
    fn test_find_json_files_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let result = find_json_files(&temp_dir.path().join("missing"), true);
        assert!(matches!(result, Err(EtlError::Io { .. })));
    }

    #[test]
    fn test_empty_root_processes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut warehouse = SqliteWarehouse::in_memory(WarehouseSettings::default());
        let mut calls = 0;

        let report = process_data(
            &mut warehouse,
            temp_dir.path(),
            BatchOptions::default(),
            |_, _| {
                calls += 1;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(report.files_found, 0);
        assert_eq!(report.files_processed, 0);
    }

    #[test]
    fn test_handler_sees_files_in_sorted_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("b/2.json"), "{}");
        write(&root.join("a/1.json"), "{}");
        write(&root.join("a/0.json"), "{}");
        let mut warehouse = SqliteWarehouse::in_memory(WarehouseSettings::default());
        let mut seen = Vec::new();

        let report = process_data(&mut warehouse, root, BatchOptions::default(), |_, path| {
            seen.push(path.file_name().unwrap().to_string_lossy().into_owned());
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, vec!["0.json", "1.json", "2.json"]);
        assert_eq!(report.files_processed, 3);
    }

    #[test]
    fn test_failure_aborts_and_keeps_earlier_commits() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("1.json"), &song_line("SO1", "AR1"));
        write(&root.join("2.json"), "{\"song_id\": ");
        write(&root.join("3.json"), &song_line("SO3", "AR3"));
        let mut warehouse = SqliteWarehouse::in_memory(WarehouseSettings::default());

        let result = process_data(
            &mut warehouse,
            root,
            BatchOptions::default(),
            process_song_file,
        );

        match result {
            Err(EtlError::File { path, .. }) => assert!(path.ends_with("2.json")),
            other => panic!("expected file error, got {:?}", other),
        }
        let counts = warehouse.get_counts().unwrap();
        assert_eq!(counts.songs, 1);
        assert_eq!(counts.artists, 1);
    }

    #[test]
    fn test_failing_file_is_rolled_back_as_a_whole() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("1.json"), &song_line("SO1", "AR1"));
        // new song, but its artist collides with the first file
        write(&root.join("2.json"), &song_line("SO2", "AR1"));
        let mut warehouse = SqliteWarehouse::in_memory(WarehouseSettings::default());

        let result = process_data(
            &mut warehouse,
            root,
            BatchOptions::default(),
            process_song_file,
        );

        assert!(result.is_err());
        assert_eq!(warehouse.get_counts().unwrap().songs, 1);
    }

    #[test]
    fn test_continue_on_error_skips_failing_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("1.json"), &song_line("SO1", "AR1"));
        write(&root.join("2.json"), "not json");
        write(&root.join("3.json"), &song_line("SO3", "AR3"));
        let mut warehouse = SqliteWarehouse::in_memory(WarehouseSettings::default());

        let report = process_data(
            &mut warehouse,
            root,
            BatchOptions {
                continue_on_error: true,
                ..Default::default()
            },
            process_song_file,
        )
        .unwrap();

        assert_eq!(report.files_found, 3);
        assert_eq!(report.files_processed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].ends_with("2.json"));
        assert_eq!(warehouse.get_counts().unwrap().songs, 2);
    }

    #[test]
    fn test_progress_line_for_every_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("1.json"), &song_line("SO1", "AR1"));
        write(&root.join("2.json"), "not json");
        write(&root.join("3.json"), &song_line("SO3", "AR3"));
        let mut warehouse = SqliteWarehouse::in_memory(WarehouseSettings::default());
        let mut progress = Vec::new();

        let report = run_batch(
            &mut warehouse,
            root,
            BatchOptions {
                continue_on_error: true,
                ..Default::default()
            },
            process_song_file,
            &mut progress,
        )
        .unwrap();

        let output = String::from_utf8(progress).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], format!("3 files found in {}", root.display()));
        assert_eq!(lines[1], "1/3 files processed.");
        assert!(lines[2].starts_with("2/3 files processed, skipped "));
        assert!(lines[2].ends_with("2.json."));
        assert_eq!(lines[3], "3/3 files processed.");
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].ends_with("2.json"));
        assert_eq!(warehouse.get_counts().unwrap().songs, 2);
    }
}
