use aimcore::chunk::{ChunkMetadata, PsdChunk};
use aimcore::telemetry::LogManager;
use anyhow::{bail, Context};
use ndarray::{Array1, Array3};
use std::fs;
use std::path::Path;

pub const GRID_FILE: &str = "psd_chunk.json";
pub const FREQ_FILE: &str = "freq.json";
pub const META_FILE: &str = "meta.txt";

/// Loads the persisted three-artifact dataset layout: the 3D measurement
/// grid, the frequency axis and a one-line textual metadata record.
///
/// Grid and axis are required. Unreadable or unparseable metadata yields
/// an empty record and a `"None"` identifier with a warning; otherwise the
/// identifier is the dataset directory name. `rotate_90d` quarter turns
/// are applied to the grid before chunk construction.
pub fn load_dataset(path: &Path, rotate_90d: i32) -> anyhow::Result<PsdChunk> {
    let grid_path = path.join(GRID_FILE);
    let grid_text = fs::read_to_string(&grid_path)
        .with_context(|| format!("reading {}", grid_path.display()))?;
    let grid: Vec<Vec<Vec<f64>>> = serde_json::from_str(&grid_text)
        .with_context(|| format!("parsing {}", grid_path.display()))?;

    let freq_path = path.join(FREQ_FILE);
    let freq_text = fs::read_to_string(&freq_path)
        .with_context(|| format!("reading {}", freq_path.display()))?;
    let freq: Vec<f64> = serde_json::from_str(&freq_text)
        .with_context(|| format!("parsing {}", freq_path.display()))?;

    let logger = LogManager::new();
    let (identifier, metadata) = match fs::read_to_string(path.join(META_FILE)) {
        Ok(text) => match ChunkMetadata::from_json_str(&text) {
            Ok(meta) => (dataset_name(path), meta),
            Err(err) => {
                logger.warn(&format!("unable to parse {}: {}", META_FILE, err));
                ("None".to_string(), ChunkMetadata::default())
            }
        },
        Err(err) => {
            logger.warn(&format!("unable to read {}: {}", META_FILE, err));
            ("None".to_string(), ChunkMetadata::default())
        }
    };

    let data = rotate_quarter_turns(to_array3(grid)?, rotate_90d);
    let chunk = PsdChunk::new(identifier, data, Array1::from(freq), metadata)?;
    logger.record(&format!(
        "loaded dataset {} ({}x{}x{})",
        chunk.id(),
        chunk.x_div(),
        chunk.y_div(),
        chunk.bins()
    ));
    Ok(chunk)
}

fn dataset_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "None".to_string())
}

fn to_array3(grid: Vec<Vec<Vec<f64>>>) -> anyhow::Result<Array3<f64>> {
    let rows = grid.len();
    if rows == 0 || grid[0].is_empty() || grid[0][0].is_empty() {
        bail!("measurement grid must be non-empty in all three dimensions");
    }
    let cols = grid[0].len();
    let bins = grid[0][0].len();
    let mut flat = Vec::with_capacity(rows * cols * bins);
    for row in &grid {
        if row.len() != cols {
            bail!("ragged measurement grid: expected {} columns", cols);
        }
        for cell in row {
            if cell.len() != bins {
                bail!("ragged measurement grid: expected {} bins", bins);
            }
            flat.extend_from_slice(cell);
        }
    }
    Ok(Array3::from_shape_vec((rows, cols, bins), flat)?)
}

/// Rotates the grid counterclockwise in the scan plane by `rotate_90d`
/// quarter turns; frequency bins stay in place.
pub fn rotate_quarter_turns(data: Array3<f64>, rotate_90d: i32) -> Array3<f64> {
    let turns = rotate_90d.rem_euclid(4);
    let mut out = data;
    for _ in 0..turns {
        out = rot90_once(out);
    }
    out
}

fn rot90_once(data: Array3<f64>) -> Array3<f64> {
    let (rows, cols, bins) = data.dim();
    Array3::from_shape_fn((cols, rows, bins), |(i, j, f)| data[[j, cols - 1 - i, f]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_dataset(dir: &Path, meta: Option<&str>) {
        let grid = vec![
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            vec![vec![7.0, 8.0], vec![9.0, 10.0], vec![11.0, 12.0]],
        ];
        let mut f = fs::File::create(dir.join(GRID_FILE)).unwrap();
        f.write_all(serde_json::to_string(&grid).unwrap().as_bytes())
            .unwrap();
        let mut f = fs::File::create(dir.join(FREQ_FILE)).unwrap();
        f.write_all(b"[100.0, 200.0]").unwrap();
        if let Some(meta) = meta {
            let mut f = fs::File::create(dir.join(META_FILE)).unwrap();
            f.write_all(meta.as_bytes()).unwrap();
        }
    }

    #[test]
    fn loader_reads_all_three_artifacts() {
        let dir = TempDir::new().unwrap();
        write_dataset(dir.path(), Some(r#"{"freq_span": 200.0, "rbw": 10.0}"#));
        let chunk = load_dataset(dir.path(), 0).unwrap();
        assert_eq!((chunk.y_div(), chunk.x_div(), chunk.bins()), (2, 3, 2));
        assert_eq!(chunk.metadata().rbw, Some(10.0));
        assert_eq!(chunk.id(), dataset_name(dir.path()));
        assert_eq!(chunk.data()[[0, 2, 1]], 6.0);
    }

    #[test]
    fn broken_metadata_warns_but_loads() {
        let dir = TempDir::new().unwrap();
        write_dataset(dir.path(), Some("{'python': repr}"));
        let chunk = load_dataset(dir.path(), 0).unwrap();
        assert_eq!(chunk.id(), "None");
        assert!(chunk.metadata().is_empty());
    }

    #[test]
    fn missing_grid_is_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(load_dataset(dir.path(), 0).is_err());
    }

    #[test]
    fn rotation_turns_the_scan_plane() {
        let data = Array3::from_shape_fn((2, 3, 1), |(y, x, _)| (y * 3 + x) as f64);
        let rotated = rotate_quarter_turns(data.clone(), 1);
        assert_eq!(rotated.dim(), (3, 2, 1));
        // Counterclockwise: the last column becomes the first row.
        assert_eq!(rotated[[0, 0, 0]], data[[0, 2, 0]]);
        assert_eq!(rotated[[0, 1, 0]], data[[1, 2, 0]]);
        // Four turns are the identity.
        assert_eq!(rotate_quarter_turns(data.clone(), 4), data);
    }
}
