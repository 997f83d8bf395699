// crates/zisa_io/src/writers.rs

//! 时间循环的输出实现

use std::sync::Arc;

use zisa_config::IoMode;
use zisa_foundation::ZisaResult;
use zisa_grid::Grid;
use zisa_physics::{AllVariables, Euler, NoVisualization, Visualization};

use crate::file_name::FileNameGenerator;
use crate::snapshot::save_state;
use crate::vtu::{PvdCollection, VtuExporter};

/// 按输出格式创建输出，`fng` 决定文件名与起始编号
pub fn make_visualization(
    mode: IoMode,
    fng: FileNameGenerator,
    grid: Arc<Grid>,
    euler: Arc<Euler>,
) -> Box<dyn Visualization> {
    match mode {
        IoMode::None => Box::new(NoVisualization),
        IoMode::Snapshot => Box::new(SnapshotWriter::new(fng)),
        IoMode::Vtu => Box::new(VtuWriter::new(fng, grid, euler, VtuExporter::new().binary(true))),
    }
}

// ============================================================================
// 快照
// ============================================================================

/// 每个输出步写一个二进制快照
#[derive(Debug)]
pub struct SnapshotWriter {
    fng: FileNameGenerator,
}

impl SnapshotWriter {
    /// 创建
    pub fn new(fng: FileNameGenerator) -> Self {
        Self { fng }
    }

    /// 文件名生成器
    pub fn file_name_generator(&self) -> &FileNameGenerator {
        &self.fng
    }

    /// 保存稳态
    pub fn save_steady_state(&self, u: &AllVariables) -> ZisaResult<()> {
        let path = self.fng.steady_state_filename();
        save_state(&path, 0.0, 0, u)?;
        tracing::info!("稳态写入 {}", path.display());
        Ok(())
    }
}

impl Visualization for SnapshotWriter {
    fn plot(&mut self, u: &AllVariables, t: f64, k: usize) -> ZisaResult<()> {
        let path = self.fng.next_name();
        save_state(&path, t, k, u)?;
        tracing::info!("输出 {} (t = {:.6e}, k = {})", path.display(), t, k);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("snapshot[{}]", self.fng.directory().display())
    }
}

// ============================================================================
// VTU
// ============================================================================

/// 每个输出步写一个 VTU 文件，并更新 PVD 集合
pub struct VtuWriter {
    fng: FileNameGenerator,
    grid: Arc<Grid>,
    euler: Arc<Euler>,
    exporter: VtuExporter,
    collection: PvdCollection,
}

impl VtuWriter {
    /// 创建，集合文件为 `<dir>/<stem>.pvd`
    pub fn new(fng: FileNameGenerator, grid: Arc<Grid>, euler: Arc<Euler>, exporter: VtuExporter) -> Self {
        let collection = PvdCollection::new(fng.collection_filename());
        Self {
            fng,
            grid,
            euler,
            exporter,
            collection,
        }
    }

    /// 集合文件
    pub fn collection(&self) -> &PvdCollection {
        &self.collection
    }
}

impl Visualization for VtuWriter {
    fn plot(&mut self, u: &AllVariables, t: f64, k: usize) -> ZisaResult<()> {
        let path = self.fng.next_name();
        self.exporter.export(&path, &self.grid, &self.euler, u, t)?;

        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.collection.push(t, file);
        self.collection.write()?;

        tracing::info!("输出 {} (t = {:.6e}, k = {})", path.display(), t, k);
        Ok(())
    }

    fn finalize(&mut self) -> ZisaResult<()> {
        if !self.collection.is_empty() {
            self.collection.write()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("vtu[{}]", self.collection.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use zisa_config::IoConfig;
    use zisa_grid::{QuadratureDegrees, RectGridGenerator};
    use zisa_physics::model::{Gravity, IdealGasEos};

    fn setup() -> (Arc<Grid>, Arc<Euler>, AllVariables) {
        let grid = RectGridGenerator::new(2, 2, 1.0, 1.0)
            .build(QuadratureDegrees::default())
            .unwrap();
        let euler = Euler::new(IdealGasEos::new(1.4, 1.0), Gravity::none());
        let mut u = AllVariables::zeros(grid.n_cells(), 0);
        for ui in &mut u.cvars {
            *ui = euler.cvars(1.0, 0.0, 0.0, 1.0);
        }
        (Arc::new(grid), Arc::new(euler), u)
    }

    #[test]
    fn test_snapshot_writer_numbers_files() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, u) = setup();
        let fng = FileNameGenerator::new(dir.path(), "run", "-%04d", ".zsnp").unwrap();
        let mut writer = SnapshotWriter::new(fng);

        writer.plot(&u, 0.0, 0).unwrap();
        writer.plot(&u, 0.5, 7).unwrap();
        writer.save_steady_state(&u).unwrap();

        let second = Snapshot::load(&dir.path().join("run-0001.zsnp")).unwrap();
        assert_eq!(second.step, 7);
        assert_eq!(second.time, 0.5);
        assert!(dir.path().join("run_steady-state.zsnp").exists());
    }

    #[test]
    fn test_vtu_writer_maintains_collection() {
        let dir = tempfile::tempdir().unwrap();
        let (grid, euler, u) = setup();
        let fng = FileNameGenerator::new(dir.path(), "run", "-%04d", ".vtu").unwrap();
        let mut writer = VtuWriter::new(fng, grid, euler, VtuExporter::new());

        writer.plot(&u, 0.0, 0).unwrap();
        writer.plot(&u, 0.1, 3).unwrap();
        writer.finalize().unwrap();

        assert_eq!(writer.collection().path(), dir.path().join("run.pvd"));
        let pvd = std::fs::read_to_string(dir.path().join("run.pvd")).unwrap();
        assert!(pvd.contains("run-0000.vtu"));
        assert!(pvd.contains("run-0001.vtu"));
        assert!(dir.path().join("run-0001.vtu").exists());
    }

    #[test]
    fn test_make_visualization() {
        let (grid, euler, _) = setup();
        let mut io = IoConfig::default();
        io.directory = "out".into();
        io.filename.stem = "bubble".into();
        let fng = FileNameGenerator::from_config(&io).unwrap();

        let viz = make_visualization(IoMode::None, fng.clone(), Arc::clone(&grid), Arc::clone(&euler));
        assert_eq!(viz.describe(), "none");

        let viz = make_visualization(IoMode::Vtu, fng, grid, euler);
        assert!(viz.describe().contains("bubble.pvd"));
    }
}
