// crates/zisa_io/src/file_name.rs

//! 连续编号的输出文件名
//!
//! ```text
//! FileNameGenerator::new("out", "polytrope", "-%04d", ".zsnp")
//!   grid_filename()          -> out/polytrope_grid.zsnp
//!   steady_state_filename()  -> out/polytrope_steady-state.zsnp
//!   next_name()              -> out/polytrope-0000.zsnp, out/polytrope-0001.zsnp, ...
//! ```

use std::path::{Path, PathBuf};

use zisa_config::simulation_config::parse_pattern_width;
use zisa_config::IoConfig;
use zisa_foundation::{ZisaError, ZisaResult};

/// 输出文件名生成器
#[derive(Debug, Clone)]
pub struct FileNameGenerator {
    dir: PathBuf,
    stem: String,
    prefix: String,
    width: usize,
    postfix: String,
    suffix: String,
    count: usize,
}

impl FileNameGenerator {
    /// 创建，`pattern` 为含一个 `%0Nd` 的编号模式
    pub fn new(
        dir: impl Into<PathBuf>,
        stem: impl Into<String>,
        pattern: &str,
        suffix: impl Into<String>,
    ) -> ZisaResult<Self> {
        let (prefix, width, postfix) = parse_pattern_width(pattern)
            .ok_or_else(|| ZisaError::invalid_config("io.filename.pattern", pattern, "需要形如 -%04d 的编号模式"))?;
        Ok(Self {
            dir: dir.into(),
            stem: stem.into(),
            prefix,
            width,
            postfix,
            suffix: suffix.into(),
            count: 0,
        })
    }

    /// 按输出配置创建
    pub fn from_config(io: &IoConfig) -> ZisaResult<Self> {
        Self::new(&io.directory, &io.filename.stem, &io.filename.pattern, io.suffix())
    }

    /// 输出目录
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// 第 `k` 个数据文件名
    pub fn filename(&self, k: usize) -> PathBuf {
        self.dir.join(format!(
            "{}{}{:0width$}{}{}",
            self.stem,
            self.prefix,
            k,
            self.postfix,
            self.suffix,
            width = self.width
        ))
    }

    /// 下一个数据文件名
    pub fn next_name(&mut self) -> PathBuf {
        let name = self.filename(self.count);
        self.count += 1;
        name
    }

    /// 从编号 `k` 继续
    pub fn advance_to(&mut self, k: usize) {
        self.count = k;
    }

    /// 下一个将要生成的编号
    pub fn count(&self) -> usize {
        self.count
    }

    /// 稳态文件
    pub fn steady_state_filename(&self) -> PathBuf {
        self.dir.join(format!("{}_steady-state{}", self.stem, self.suffix))
    }

    /// 参考解文件
    pub fn reference_filename(&self) -> PathBuf {
        self.dir.join(format!("{}_reference{}", self.stem, self.suffix))
    }

    /// 时间序列集合文件 `<dir>/<stem>.pvd`
    pub fn collection_filename(&self) -> PathBuf {
        self.dir.join(format!("{}.pvd", self.stem))
    }

    /// 网格文件
    pub fn grid_filename(&self) -> PathBuf {
        self.dir.join(format!("{}_grid{}", self.stem, self.suffix))
    }

    /// 数据文件的编号，不是数据文件时返回 `None`
    pub fn generation(&self, path: &Path) -> Option<usize> {
        let name = path.file_name()?.to_str()?;
        let digits = name
            .strip_prefix(self.stem.as_str())?
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?
            .strip_suffix(self.postfix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if self.width > 0 && digits.len() < self.width {
            return None;
        }
        digits.parse().ok()
    }

    fn data_files(&self) -> ZisaResult<Vec<(usize, PathBuf)>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| ZisaError::io_with_source(format!("读取目录 {} 失败", self.dir.display()), e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if let Some(k) = self.generation(&path) {
                files.push((k, path));
            }
        }
        files.sort();
        Ok(files)
    }

    /// 编号最大的数据文件
    pub fn find_last_data_file(&self) -> ZisaResult<Option<PathBuf>> {
        Ok(self.data_files()?.pop().map(|(_, p)| p))
    }

    /// 编号最小的数据文件
    pub fn find_first_data_file(&self) -> ZisaResult<Option<PathBuf>> {
        Ok(self.data_files()?.into_iter().next().map(|(_, p)| p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_and_special_names() {
        let mut fng = FileNameGenerator::new("out", "polytrope", "-%04d", ".zsnp").unwrap();
        assert_eq!(fng.next_name(), Path::new("out/polytrope-0000.zsnp"));
        assert_eq!(fng.next_name(), Path::new("out/polytrope-0001.zsnp"));
        fng.advance_to(12);
        assert_eq!(fng.next_name(), Path::new("out/polytrope-0012.zsnp"));
        assert_eq!(fng.count(), 13);

        assert_eq!(fng.grid_filename(), Path::new("out/polytrope_grid.zsnp"));
        assert_eq!(fng.collection_filename(), Path::new("out/polytrope.pvd"));
        assert_eq!(
            fng.steady_state_filename(),
            Path::new("out/polytrope_steady-state.zsnp")
        );
    }

    #[test]
    fn test_generation() {
        let fng = FileNameGenerator::new("data", "fng", "_data-%04d", ".vtu").unwrap();
        assert_eq!(fng.generation(Path::new("data/fng_data-0014.vtu")), Some(14));
        assert_eq!(fng.generation(Path::new("data/fng_grid.vtu")), None);
        assert_eq!(fng.generation(Path::new("data/fng_steady-state.vtu")), None);
        assert_eq!(fng.generation(Path::new("data/fng_data-0014.zsnp")), None);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FileNameGenerator::new("out", "x", "-%s", ".zsnp").is_err());
    }

    #[test]
    fn test_find_last_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut fng = FileNameGenerator::new(dir.path(), "fng", "_data-%04d", ".zsnp").unwrap();
        fng.advance_to(10);

        let mut files: Vec<PathBuf> = (0..5).map(|_| fng.next_name()).collect();
        files.push(fng.steady_state_filename());
        files.push(fng.grid_filename());
        for f in &files {
            std::fs::write(f, ":)").unwrap();
        }

        let last = fng.find_last_data_file().unwrap().unwrap();
        assert_eq!(last, dir.path().join("fng_data-0014.zsnp"));
        let first = fng.find_first_data_file().unwrap().unwrap();
        assert_eq!(first, dir.path().join("fng_data-0010.zsnp"));
    }
}
