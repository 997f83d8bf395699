// crates/zisa_io/src/vtu.rs

//! VTU 格式导出
//!
//! 导出 VTK Unstructured Grid，用于 ParaView 可视化。
//!
//! - 单元数据：`rho, vx, vy, p, E`、幽灵单元标志与附加量
//! - ASCII，或 base64 编码的 `AppendedData`：每个数组单独编码为
//!   `u32` 字节数头 + 小端数据，`offset` 是该块在编码串中的位置
//! - 时间序列由 [`PvdCollection`] 汇总

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;
use zisa_foundation::ZisaError;
use zisa_grid::Grid;
use zisa_physics::{AllVariables, Euler};

/// VTU 导出错误
#[derive(Debug, Error)]
pub enum VtuError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 无效数据
    #[error("无效数据: {0}")]
    InvalidData(String),
}

impl From<VtuError> for ZisaError {
    fn from(e: VtuError) -> Self {
        match e {
            VtuError::Io(source) => ZisaError::io_with_source("写入 VTU 失败", source),
            VtuError::InvalidData(message) => ZisaError::invalid_input(message),
        }
    }
}

/// VTK 三角形单元类型
const VTK_TRIANGLE: u8 = 5;

/// VTU 导出器
#[derive(Debug, Clone, Default)]
pub struct VtuExporter {
    binary: bool,
    tracer_names: Vec<String>,
}

impl VtuExporter {
    /// 创建 ASCII 导出器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置二进制模式
    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// 附加量的名称，缺省为 `tracer_<j>`
    pub fn with_tracer_names(mut self, names: Vec<String>) -> Self {
        self.tracer_names = names;
        self
    }

    fn tracer_name(&self, j: usize) -> String {
        self.tracer_names
            .get(j)
            .cloned()
            .unwrap_or_else(|| format!("tracer_{j}"))
    }

    /// 导出单帧
    pub fn export(
        &self,
        path: impl AsRef<Path>,
        grid: &Grid,
        euler: &Euler,
        u: &AllVariables,
        time: f64,
    ) -> Result<(), VtuError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut w = BufWriter::new(File::create(path)?);
        self.write(&mut w, grid, euler, u, time)?;
        w.flush()?;
        Ok(())
    }

    /// 写入任意输出流
    pub fn write<W: Write>(
        &self,
        w: &mut W,
        grid: &Grid,
        euler: &Euler,
        u: &AllVariables,
        time: f64,
    ) -> Result<(), VtuError> {
        let n_cells = grid.n_cells();
        if u.n_cells() != n_cells {
            return Err(VtuError::InvalidData(format!(
                "状态有 {} 个单元, 网格有 {} 个",
                u.n_cells(),
                n_cells
            )));
        }

        let mut a = ArrayWriter {
            w,
            appended: self.binary.then(String::new),
        };

        writeln!(a.w, r#"<?xml version="1.0"?>"#)?;
        writeln!(
            a.w,
            r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt32">"#
        )?;
        writeln!(a.w, r#"  <UnstructuredGrid>"#)?;
        writeln!(a.w, r#"    <FieldData>"#)?;
        a.write_array("Float64", "TimeValue", 1, &[time])?;
        writeln!(a.w, r#"    </FieldData>"#)?;
        writeln!(
            a.w,
            r#"    <Piece NumberOfPoints="{}" NumberOfCells="{}">"#,
            grid.n_vertices(),
            n_cells
        )?;

        // 点
        let points: Vec<f64> = grid.vertices.iter().flat_map(|v| [v.x, v.y, 0.0]).collect();
        writeln!(a.w, r#"      <Points>"#)?;
        a.write_array("Float64", "Points", 3, &points)?;
        writeln!(a.w, r#"      </Points>"#)?;

        // 单元
        let connectivity: Vec<i64> = grid
            .vertex_indices
            .iter()
            .flat_map(|tri| tri.map(|v| v as i64))
            .collect();
        let offsets: Vec<i64> = (1..=n_cells as i64).map(|i| 3 * i).collect();
        let types = vec![VTK_TRIANGLE; n_cells];
        writeln!(a.w, r#"      <Cells>"#)?;
        a.write_array("Int64", "connectivity", 1, &connectivity)?;
        a.write_array("Int64", "offsets", 1, &offsets)?;
        a.write_array("UInt8", "types", 1, &types)?;
        writeln!(a.w, r#"      </Cells>"#)?;

        // 单元数据
        writeln!(a.w, r#"      <CellData Scalars="rho">"#)?;
        let natural: Vec<[f64; 4]> = u.cvars.iter().map(|ui| euler.natural_variables(ui)).collect();
        for (c, name) in ["rho", "vx", "vy", "p"].into_iter().enumerate() {
            let field: Vec<f64> = natural.iter().map(|q| q[c]).collect();
            a.write_array("Float64", name, 1, &field)?;
        }
        let energy: Vec<f64> = u.cvars.iter().map(|ui| ui[4]).collect();
        a.write_array("Float64", "E", 1, &energy)?;

        let ghost: Vec<u8> = grid.cell_flags.iter().map(|f| u8::from(f.ghost_cell)).collect();
        a.write_array("UInt8", "ghost_cell", 1, &ghost)?;

        for j in 0..u.n_avars() {
            let tracer: Vec<f64> = (0..n_cells).map(|i| u.avars_of(i)[j]).collect();
            a.write_array("Float64", &self.tracer_name(j), 1, &tracer)?;
        }
        writeln!(a.w, r#"      </CellData>"#)?;

        writeln!(a.w, r#"    </Piece>"#)?;
        writeln!(a.w, r#"  </UnstructuredGrid>"#)?;
        if let Some(encoded) = &a.appended {
            writeln!(a.w, r#"  <AppendedData encoding="base64">"#)?;
            writeln!(a.w, "   _{encoded}")?;
            writeln!(a.w, r#"  </AppendedData>"#)?;
        }
        writeln!(a.w, r#"</VTKFile>"#)?;
        Ok(())
    }
}

/// 写 `DataArray`；二进制模式下数据进入 `appended`，标签里只留偏移
struct ArrayWriter<'a, W: Write> {
    w: &'a mut W,
    appended: Option<String>,
}

impl<W: Write> ArrayWriter<'_, W> {
    fn write_array<T>(&mut self, vtk_type: &str, name: &str, n_components: usize, data: &[T]) -> Result<(), VtuError>
    where
        T: bytemuck::Pod + Display,
    {
        let head = format!(r#"        <DataArray type="{vtk_type}" Name="{name}" NumberOfComponents="{n_components}""#);

        let Some(appended) = &mut self.appended else {
            write!(self.w, r#"{head} format="ascii">"#)?;
            for (k, v) in data.iter().enumerate() {
                if k > 0 {
                    write!(self.w, " ")?;
                }
                write!(self.w, "{v}")?;
            }
            writeln!(self.w, "</DataArray>")?;
            return Ok(());
        };

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let n_bytes =
            u32::try_from(bytes.len()).map_err(|_| VtuError::InvalidData(format!("数组 {name} 超过 4 GiB")))?;
        let mut block = Vec::with_capacity(4 + bytes.len());
        block.extend_from_slice(&n_bytes.to_le_bytes());
        block.extend_from_slice(bytes);

        writeln!(self.w, r#"{head} format="appended" offset="{}"/>"#, appended.len())?;
        appended.push_str(&BASE64.encode(&block));
        Ok(())
    }
}

// ============================================================================
// PVD 集合
// ============================================================================

/// ParaView 时间序列集合文件
#[derive(Debug, Clone)]
pub struct PvdCollection {
    path: PathBuf,
    entries: Vec<(f64, String)>,
}

impl PvdCollection {
    /// 创建，`path` 为 `.pvd` 文件
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// 集合文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一帧，`file` 为相对集合文件的路径
    pub fn push(&mut self, time: f64, file: impl Into<String>) {
        self.entries.push((time, file.into()));
    }

    /// 帧数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 写入集合文件
    pub fn write(&self) -> Result<(), VtuError> {
        let mut w = BufWriter::new(File::create(&self.path)?);

        writeln!(w, r#"<?xml version="1.0"?>"#)?;
        writeln!(w, r#"<VTKFile type="Collection" version="0.1" byte_order="LittleEndian">"#)?;
        writeln!(w, r#"  <Collection>"#)?;
        for (time, file) in &self.entries {
            writeln!(w, r#"    <DataSet timestep="{time}" group="" part="0" file="{file}"/>"#)?;
        }
        writeln!(w, r#"  </Collection>"#)?;
        writeln!(w, r#"</VTKFile>"#)?;

        w.flush()?;
        Ok(())
    }
}
