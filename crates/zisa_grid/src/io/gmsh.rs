// crates/zisa_grid/src/io/gmsh.rs

//! GMSH 格式读写
//!
//! 支持 GMSH 2.x 和 4.x ASCII 格式，只接受三角形单元；线单元（边界
//! 物理标签）被忽略，四边形等其他二维单元视为错误。
//!
//! # 示例
//!
//! ```ignore
//! use zisa_grid::io::gmsh::GmshLoader;
//!
//! let data = GmshLoader::load("grids/polytrope/grid-2.msh")?;
//! println!("Loaded {} nodes and {} triangles", data.n_nodes(), data.n_cells());
//! ```

use glam::DVec2;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use zisa_foundation::{ZisaError, ZisaResult};

use crate::grid::{Grid, QuadratureDegrees};

type Lines<'a> = dyn Iterator<Item = std::io::Result<String>> + 'a;

/// GMSH 加载的网格数据
#[derive(Debug, Clone, Default)]
pub struct GmshMeshData {
    /// 节点坐标（z 被丢弃）
    pub nodes: Vec<DVec2>,
    /// 三角形节点索引（0 起始）
    pub triangles: Vec<[usize; 3]>,
}

impl GmshMeshData {
    /// 节点数量
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 单元数量
    pub fn n_cells(&self) -> usize {
        self.triangles.len()
    }

    /// 转换为 [`Grid`]
    pub fn into_grid(self, quad_degrees: QuadratureDegrees) -> ZisaResult<Grid> {
        Grid::new(self.nodes, self.triangles, quad_degrees)
    }
}

/// GMSH 文件加载器
pub struct GmshLoader;

impl GmshLoader {
    /// 加载 GMSH 文件
    pub fn load<P: AsRef<Path>>(path: P) -> ZisaResult<GmshMeshData> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ZisaError::file_not_found(path.display().to_string()));
        }
        let file = File::open(path)
            .map_err(|e| ZisaError::io_with_source(format!("无法打开 {}", path.display()), e))?;
        let data = Self::load_from_reader(BufReader::new(file))?;
        tracing::debug!(
            path = %path.display(),
            n_nodes = data.n_nodes(),
            n_cells = data.n_cells(),
            "读取 GMSH 网格"
        );
        Ok(data)
    }

    /// 从 reader 加载
    pub fn load_from_reader<R: BufRead>(reader: R) -> ZisaResult<GmshMeshData> {
        let mut lines = reader.lines();
        let mut nodes = Vec::new();
        let mut node_map: HashMap<usize, usize> = HashMap::new();
        let mut triangles = Vec::new();
        let mut version = 2;

        while let Some(line) = lines.next() {
            let line = line?;
            match line.trim() {
                "$MeshFormat" => {
                    if let Some(fmt) = lines.next() {
                        let fmt = fmt?;
                        let mut parts = fmt.split_whitespace();
                        version = parts
                            .next()
                            .and_then(|s| s.parse::<f64>().ok())
                            .unwrap_or(2.0) as i32;
                        if parts.next() == Some("1") {
                            return Err(ZisaError::invalid_mesh("不支持二进制 GMSH 文件"));
                        }
                    }
                    Self::skip_to(&mut lines, "$EndMeshFormat");
                }
                "$Nodes" => {
                    let (xy, map) = if version >= 4 {
                        Self::parse_nodes_v4(&mut lines)?
                    } else {
                        Self::parse_nodes_v2(&mut lines)?
                    };
                    nodes = xy;
                    node_map = map;
                }
                "$Elements" => {
                    triangles = if version >= 4 {
                        Self::parse_elements_v4(&mut lines, &node_map)?
                    } else {
                        Self::parse_elements_v2(&mut lines, &node_map)?
                    };
                }
                _ => {}
            }
        }

        if nodes.is_empty() {
            return Err(ZisaError::invalid_mesh("GMSH 文件中没有节点"));
        }
        if triangles.is_empty() {
            return Err(ZisaError::invalid_mesh("GMSH 文件中没有三角形单元"));
        }

        Ok(GmshMeshData { nodes, triangles })
    }

    /// 跳过到指定结束标记
    fn skip_to(lines: &mut Lines<'_>, end: &str) {
        while let Some(Ok(l)) = lines.next() {
            if l.trim() == end {
                break;
            }
        }
    }

    fn next_line(lines: &mut Lines<'_>, what: &str) -> ZisaResult<String> {
        lines
            .next()
            .ok_or_else(|| ZisaError::invalid_mesh(format!("缺少{what}")))?
            .map_err(ZisaError::from)
    }

    /// 解析节点 (v2 格式)
    fn parse_nodes_v2(lines: &mut Lines<'_>) -> ZisaResult<(Vec<DVec2>, HashMap<usize, usize>)> {
        let mut xy = Vec::new();
        let mut m = HashMap::new();

        let count = Self::next_line(lines, "节点数量")?;
        if let Ok(n) = count.trim().parse::<usize>() {
            xy.reserve(n);
            m.reserve(n);
        }

        while let Some(l) = lines.next() {
            let l = l?;
            let t = l.trim();
            if t == "$EndNodes" {
                break;
            }

            let parts: Vec<&str> = t.split_whitespace().collect();
            if parts.len() >= 3 {
                if let (Ok(tag), Ok(x), Ok(y)) = (
                    parts[0].parse::<usize>(),
                    parts[1].parse::<f64>(),
                    parts[2].parse::<f64>(),
                ) {
                    m.insert(tag, xy.len());
                    xy.push(DVec2::new(x, y));
                }
            }
        }
        Ok((xy, m))
    }

    /// 解析节点 (v4 格式)
    fn parse_nodes_v4(lines: &mut Lines<'_>) -> ZisaResult<(Vec<DVec2>, HashMap<usize, usize>)> {
        let header = Self::next_line(lines, "节点头")?;
        let parts: Vec<usize> = header
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 4 {
            return Err(ZisaError::invalid_mesh("节点头格式错误"));
        }

        let (num_blocks, total) = (parts[0], parts[1]);
        let mut xy = Vec::with_capacity(total);
        let mut m = HashMap::with_capacity(total);

        for _ in 0..num_blocks {
            let bh = Self::next_line(lines, "节点块头")?;
            let bh: Vec<usize> = bh
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            if bh.len() < 4 {
                continue;
            }
            let n = bh[3];

            let mut tags = Vec::with_capacity(n);
            for _ in 0..n {
                let tl = Self::next_line(lines, "节点标签")?;
                if let Ok(t) = tl.trim().parse::<usize>() {
                    tags.push(t);
                }
            }

            for tag in tags {
                let cl = Self::next_line(lines, "节点坐标")?;
                let c: Vec<f64> = cl
                    .split_whitespace()
                    .filter_map(|s| s.parse().ok())
                    .collect();
                if c.len() >= 2 {
                    m.insert(tag, xy.len());
                    xy.push(DVec2::new(c[0], c[1]));
                }
            }
        }

        Self::skip_to(lines, "$EndNodes");
        Ok((xy, m))
    }

    /// 将单元节点标签映射为 0 起始索引
    fn map_triangle(tags: &[usize], nm: &HashMap<usize, usize>) -> ZisaResult<[usize; 3]> {
        let mut tri = [0; 3];
        for (slot, t) in tri.iter_mut().zip(tags) {
            *slot = *nm
                .get(t)
                .ok_or_else(|| ZisaError::invalid_mesh(format!("单元引用了未定义的节点 {t}")))?;
        }
        Ok(tri)
    }

    /// GMSH 单元类型：1 线，2 三角形，3 四边形，15 点
    fn check_element_type(elem_type: usize) -> ZisaResult<bool> {
        match elem_type {
            2 => Ok(true),
            1 | 15 => Ok(false),
            other => Err(ZisaError::invalid_mesh(format!(
                "只支持三角形网格，遇到单元类型 {other}"
            ))),
        }
    }

    /// 解析单元 (v2 格式)
    fn parse_elements_v2(lines: &mut Lines<'_>, nm: &HashMap<usize, usize>) -> ZisaResult<Vec<[usize; 3]>> {
        let mut triangles = Vec::new();

        Self::next_line(lines, "单元数量")?;

        while let Some(l) = lines.next() {
            let l = l?;
            let t = l.trim();
            if t == "$EndElements" {
                break;
            }

            let parts: Vec<usize> = t.split_whitespace().filter_map(|s| s.parse().ok()).collect();
            if parts.len() < 3 {
                continue;
            }

            let (elem_type, n_tags) = (parts[1], parts[2]);
            if !Self::check_element_type(elem_type)? {
                continue;
            }
            let start = 3 + n_tags;
            if parts.len() < start + 3 {
                return Err(ZisaError::invalid_mesh(format!("三角形单元节点不足: {t}")));
            }
            triangles.push(Self::map_triangle(&parts[start..start + 3], nm)?);
        }
        Ok(triangles)
    }

    /// 解析单元 (v4 格式)
    fn parse_elements_v4(lines: &mut Lines<'_>, nm: &HashMap<usize, usize>) -> ZisaResult<Vec<[usize; 3]>> {
        let mut triangles = Vec::new();

        let header = Self::next_line(lines, "单元头")?;
        let parts: Vec<usize> = header
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 4 {
            return Err(ZisaError::invalid_mesh("单元头格式错误"));
        }

        for _ in 0..parts[0] {
            let bh = Self::next_line(lines, "单元块头")?;
            let bh: Vec<usize> = bh
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            if bh.len() < 4 {
                continue;
            }

            let (elem_type, n_elems) = (bh[2], bh[3]);
            let keep = Self::check_element_type(elem_type)?;

            for _ in 0..n_elems {
                let el = Self::next_line(lines, "单元")?;
                if !keep {
                    continue;
                }
                let p: Vec<usize> = el
                    .split_whitespace()
                    .filter_map(|s| s.parse().ok())
                    .collect();
                if p.len() < 4 {
                    return Err(ZisaError::invalid_mesh(format!("三角形单元节点不足: {el}")));
                }
                triangles.push(Self::map_triangle(&p[1..4], nm)?);
            }
        }

        Self::skip_to(lines, "$EndElements");
        Ok(triangles)
    }
}

/// 读取 GMSH 文件并构造网格
pub fn load_grid<P: AsRef<Path>>(path: P, quad_degrees: QuadratureDegrees) -> ZisaResult<Grid> {
    GmshLoader::load(path)?.into_grid(quad_degrees)
}

/// GMSH 文件写入器（2.2 ASCII）
pub struct GmshWriter;

impl GmshWriter {
    /// 将网格写入 GMSH 文件
    pub fn write<P: AsRef<Path>>(path: P, grid: &Grid) -> ZisaResult<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| ZisaError::io_with_source(format!("无法创建 {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        Self::write_to(&mut writer, grid)?;
        writer.flush()?;
        Ok(())
    }

    /// 写入到 writer
    pub fn write_to<W: Write>(writer: &mut W, grid: &Grid) -> ZisaResult<()> {
        writeln!(writer, "$MeshFormat")?;
        writeln!(writer, "2.2 0 8")?;
        writeln!(writer, "$EndMeshFormat")?;

        writeln!(writer, "$Nodes")?;
        writeln!(writer, "{}", grid.n_vertices())?;
        for (i, v) in grid.vertices.iter().enumerate() {
            writeln!(writer, "{} {:.17e} {:.17e} 0", i + 1, v.x, v.y)?;
        }
        writeln!(writer, "$EndNodes")?;

        writeln!(writer, "$Elements")?;
        writeln!(writer, "{}", grid.n_cells())?;
        for (i, v) in grid.vertex_indices.iter().enumerate() {
            writeln!(writer, "{} 2 2 0 0 {} {} {}", i + 1, v[0] + 1, v[1] + 1, v[2] + 1)?;
        }
        writeln!(writer, "$EndElements")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SIMPLE_MSH_V2: &str = r#"$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
4
1 0.0 0.0 0.0
2 1.0 0.0 0.0
3 1.0 1.0 0.0
4 0.0 1.0 0.0
$EndNodes
$Elements
4
1 1 2 1 1 1 2
2 1 2 1 1 2 3
3 2 2 0 0 1 2 3
4 2 2 0 0 1 3 4
$EndElements
"#;

    const SIMPLE_MSH_V4: &str = r#"$MeshFormat
4.1 0 8
$EndMeshFormat
$Nodes
1 3 1 3
2 1 0 3
1
2
3
0.0 0.0 0.0
1.0 0.0 0.0
0.5 1.0 0.0
$EndNodes
$Elements
2 2 1 2
1 1 1 1
1 1 2
2 1 2 1
2 1 2 3
$EndElements
"#;

    #[test]
    fn test_load_v2() {
        let data = GmshLoader::load_from_reader(Cursor::new(SIMPLE_MSH_V2)).unwrap();
        assert_eq!(data.n_nodes(), 4);
        assert_eq!(data.n_cells(), 2);
        assert_eq!(data.triangles[1], [0, 2, 3]);

        let grid = data.into_grid(QuadratureDegrees::default()).unwrap();
        assert!((grid.total_volume() - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_load_v4() {
        let data = GmshLoader::load_from_reader(Cursor::new(SIMPLE_MSH_V4)).unwrap();
        assert_eq!(data.n_nodes(), 3);
        assert_eq!(data.n_cells(), 1);
        assert_eq!(data.triangles[0], [0, 1, 2]);
    }

    #[test]
    fn test_rejects_quadrilaterals() {
        let quad = SIMPLE_MSH_V2.replace("3 2 2 0 0 1 2 3", "3 3 2 0 0 1 2 3 4");
        assert!(GmshLoader::load_from_reader(Cursor::new(quad)).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = GmshLoader::load("/nonexistent/grid.msh").unwrap_err();
        assert!(matches!(err, ZisaError::FileNotFound { .. }));
    }

    #[test]
    fn test_roundtrip() {
        let data = GmshLoader::load_from_reader(Cursor::new(SIMPLE_MSH_V2)).unwrap();
        let grid = data.into_grid(QuadratureDegrees::default()).unwrap();

        let mut buffer = Vec::new();
        GmshWriter::write_to(&mut buffer, &grid).unwrap();

        let loaded = GmshLoader::load_from_reader(Cursor::new(buffer)).unwrap();
        assert_eq!(loaded.n_nodes(), grid.n_vertices());
        assert_eq!(loaded.n_cells(), grid.n_cells());
        assert_eq!(loaded.nodes, grid.vertices);
    }
}
