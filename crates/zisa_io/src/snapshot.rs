// crates/zisa_io/src/snapshot.rs

//! 二进制状态快照
//!
//! 用于重启与保存稳态。
//!
//! # 文件格式 (v1)
//!
//! ```text
//! [魔数: 4 bytes] "ZSNP"
//! [版本: u32]
//! [时间: f64]
//! [步数: u64]
//! [单元数: u64]
//! [守恒量个数: u32]
//! [附加量个数: u32]
//! [守恒量: n_cells * n_cvars * f64]  按单元连续存放
//! [附加量: n_cells * n_avars * f64]
//! [CRC32: u32]
//! ```
//!
//! 所有数值均为小端序。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;
use zisa_foundation::ZisaError;
use zisa_physics::model::{from_array, to_array, N_CVARS};
use zisa_physics::AllVariables;

/// 快照格式版本
pub const SNAPSHOT_VERSION: u32 = 1;

const SNAPSHOT_MAGIC: &[u8; 4] = b"ZSNP";

/// 头部字节数
const HEADER_LEN: usize = 4 + 4 + 8 + 8 + 8 + 4 + 4;

/// 快照错误
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 不是快照文件
    #[error("无效的快照文件格式")]
    BadMagic,

    /// 版本不兼容
    #[error("版本不兼容: 文件版本 {found}, 支持版本 {supported}")]
    Version {
        /// 文件中的版本
        found: u32,
        /// 当前支持的版本
        supported: u32,
    },

    /// 校验和错误
    #[error("校验和错误: 文件 {stored:08x}, 计算 {computed:08x}")]
    Checksum {
        /// 文件中的校验和
        stored: u32,
        /// 重新计算的校验和
        computed: u32,
    },

    /// 尺寸不匹配
    #[error("尺寸不匹配 {what}: 期望 {expected}, 实际 {found}")]
    SizeMismatch {
        /// 出错的量
        what: &'static str,
        /// 期望值
        expected: usize,
        /// 实际值
        found: usize,
    },
}

impl From<SnapshotError> for ZisaError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Io(source) => ZisaError::io_with_source("读写快照失败", source),
            SnapshotError::SizeMismatch { what, expected, found } => ZisaError::size_mismatch(what, expected, found),
            other => ZisaError::serialization(other.to_string()),
        }
    }
}

/// 快照操作结果
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// 快照头部
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotHeader {
    /// 版本
    pub version: u32,
    /// 模拟时间
    pub time: f64,
    /// 时间步数
    pub step: usize,
    /// 单元数
    pub n_cells: usize,
    /// 守恒量个数
    pub n_cvars: usize,
    /// 附加量个数
    pub n_avars: usize,
}

impl SnapshotHeader {
    fn data_len(&self) -> usize {
        self.n_cells
            .saturating_mul(self.n_cvars.saturating_add(self.n_avars))
            .saturating_mul(8)
    }

    fn parse(bytes: &[u8]) -> SnapshotResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(SnapshotError::SizeMismatch {
                what: "snapshot.header",
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        if &bytes[..4] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let mut r = ByteReader { bytes, offset: 4 };
        let version = r.u32();
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(Self {
            version,
            time: r.f64(),
            step: r.u64() as usize,
            n_cells: r.u64() as usize,
            n_cvars: r.u32() as usize,
            n_avars: r.u32() as usize,
        })
    }
}

/// 按固定宽度顺序读取小端数值，调用方保证长度足够
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl ByteReader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        buf
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.take())
    }
}

/// 一个时刻的全部变量
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// 模拟时间
    pub time: f64,
    /// 时间步数
    pub step: usize,
    /// 状态
    pub u: AllVariables,
}

impl Snapshot {
    /// 创建
    pub fn new(time: f64, step: usize, u: AllVariables) -> Self {
        Self { time, step, u }
    }

    /// 头部信息
    pub fn header(&self) -> SnapshotHeader {
        SnapshotHeader {
            version: SNAPSHOT_VERSION,
            time: self.time,
            step: self.step,
            n_cells: self.u.n_cells(),
            n_cvars: N_CVARS,
            n_avars: self.u.n_avars(),
        }
    }

    /// 编码为字节
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self.time, self.step, &self.u)
    }

    /// 从字节解码
    pub fn from_bytes(bytes: &[u8]) -> SnapshotResult<Self> {
        let header = SnapshotHeader::parse(bytes)?;
        if header.n_cvars != N_CVARS {
            return Err(SnapshotError::SizeMismatch {
                what: "snapshot.n_cvars",
                expected: N_CVARS,
                found: header.n_cvars,
            });
        }

        let expected = header.data_len().saturating_add(HEADER_LEN + 4);
        if bytes.len() != expected {
            return Err(SnapshotError::SizeMismatch {
                what: "snapshot.bytes",
                expected,
                found: bytes.len(),
            });
        }

        let (data, tail) = bytes.split_at(expected - 4);
        let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let computed = crc32(data);
        if stored != computed {
            return Err(SnapshotError::Checksum { stored, computed });
        }

        let mut r = ByteReader {
            bytes: data,
            offset: HEADER_LEN,
        };
        let mut u = AllVariables::zeros(header.n_cells, header.n_avars);
        for ui in &mut u.cvars {
            let mut a = [0.0; N_CVARS];
            for v in &mut a {
                *v = r.f64();
            }
            *ui = from_array(a);
        }
        for v in &mut u.avars {
            *v = r.f64();
        }

        Ok(Self {
            time: header.time,
            step: header.step,
            u,
        })
    }

    /// 保存
    pub fn save(&self, path: &Path) -> SnapshotResult<()> {
        save_state(path, self.time, self.step, &self.u)
    }

    /// 读取
    pub fn load(path: &Path) -> SnapshotResult<Self> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// 只读头部
    pub fn read_header(path: &Path) -> SnapshotResult<SnapshotHeader> {
        let mut bytes = [0u8; HEADER_LEN];
        let mut reader = BufReader::new(File::open(path)?);
        reader.read_exact(&mut bytes)?;
        SnapshotHeader::parse(&bytes)
    }

    /// 检查单元数与附加量个数
    pub fn check_compatible(&self, n_cells: usize, n_avars: usize) -> SnapshotResult<()> {
        if self.u.n_cells() != n_cells {
            return Err(SnapshotError::SizeMismatch {
                what: "snapshot.n_cells",
                expected: n_cells,
                found: self.u.n_cells(),
            });
        }
        if self.u.n_avars() != n_avars {
            return Err(SnapshotError::SizeMismatch {
                what: "snapshot.n_avars",
                expected: n_avars,
                found: self.u.n_avars(),
            });
        }
        Ok(())
    }
}

fn encode(time: f64, step: usize, u: &AllVariables) -> Vec<u8> {
    let n_cells = u.n_cells();
    let n_avars = u.n_avars();
    let mut data = Vec::with_capacity(HEADER_LEN + n_cells * (N_CVARS + n_avars) * 8 + 4);

    data.extend_from_slice(SNAPSHOT_MAGIC);
    data.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    data.extend_from_slice(&time.to_le_bytes());
    data.extend_from_slice(&(step as u64).to_le_bytes());
    data.extend_from_slice(&(n_cells as u64).to_le_bytes());
    data.extend_from_slice(&(N_CVARS as u32).to_le_bytes());
    data.extend_from_slice(&(n_avars as u32).to_le_bytes());

    for ui in &u.cvars {
        for v in to_array(ui) {
            data.extend_from_slice(&v.to_le_bytes());
        }
    }
    for v in &u.avars {
        data.extend_from_slice(&v.to_le_bytes());
    }

    let crc = crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    data
}

/// 把状态写成快照，先写临时文件再重命名
pub fn save_state(path: &Path, time: f64, step: usize, u: &AllVariables) -> SnapshotResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("zsnp.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(&encode(time, step, u))?;
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;

    tracing::debug!("写入快照 {} (t = {:.6e}, k = {})", path.display(), time, step);
    Ok(())
}

// ============================================================================
// CRC32
// ============================================================================

/// IEEE CRC32
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = CRC32_TABLE[index] ^ (crc >> 8);
    }
    !crc
}

const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = 0xEDB8_8320 ^ (crc >> 1);
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const CRC32_TABLE: [u32; 256] = generate_crc32_table();
