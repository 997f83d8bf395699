// crates/zisa_physics/src/parallel/halo.rs

//! 光环（halo）交换
//!
//! 每个分区只拥有部分单元，模板延伸到的其他分区单元构成光环。
//! 交换分两步：[`HaloExchange::start`] 把本分区拥有、其他分区需要的单元值发出，
//! [`HaloExchange::wait`] 接收并写入本地光环单元。
//!
//! 通道实现为每对有邻接关系的分区 `(p → q)` 建一条 `mpsc` 通道，
//! 消息的顺序由通道保证，无需标签。

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::Mutex;
use zisa_foundation::{ensure, ZisaError, ZisaResult};

use super::local_grid::LocalGrid;
use crate::model::{AllVariables, N_CVARS};

// ============================================================================
// 光环描述
// ============================================================================

/// 向分区 `part` 请求的单元（全局编号）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloRemoteInfo {
    /// 拥有这些单元的分区
    pub part: usize,
    /// 全局编号，升序
    pub global: Vec<usize>,
}

/// 从分区 `part` 接收的值写入的本地单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloReceiveInfo {
    /// 发送方分区
    pub part: usize,
    /// 本地编号，与 [`HaloRemoteInfo::global`] 一一对应
    pub local: Vec<usize>,
}

/// 发往分区 `part` 的本地单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloSendInfo {
    /// 接收方分区
    pub part: usize,
    /// 本地编号，按全局编号升序
    pub local: Vec<usize>,
}

/// 一个分区的光环
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Halo {
    /// 按拥有者分组的远程单元
    pub remote_info: Vec<HaloRemoteInfo>,
    /// 对应的本地单元
    pub local_info: Vec<HaloReceiveInfo>,
}

impl Halo {
    /// 光环单元总数
    pub fn n_cells(&self) -> usize {
        self.local_info.iter().map(|r| r.local.len()).sum()
    }
}

// ============================================================================
// 交换
// ============================================================================

/// 光环交换
pub trait HaloExchange: Send + Sync {
    /// 发出本分区拥有的单元值
    fn start(&self, u: &AllVariables) -> ZisaResult<()>;

    /// 接收光环单元值
    fn wait(&self, u: &mut AllVariables) -> ZisaResult<()>;

    /// 发出并接收
    fn exchange(&self, u: &mut AllVariables) -> ZisaResult<()> {
        self.start(u)?;
        self.wait(u)
    }

    /// 描述
    fn describe(&self) -> String;
}

/// 串行运行：没有光环
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaloExchange;

impl HaloExchange for NoHaloExchange {
    fn start(&self, _u: &AllVariables) -> ZisaResult<()> {
        Ok(())
    }

    fn wait(&self, _u: &mut AllVariables) -> ZisaResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "no_halo_exchange".into()
    }
}

fn pack(u: &AllVariables, cells: &[usize]) -> Vec<f64> {
    let mut buffer = Vec::with_capacity(cells.len() * u.n_vars());
    for &i in cells {
        buffer.extend(u.cvars[i].iter());
        buffer.extend_from_slice(u.avars_of(i));
    }
    buffer
}

fn unpack(u: &mut AllVariables, cells: &[usize], buffer: &[f64]) -> ZisaResult<()> {
    let n_vars = u.n_vars();
    ZisaError::check_size("halo.buffer", cells.len() * n_vars, buffer.len())?;
    for (&i, chunk) in cells.iter().zip(buffer.chunks_exact(n_vars)) {
        u.cvars[i].copy_from_slice(&chunk[..N_CVARS]);
        u.avars_of_mut(i).copy_from_slice(&chunk[N_CVARS..]);
    }
    Ok(())
}

/// 基于 `mpsc` 通道的光环交换
#[derive(Debug)]
pub struct ChannelHaloExchange {
    part: usize,
    senders: Vec<(HaloSendInfo, Sender<Vec<f64>>)>,
    receivers: Vec<(HaloReceiveInfo, Mutex<Receiver<Vec<f64>>>)>,
}

impl ChannelHaloExchange {
    /// 为所有分区建立通道，返回值按分区编号排列
    pub fn network(local_grids: &[LocalGrid]) -> ZisaResult<Vec<Self>> {
        let mut pending: HashMap<(usize, usize), Receiver<Vec<f64>>> = HashMap::new();
        let mut senders: Vec<Vec<(HaloSendInfo, Sender<Vec<f64>>)>> = Vec::with_capacity(local_grids.len());

        for lg in local_grids {
            let mut part_senders = Vec::with_capacity(lg.send_info.len());
            for info in &lg.send_info {
                let (tx, rx) = channel();
                pending.insert((lg.part, info.part), rx);
                part_senders.push((info.clone(), tx));
            }
            senders.push(part_senders);
        }

        let mut network = Vec::with_capacity(local_grids.len());
        for (lg, part_senders) in local_grids.iter().zip(senders) {
            let mut receivers = Vec::with_capacity(lg.halo.local_info.len());
            for info in &lg.halo.local_info {
                let rx = pending.remove(&(info.part, lg.part)).ok_or_else(|| {
                    ZisaError::internal(format!("分区 {} 未向分区 {} 发送光环", info.part, lg.part))
                })?;
                receivers.push((info.clone(), Mutex::new(rx)));
            }
            network.push(Self {
                part: lg.part,
                senders: part_senders,
                receivers,
            });
        }

        ensure!(
            pending.is_empty(),
            ZisaError::internal(format!("{} 条光环通道没有接收方", pending.len()))
        );
        Ok(network)
    }

    /// 分区编号
    pub fn part(&self) -> usize {
        self.part
    }
}

impl HaloExchange for ChannelHaloExchange {
    fn start(&self, u: &AllVariables) -> ZisaResult<()> {
        for (info, tx) in &self.senders {
            tx.send(pack(u, &info.local))?;
        }
        Ok(())
    }

    fn wait(&self, u: &mut AllVariables) -> ZisaResult<()> {
        for (info, rx) in &self.receivers {
            let buffer = rx.lock().recv().map_err(|_| {
                ZisaError::ChannelRecvError(format!("分区 {} 的光环数据未到达分区 {}", info.part, self.part))
            })?;
            unpack(u, &info.local, &buffer)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "channel_halo_exchange[part {}, {} neighbours]",
            self.part,
            self.receivers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let mut u = AllVariables::zeros(4, 2);
        for i in 0..4 {
            u.cvars[i].fill(i as f64);
            u.avars_of_mut(i).copy_from_slice(&[10.0 + i as f64, 20.0 + i as f64]);
        }
        let buffer = pack(&u, &[3, 1]);
        assert_eq!(buffer.len(), 2 * 7);

        let mut v = AllVariables::zeros(4, 2);
        unpack(&mut v, &[0, 2], &buffer).unwrap();
        assert_eq!(v.cvars[0], u.cvars[3]);
        assert_eq!(v.avars_of(2), u.avars_of(1));
        assert!(unpack(&mut v, &[0], &buffer).is_err());
    }

    #[test]
    fn test_no_halo_exchange() {
        let mut u = AllVariables::zeros(2, 0);
        u.cvars[1][0] = 3.0;
        NoHaloExchange.exchange(&mut u).unwrap();
        assert_eq!(u.cvars[1][0], 3.0);
    }
}
