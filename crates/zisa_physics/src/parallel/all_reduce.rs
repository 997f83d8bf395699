// crates/zisa_physics/src/parallel/all_reduce.rs

//! 跨分区归约
//!
//! 每个分区线程持有一个 [`ThreadAllReduce`] 句柄，共享同一组归约槽。
//! 所有分区必须以相同的顺序调用相同的归约；某个分区提前退出时，
//! 其余分区的归约返回错误而不是永久阻塞。

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use zisa_foundation::{ZisaError, ZisaResult};

/// 归约运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// 最小值
    Min,
    /// 最大值
    Max,
    /// 求和
    Sum,
}

impl ReduceOp {
    #[inline]
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            Self::Sum => a + b,
        }
    }
}

/// 全局归约
pub trait AllReduce: Send + Sync {
    /// 对所有分区的值做归约
    fn reduce(&self, value: f64, op: ReduceOp) -> ZisaResult<f64>;

    /// 全局最小值
    fn min(&self, value: f64) -> ZisaResult<f64> {
        self.reduce(value, ReduceOp::Min)
    }

    /// 全局和
    fn sum(&self, value: f64) -> ZisaResult<f64> {
        self.reduce(value, ReduceOp::Sum)
    }

    /// 所有分区都为真
    fn all(&self, flag: bool) -> ZisaResult<bool> {
        Ok(self.reduce(if flag { 1.0 } else { 0.0 }, ReduceOp::Min)? > 0.5)
    }
}

/// 串行运行：归约即恒等
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAllReduce;

impl AllReduce for NoAllReduce {
    fn reduce(&self, value: f64, _op: ReduceOp) -> ZisaResult<f64> {
        Ok(value)
    }
}

#[derive(Debug)]
struct ReductionState {
    generation: u64,
    arrived: usize,
    accumulator: f64,
    result: f64,
    abandoned: bool,
}

#[derive(Debug)]
struct ReductionShared {
    n_parts: usize,
    state: Mutex<ReductionState>,
    cv: Condvar,
}

/// 线程间归约句柄
#[derive(Debug)]
pub struct ThreadAllReduce {
    shared: Arc<ReductionShared>,
}

impl ThreadAllReduce {
    /// 为 `n_parts` 个分区创建共享同一归约槽的句柄
    pub fn group(n_parts: usize) -> Vec<ThreadAllReduce> {
        let shared = Arc::new(ReductionShared {
            n_parts,
            state: Mutex::new(ReductionState {
                generation: 0,
                arrived: 0,
                accumulator: 0.0,
                result: 0.0,
                abandoned: false,
            }),
            cv: Condvar::new(),
        });
        (0..n_parts)
            .map(|_| ThreadAllReduce {
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl AllReduce for ThreadAllReduce {
    fn reduce(&self, value: f64, op: ReduceOp) -> ZisaResult<f64> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if state.abandoned {
            return Err(ZisaError::runtime("归约组中有分区已退出"));
        }

        state.accumulator = if state.arrived == 0 {
            value
        } else {
            op.apply(state.accumulator, value)
        };
        state.arrived += 1;

        if state.arrived == shared.n_parts {
            state.result = state.accumulator;
            state.arrived = 0;
            state.generation += 1;
            shared.cv.notify_all();
            return Ok(state.result);
        }

        let generation = state.generation;
        while state.generation == generation && !state.abandoned {
            shared.cv.wait(&mut state);
        }
        if state.generation != generation {
            Ok(state.result)
        } else {
            Err(ZisaError::runtime("归约组中有分区已退出"))
        }
    }
}

impl Drop for ThreadAllReduce {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.abandoned = true;
        self.shared.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_all_reduce() {
        let r = NoAllReduce;
        assert_eq!(r.min(3.0).unwrap(), 3.0);
        assert!(r.all(true).unwrap());
        assert!(!r.all(false).unwrap());
    }

    #[test]
    fn test_thread_all_reduce() {
        let handles = ThreadAllReduce::group(4);
        let results: Vec<(f64, f64, bool)> = std::thread::scope(|s| {
            let joins: Vec<_> = handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| {
                    s.spawn(move || {
                        let mut out = (0.0, 0.0, false);
                        // 多轮归约检验槽的复用
                        for _ in 0..10 {
                            out = (
                                h.min(rank as f64 + 1.0).unwrap(),
                                h.sum(rank as f64).unwrap(),
                                h.all(rank != 2).unwrap(),
                            );
                        }
                        out
                    })
                })
                .collect();
            joins.into_iter().map(|j| j.join().unwrap()).collect()
        });

        for r in results {
            assert_eq!(r, (1.0, 6.0, false));
        }
    }

    #[test]
    fn test_abandoned_group_errors() {
        let mut handles = ThreadAllReduce::group(2);
        let survivor = handles.pop().unwrap();
        drop(handles);
        assert!(survivor.min(1.0).is_err());
    }
}
