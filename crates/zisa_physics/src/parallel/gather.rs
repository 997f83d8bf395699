// crates/zisa_physics/src/parallel/gather.rs

//! 全局状态与分区状态的互相转换

use zisa_foundation::{ZisaError, ZisaResult};

use super::local_grid::LocalGrid;
use crate::model::AllVariables;

/// 取出分区需要的全部单元（含光环）
pub fn scatter_all_variables(global: &AllVariables, local: &LocalGrid) -> AllVariables {
    let n_avars = global.n_avars();
    let mut u = AllVariables::zeros(local.n_cells(), n_avars);
    for (l, &g) in local.local2global.iter().enumerate() {
        u.cvars[l] = global.cvars[g];
        u.avars_of_mut(l).copy_from_slice(global.avars_of(g));
    }
    u
}

/// 把分区拥有的单元写回全局状态
pub fn gather_owned(global: &mut AllVariables, local: &LocalGrid, u: &AllVariables) -> ZisaResult<()> {
    ZisaError::check_size("gather.n_cells", local.n_cells(), u.n_cells())?;
    ZisaError::check_size("gather.n_avars", global.n_avars(), u.n_avars())?;
    for l in 0..local.n_owned {
        let g = local.local2global[l];
        ZisaError::check_index("Cell", g, global.n_cells())?;
        global.cvars[g] = u.cvars[l];
        global.avars_of_mut(g).copy_from_slice(u.avars_of(l));
    }
    Ok(())
}

/// 由各分区的状态拼出全局状态
pub fn gather_all_variables<'a, I>(n_cells: usize, n_avars: usize, parts: I) -> ZisaResult<AllVariables>
where
    I: IntoIterator<Item = (&'a LocalGrid, &'a AllVariables)>,
{
    let mut global = AllVariables::zeros(n_cells, n_avars);
    let mut n_gathered = 0;
    for (local, u) in parts {
        gather_owned(&mut global, local, u)?;
        n_gathered += local.n_owned;
    }
    ZisaError::check_size("gather.owned_cells", n_cells, n_gathered)?;
    Ok(global)
}
