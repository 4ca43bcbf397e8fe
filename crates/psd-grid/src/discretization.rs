// ─────────────────────────────────────────────────────────────────────
// PSD Inversion — Discretization
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Runtime choice between a full and a partial grid.

use ndarray::Array1;
use psd_types::config::GridConfig;
use psd_types::error::InversionResult;

use crate::grid::Grid;
use crate::partial::{Compaction, PartialGrid};
use crate::GridLike;

#[derive(Debug, Clone)]
pub enum Discretization {
    Full(Grid),
    Partial(PartialGrid),
}

impl Discretization {
    /// Build the grid described by a config section; a `cut` makes it partial.
    pub fn from_config(cfg: &GridConfig) -> InversionResult<Self> {
        cfg.validate()?;
        let grid = Grid::new(cfg.span, cfg.ne, cfg.spacing)?;
        match &cfg.cut {
            Some(cut) => Ok(Discretization::Partial(grid.partial(cut.upper, cut.lower)?)),
            None => Ok(Discretization::Full(grid)),
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Discretization::Partial(_))
    }

    pub fn as_dyn(&self) -> &dyn GridLike {
        match self {
            Discretization::Full(g) => g,
            Discretization::Partial(p) => p,
        }
    }
}

impl From<Grid> for Discretization {
    fn from(g: Grid) -> Self {
        Discretization::Full(g)
    }
}

impl From<PartialGrid> for Discretization {
    fn from(p: PartialGrid) -> Self {
        Discretization::Partial(p)
    }
}

impl GridLike for Discretization {
    fn full(&self) -> &Grid {
        self.as_dyn().full()
    }

    fn compaction(&self) -> Option<&Compaction> {
        self.as_dyn().compaction()
    }

    fn element_area(&self) -> Array1<f64> {
        self.as_dyn().element_area()
    }
}
