/// Largest supported grid edge length in cells. Keeps the dense nutrient grid
/// (two `f64` buffers) within a few hundred megabytes.
pub const MAX_GRID_SIZE: usize = 4096;

/// Upper bound for the initial population placed by `Colony::reset`.
pub const MAX_INITIAL_AGENTS: usize = 250_000;

/// Stability limit of the explicit 5-point diffusion stencil: `dt * D_c` must not exceed it.
pub const DIFFUSION_STABILITY_LIMIT: f64 = 0.25;

/// Mean run length (in motile steps) between heading redraws.
pub const DEFAULT_PERSISTENCE_MEAN: f64 = 10.0;

/// Half-width of the uniform jitter applied around the grid centre when seeding agents.
pub const DEFAULT_INITIAL_JITTER: usize = 25;
