/// Square 2D grid of nutrient concentrations with periodic diffusion.
///
/// Cells are addressed by integer `(x, y)` in `[0, size)` and stored row-major.
/// Consumption clamps at zero; diffusion does not clamp, so an explicit step may
/// leave values slightly outside `[0, c_max]` until the next pass evens them out.
#[derive(Clone, Debug)]
pub struct NutrientField {
    size: usize,
    c_max: f64,
    d_c: f64,
    dt: f64,
    data: Vec<f64>,
    // Write target for `diffuse`; swapped with `data` after each pass.
    scratch: Vec<f64>,
}

impl NutrientField {
    /// Create a field with every cell at `c_max`.
    pub fn new(size: usize, c_max: f64, d_c: f64, dt: f64) -> Self {
        debug_assert!(size > 0, "grid size must be positive");
        debug_assert!(c_max > 0.0, "c_max must be positive");
        let cells = size * size;
        Self {
            size,
            c_max,
            d_c,
            dt,
            data: vec![c_max; cells],
            scratch: vec![0.0; cells],
        }
    }

    /// Current concentration at `(x, y)`.
    pub fn read(&self, x: usize, y: usize) -> f64 {
        self.data[self.index(x, y)]
    }

    /// Overwrite the concentration at `(x, y)`.
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Remove `amount` from `(x, y)`, clamping the cell at zero.
    ///
    /// Returns what was actually withdrawn.
    pub fn consume(&mut self, x: usize, y: usize, amount: f64) -> f64 {
        debug_assert!(amount >= 0.0, "consumption amount cannot be negative");
        let idx = self.index(x, y);
        let before = self.data[idx];
        let after = (before - amount.max(0.0)).max(0.0);
        self.data[idx] = after;
        (before - after).max(0.0)
    }

    /// Advance one explicit Euler step of `∂c/∂t = D_c ∇²c` on a torus.
    ///
    /// Every cell is updated from the same pre-step snapshot:
    /// `c' = c + dt·D_c·(N + S + E + W − 4c)`.
    pub fn diffuse(&mut self) {
        let n = self.size;
        let k = self.dt * self.d_c;
        let (src, dst) = (&self.data, &mut self.scratch);
        for y in 0..n {
            let up = if y == 0 { n - 1 } else { y - 1 };
            let down = if y + 1 == n { 0 } else { y + 1 };
            let row = y * n;
            for x in 0..n {
                let left = if x == 0 { n - 1 } else { x - 1 };
                let right = if x + 1 == n { 0 } else { x + 1 };
                let center = src[row + x];
                let laplacian = src[up * n + x] + src[down * n + x] + src[row + left]
                    + src[row + right]
                    - 4.0 * center;
                dst[row + x] = center + k * laplacian;
            }
        }
        std::mem::swap(&mut self.data, &mut self.scratch);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn c_max(&self) -> f64 {
        self.c_max
    }

    pub fn d_c(&self) -> f64 {
        self.d_c
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Row-major cell values, `data()[y * size() + x]`.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Summed concentration over the whole grid.
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size, "cell ({x}, {y}) out of bounds");
        y * self.size + x
    }
}
