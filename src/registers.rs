use fxhash::FxHashMap;

use crate::{error::ArgumentError, lexer::parse_number};

/// Index of the accumulator register.
pub const ACC: usize = 0;

/// Registers below this index live in a contiguous block, the rest in a map.
const DENSE_LIMIT: usize = 1 << 16;

/// Growable register file. Cells that were never written read as zero.
///
/// Low registers are stored densely. Any index up to `usize::MAX` can be
/// written without allocating the cells in between.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    dense: Vec<i64>,
    sparse: FxHashMap<usize, i64>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed registers 1..=n with `values`, leaving the accumulator at zero.
    pub fn with_values(values: impl IntoIterator<Item = i64>) -> Self {
        let mut regs = Self::new();
        for (i, value) in values.into_iter().enumerate() {
            regs.set(i + 1, value);
        }
        regs
    }

    /// Parse command line arguments as the initial values of registers 1..=n.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ArgumentError> {
        let values = args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let arg = arg.as_ref();
                parse_number(arg).map_err(|error| ArgumentError {
                    register: i + 1,
                    value: arg.to_string(),
                    error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_values(values))
    }

    pub fn get(&self, idx: usize) -> i64 {
        if idx < DENSE_LIMIT {
            self.dense.get(idx).copied().unwrap_or(0)
        } else {
            self.sparse.get(&idx).copied().unwrap_or(0)
        }
    }

    /// Store `value` at `idx`, growing the file to cover it if necessary.
    pub fn set(&mut self, idx: usize, value: i64) {
        if idx >= DENSE_LIMIT {
            self.sparse.insert(idx, value);
            return;
        }
        if idx >= self.dense.len() {
            self.dense.resize(idx + 1, 0);
        }
        self.dense[idx] = value;
    }

    pub fn acc(&self) -> i64 {
        self.get(ACC)
    }

    pub fn set_acc(&mut self, value: i64) {
        self.set(ACC, value)
    }

    /// Amount of physically stored cells. Only grows.
    pub fn len(&self) -> usize {
        self.dense.len() + self.sparse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First `count` logical cells, including unset ones.
    pub fn iter(&self, count: usize) -> impl Iterator<Item = (usize, i64)> + '_ {
        (0..count).map(|i| (i, self.get(i)))
    }
}
