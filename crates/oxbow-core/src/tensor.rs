//! Dense tensors with explicit shape and a fixed element dtype.
//!
//! Pool streams are flat row-major buffers paired with a shape vector.
//! The leading axis is always the pool (trajectory) axis; timed streams
//! carry the tick axis second. Only the structural operations the pool
//! needs are provided: concatenation and truncation along the pool
//! axis, row gathering, zero-padding of the tick axis, and total dtype
//! casts.

use smallvec::SmallVec;
use std::fmt;

/// Shape vector. Streams are low-rank, so extents stay inline.
pub type Shape = SmallVec<[usize; 4]>;

/// Element type of a tensor.
///
/// Matches the dtypes the replay pool actually stores: floating-point
/// observations, rewards, and memories; integer actions; byte liveness
/// flags. Casts between any pair are total (numeric conversion).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// 32-bit float. The default for observations, rewards, memories.
    F32,
    /// 32-bit signed integer. The default for actions.
    I32,
    /// Unsigned byte. Used for liveness flags.
    U8,
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::I32 => write!(f, "i32"),
            Self::U8 => write!(f, "u8"),
        }
    }
}

/// Tensor payload, tagged by dtype.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    /// 32-bit float payload.
    F32(Vec<f32>),
    /// 32-bit signed integer payload.
    I32(Vec<i32>),
    /// Unsigned byte payload.
    U8(Vec<u8>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    fn dtype(&self) -> Dtype {
        match self {
            Self::F32(_) => Dtype::F32,
            Self::I32(_) => Dtype::I32,
            Self::U8(_) => Dtype::U8,
        }
    }
}

/// Apply a structural (dtype-preserving) buffer transform to a payload.
macro_rules! map_payload {
    ($payload:expr, |$buf:ident| $body:expr) => {
        match $payload {
            TensorData::F32($buf) => TensorData::F32($body),
            TensorData::I32($buf) => TensorData::I32($body),
            TensorData::U8($buf) => TensorData::U8($body),
        }
    };
}

/// A dense row-major tensor.
///
/// # Examples
///
/// ```
/// use oxbow_core::{Dtype, Tensor};
///
/// let t = Tensor::from_f32(&[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
/// assert_eq!(t.shape(), &[2, 3]);
/// assert_eq!(t.dtype(), Dtype::F32);
/// assert_eq!(t.row(1).as_f32().unwrap(), &[3.0, 4.0, 5.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: TensorData,
}

impl Tensor {
    /// Create a tensor from a flat `f32` buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of `shape`.
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> Self {
        Self::from_data(shape, TensorData::F32(data))
    }

    /// Create a tensor from a flat `i32` buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of `shape`.
    pub fn from_i32(shape: &[usize], data: Vec<i32>) -> Self {
        Self::from_data(shape, TensorData::I32(data))
    }

    /// Create a tensor from a flat `u8` buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of `shape`.
    pub fn from_u8(shape: &[usize], data: Vec<u8>) -> Self {
        Self::from_data(shape, TensorData::U8(data))
    }

    fn from_data(shape: &[usize], data: TensorData) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected,
            "tensor data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Self {
            shape: Shape::from_slice(shape),
            data,
        }
    }

    /// An all-zero tensor of the given shape and dtype.
    pub fn zeros(shape: &[usize], dtype: Dtype) -> Self {
        let len: usize = shape.iter().product();
        let data = match dtype {
            Dtype::F32 => TensorData::F32(vec![0.0; len]),
            Dtype::I32 => TensorData::I32(vec![0; len]),
            Dtype::U8 => TensorData::U8(vec![0; len]),
        };
        Self {
            shape: Shape::from_slice(shape),
            data,
        }
    }

    /// An all-one tensor of the given shape and dtype.
    pub fn ones(shape: &[usize], dtype: Dtype) -> Self {
        let len: usize = shape.iter().product();
        let data = match dtype {
            Dtype::F32 => TensorData::F32(vec![1.0; len]),
            Dtype::I32 => TensorData::I32(vec![1; len]),
            Dtype::U8 => TensorData::U8(vec![1; len]),
        };
        Self {
            shape: Shape::from_slice(shape),
            data,
        }
    }

    /// The tensor's shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The tensor's element dtype.
    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of rows along the leading (pool) axis.
    ///
    /// Zero for rank-0 tensors.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Elements per leading-axis row.
    fn row_len(&self) -> usize {
        self.shape[1..].iter().product()
    }

    /// The flat payload as `&[f32]`, if this is an `F32` tensor.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// The flat payload as `&[i32]`, if this is an `I32` tensor.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            TensorData::I32(v) => Some(v),
            _ => None,
        }
    }

    /// The flat payload as `&[u8]`, if this is a `U8` tensor.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            TensorData::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to the given dtype, numerically casting every element.
    ///
    /// Returns a clone when the dtype already matches.
    pub fn cast(&self, dtype: Dtype) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        let data = match (&self.data, dtype) {
            (TensorData::F32(v), Dtype::I32) => {
                TensorData::I32(v.iter().map(|&x| x as i32).collect())
            }
            (TensorData::F32(v), Dtype::U8) => {
                TensorData::U8(v.iter().map(|&x| x as u8).collect())
            }
            (TensorData::I32(v), Dtype::F32) => {
                TensorData::F32(v.iter().map(|&x| x as f32).collect())
            }
            (TensorData::I32(v), Dtype::U8) => {
                TensorData::U8(v.iter().map(|&x| x as u8).collect())
            }
            (TensorData::U8(v), Dtype::F32) => {
                TensorData::F32(v.iter().map(|&x| f32::from(x)).collect())
            }
            (TensorData::U8(v), Dtype::I32) => {
                TensorData::I32(v.iter().map(|&x| i32::from(x)).collect())
            }
            // Same-dtype pairs are handled by the early return.
            _ => unreachable!("cast to identical dtype"),
        };
        Self {
            shape: self.shape.clone(),
            data,
        }
    }

    /// Concatenate `other` after `self` along the leading (pool) axis.
    ///
    /// # Panics
    ///
    /// Panics if the dtypes differ or the trailing extents disagree.
    /// Pool operations validate both before concatenating.
    pub fn concat_rows(&self, other: &Self) -> Self {
        assert_eq!(
            self.shape[1..],
            other.shape[1..],
            "concat_rows: trailing extents disagree"
        );
        let data = match (&self.data, &other.data) {
            (TensorData::F32(a), TensorData::F32(b)) => {
                TensorData::F32(a.iter().chain(b).copied().collect())
            }
            (TensorData::I32(a), TensorData::I32(b)) => {
                TensorData::I32(a.iter().chain(b).copied().collect())
            }
            (TensorData::U8(a), TensorData::U8(b)) => {
                TensorData::U8(a.iter().chain(b).copied().collect())
            }
            _ => panic!(
                "concat_rows: dtype mismatch ({} vs {})",
                self.dtype(),
                other.dtype()
            ),
        };
        let mut shape = self.shape.clone();
        shape[0] += other.rows();
        Self { shape, data }
    }

    /// Keep only the most recent `n` leading-axis rows.
    ///
    /// Returns a clone when `n` is at least the current row count.
    pub fn last_rows(&self, n: usize) -> Self {
        let rows = self.rows();
        if n >= rows {
            return self.clone();
        }
        let row_len = self.row_len();
        let start = (rows - n) * row_len;
        let data = map_payload!(&self.data, |v| v[start..].to_vec());
        let mut shape = self.shape.clone();
        shape[0] = n;
        Self { shape, data }
    }

    /// Gather leading-axis rows at the given indices, in order.
    ///
    /// Indices may repeat; repeats duplicate the row.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range. Pool operations validate
    /// indices before gathering.
    pub fn gather_rows(&self, indices: &[usize]) -> Self {
        let rows = self.rows();
        let row_len = self.row_len();
        let data = map_payload!(&self.data, |v| {
            let mut out = Vec::with_capacity(indices.len() * row_len);
            for &i in indices {
                assert!(i < rows, "gather_rows: index {i} out of range [0, {rows})");
                out.extend_from_slice(&v[i * row_len..(i + 1) * row_len]);
            }
            out
        });
        let mut shape = self.shape.clone();
        shape[0] = indices.len();
        Self { shape, data }
    }

    /// A copy of the `i`-th leading-axis row, with the axis removed.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn row(&self, i: usize) -> Self {
        let rows = self.rows();
        assert!(i < rows, "row: index {i} out of range [0, {rows})");
        let row_len = self.row_len();
        let data = map_payload!(&self.data, |v| v[i * row_len..(i + 1) * row_len].to_vec());
        Self {
            shape: Shape::from_slice(&self.shape[1..]),
            data,
        }
    }

    /// Append one all-zero tick to the time axis of a `[pool, time, ..]`
    /// tensor, so that reading tick `time` never faults.
    ///
    /// # Panics
    ///
    /// Panics if the tensor has fewer than two axes.
    pub fn pad_time(&self) -> Self {
        assert!(
            self.rank() >= 2,
            "pad_time requires a [pool, time, ..] tensor, got rank {}",
            self.rank()
        );
        let pool = self.shape[0];
        let time = self.shape[1];
        let tick_len: usize = self.shape[2..].iter().product();
        let row_len = time * tick_len;
        let data = match &self.data {
            TensorData::F32(v) => TensorData::F32(pad_rows(v, pool, row_len, tick_len, 0.0)),
            TensorData::I32(v) => TensorData::I32(pad_rows(v, pool, row_len, tick_len, 0)),
            TensorData::U8(v) => TensorData::U8(pad_rows(v, pool, row_len, tick_len, 0)),
        };
        let mut shape = self.shape.clone();
        shape[1] += 1;
        Self { shape, data }
    }

    /// Per-row tick gather on a `[pool, time, ..]` tensor: row `i` of
    /// the result is `self[i, ticks[i]]`, shaped `[ticks.len(), ..]`.
    ///
    /// # Panics
    ///
    /// Panics if `ticks` addresses a row or tick out of range. The
    /// action-result step validates tick states first.
    pub fn gather_ticks(&self, ticks: &[usize]) -> Self {
        assert!(
            self.rank() >= 2,
            "gather_ticks requires a [pool, time, ..] tensor, got rank {}",
            self.rank()
        );
        let pool = self.shape[0];
        let time = self.shape[1];
        let tick_len: usize = self.shape[2..].iter().product();
        assert!(
            ticks.len() <= pool,
            "gather_ticks: {} tick states for {pool} pool rows",
            ticks.len()
        );
        let data = map_payload!(&self.data, |v| {
            let mut out = Vec::with_capacity(ticks.len() * tick_len);
            for (i, &t) in ticks.iter().enumerate() {
                assert!(t < time, "gather_ticks: tick {t} out of range [0, {time})");
                let start = (i * time + t) * tick_len;
                out.extend_from_slice(&v[start..start + tick_len]);
            }
            out
        });
        let mut shape = Shape::new();
        shape.push(ticks.len());
        shape.extend_from_slice(&self.shape[2..]);
        Self { shape, data }
    }
}

fn pad_rows<T: Copy>(data: &[T], rows: usize, row_len: usize, tick_len: usize, zero: T) -> Vec<T> {
    let mut out = Vec::with_capacity(rows * (row_len + tick_len));
    for r in 0..rows {
        out.extend_from_slice(&data[r * row_len..(r + 1) * row_len]);
        out.extend(std::iter::repeat(zero).take(tick_len));
    }
    out
}
