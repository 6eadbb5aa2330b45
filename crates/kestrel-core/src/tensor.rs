use std::sync::{Arc, RwLock};

use rand::Rng;

use crate::dtype::{DType, WithDType};
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::storage::Storage;

// Tensor — Concrete operand for eager-mode operators
//
// A Tensor is the "already materialized" side of an operator descriptor:
// eager descriptors hold Tensors, graph descriptors hold symbolic handles.
// The descriptor contract only needs three things from it: a dtype, a shape,
// and a way to allocate a fresh tensor for a {dtype, shape} pair. The
// reference executor additionally reads values out as f64 and writes results
// back.
//
// MEMORY MODEL:
//
//   The inner data is wrapped in Arc, so cloning a Tensor is O(1) and a
//   descriptor can hold operands without copying them. Storage sits behind a
//   RwLock so the executor can fill a caller-supplied output tensor in place
//   while other handles to the same tensor observe the result.

/// Unique identifier for a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(u64);

impl Default for TensorId {
    fn default() -> Self {
        Self::new()
    }
}

impl TensorId {
    /// Generate a new unique tensor ID (uses a global atomic counter).
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        TensorId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Inner data of a tensor, shared via Arc.
struct TensorInner {
    id: TensorId,
    storage: RwLock<Storage>,
    shape: Shape,
    dtype: DType,
}

/// A dense, row-major, host-resident n-dimensional array.
///
/// # Example
/// ```
/// use kestrel_core::{DType, Tensor};
///
/// let t = Tensor::from_f64_slice(&[1.0, 2.0, 3.0, 4.0], (2, 2), DType::F32)?;
/// assert_eq!(t.dims(), &[2, 2]);
/// assert_eq!(t.dtype(), DType::F32);
/// # Ok::<(), kestrel_core::Error>(())
/// ```
#[derive(Clone)]
pub struct Tensor {
    inner: Arc<TensorInner>,
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tensor(id={:?}, shape={}, dtype={})",
            self.inner.id, self.inner.shape, self.inner.dtype,
        )
    }
}

impl Tensor {
    fn from_storage(storage: Storage, shape: Shape) -> Self {
        let dtype = storage.dtype();
        Tensor {
            inner: Arc::new(TensorInner {
                id: TensorId::new(),
                storage: RwLock::new(storage),
                shape,
                dtype,
            }),
        }
    }

    // Creation

    /// Allocate a zero-filled tensor for a `{dtype, shape}` pair.
    ///
    /// This is the allocation path the executor uses when a descriptor
    /// carries no pre-allocated output.
    pub fn zeros(shape: impl Into<Shape>, dtype: DType) -> Self {
        let shape = shape.into();
        let storage = Storage::zeros(dtype, shape.elem_count());
        Self::from_storage(storage, shape)
    }

    /// Create a tensor from f64 values, converting to `dtype`.
    pub fn from_f64_slice(data: &[f64], shape: impl Into<Shape>, dtype: DType) -> Result<Self> {
        let shape = shape.into();
        check_elem_count(&shape, data.len())?;
        Ok(Self::from_storage(Storage::from_f64(data, dtype), shape))
    }

    /// Create a tensor from typed values; the dtype follows `T`.
    pub fn from_slice<T: WithDType>(data: &[T], shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        check_elem_count(&shape, data.len())?;
        Ok(Self::from_storage(Storage::from_slice(data), shape))
    }

    /// Create a tensor of uniform random values in `[lo, hi)`.
    ///
    /// The caller owns the generator, so two tensors drawn from generators
    /// seeded identically are identical.
    pub fn rand_uniform<R: Rng + ?Sized>(
        shape: impl Into<Shape>,
        lo: f64,
        hi: f64,
        dtype: DType,
        rng: &mut R,
    ) -> Result<Self> {
        if !(lo < hi) {
            return Err(Error::invalid_argument(format!(
                "rand_uniform requires lo < hi, got [{lo}, {hi})"
            )));
        }
        if !lo.is_finite() || !hi.is_finite() || !(hi - lo).is_finite() {
            return Err(Error::invalid_argument(format!(
                "rand_uniform requires a finite range, got [{lo}, {hi})"
            )));
        }
        let shape = shape.into();
        let data: Vec<f64> = (0..shape.elem_count())
            .map(|_| rng.gen_range(lo..hi))
            .collect();
        Ok(Self::from_storage(Storage::from_f64(&data, dtype), shape))
    }

    // Accessors

    pub fn id(&self) -> TensorId {
        self.inner.id
    }

    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.inner.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.inner.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.inner.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.inner.shape.elem_count()
    }

    /// Whether two handles refer to the same underlying tensor.
    pub fn same_tensor(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Data access

    /// Copy all elements out as f64, in row-major order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.inner
            .storage
            .read()
            .expect("storage lock poisoned")
            .to_f64_vec()
    }

    /// Convert to a new tensor of another dtype.
    pub fn to_dtype(&self, dtype: DType) -> Tensor {
        let data = self.to_f64_vec();
        Self::from_storage(Storage::from_f64(&data, dtype), self.inner.shape.clone())
    }

    /// Overwrite every element in place, converting to this tensor's dtype.
    ///
    /// Used to fill a caller-supplied output; every clone of this handle sees
    /// the new values.
    pub fn write_f64(&self, data: &[f64]) -> Result<()> {
        check_elem_count(&self.inner.shape, data.len())?;
        let mut guard = self.inner.storage.write().expect("storage lock poisoned");
        *guard = Storage::from_f64(data, self.inner.dtype);
        Ok(())
    }
}

fn check_elem_count(shape: &Shape, got: usize) -> Result<()> {
    if got != shape.elem_count() {
        return Err(Error::ElementCountMismatch {
            shape: shape.clone(),
            expected: shape.elem_count(),
            got,
        });
    }
    Ok(())
}
