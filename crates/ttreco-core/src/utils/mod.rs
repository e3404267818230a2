/// Useful enumerations for object kinds, decay channels, and selections common in $`t\bar{t}`$
/// analyses.
pub mod enums;
/// Momentum-tensor event shapes for collections of physics objects.
pub mod shapes;
/// Three- and four-vector types with collider kinematics (in particular, $`p_T`$, $`\eta`$, and
/// $`\phi`$ views of a four-momentum).
pub mod vectors;

/// A helper method to get the $`i`$-th element of `values` or a padding value when the slice is
/// too short.
pub fn get_or_pad<T: Copy>(values: &[T], index: usize, f: impl Fn(T) -> f64, pad: f64) -> f64 {
    values.get(index).map(|&value| f(value)).unwrap_or(pad)
}
