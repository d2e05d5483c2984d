//! Per-environment gather from slot-major arrays.
use crate::error::AcerBufferError;
use anyhow::Result;
use ndarray::{Array, ArrayBase, Axis, Data, RemoveAxis};

/// Gathers one row per environment from an array laid out as `[slot, env, ...]`.
///
/// Row `e` of the output is `field[idx[e], envx[e]]`, so the output has
/// shape `[idx.len(), field.shape()[2..]]`. Each environment may come from a
/// different slot.
///
/// # Examples
///
/// ```
/// use border_acer_buffer::take;
/// use ndarray::Array;
///
/// // 3 slots, 2 environments
/// let field = Array::from_shape_vec((3, 2), vec![0, 1, 10, 11, 20, 21]).unwrap();
/// let out = take(&field, &[2, 0], &[0, 1]).unwrap();
/// assert_eq!(out.to_vec(), vec![20, 1]);
/// ```
pub fn take<A, S, D>(
    field: &ArrayBase<S, D>,
    idx: &[usize],
    envx: &[usize],
) -> Result<Array<A, D::Smaller>>
where
    A: Clone + Default,
    S: Data<Elem = A>,
    D: RemoveAxis,
    D::Smaller: RemoveAxis,
{
    if idx.len() != envx.len() {
        return Err(AcerBufferError::InvalidShape {
            field: "envx",
            expected: vec![idx.len()],
            actual: vec![envx.len()],
        }
        .into());
    }

    let (n_slots, n_envs) = (field.len_of(Axis(0)), field.len_of(Axis(1)));
    check_bounds("idx", idx, n_slots)?;
    check_bounds("envx", envx, n_envs)?;

    let mut dim = field.raw_dim().remove_axis(Axis(0));
    dim[0] = idx.len();
    let mut out = Array::<A, D::Smaller>::default(dim);

    for (e, (&i, &env)) in idx.iter().zip(envx.iter()).enumerate() {
        out.index_axis_mut(Axis(0), e)
            .assign(&field.index_axis(Axis(0), i).index_axis(Axis(0), env));
    }

    Ok(out)
}

fn check_bounds(field: &'static str, ixs: &[usize], bound: usize) -> Result<()> {
    match ixs.iter().find(|&&ix| ix >= bound) {
        Some(&index) => Err(AcerBufferError::IndexOutOfBounds {
            field,
            index,
            bound,
        }
        .into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3, Array4};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_take_keeps_environments_apart() -> Result<()> {
        let (n_slots, n_envs, n_actions) = (5, 4, 3);
        let field = Array3::from_shape_fn((n_slots, n_envs, n_actions), |(i, e, a)| {
            (100 * i + 10 * e + a) as f32
        });
        let envx = (0..n_envs).collect::<Vec<_>>();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            let idx = (0..n_envs)
                .map(|_| rng.gen_range(0..n_slots))
                .collect::<Vec<_>>();
            let out = take(&field, &idx, &envx)?;
            assert_eq!(out.shape(), &[n_envs, n_actions]);
            for e in 0..n_envs {
                assert_eq!(out.row(e), field.slice(s![idx[e], e, ..]));
            }
        }
        Ok(())
    }

    #[test]
    fn test_take_high_rank() -> Result<()> {
        let field = Array4::from_shape_fn((3, 2, 2, 2), |(i, e, h, w)| i * 1000 + e * 100 + h * 10 + w);
        let out = take(&field, &[1, 2], &[0, 1])?;
        assert_eq!(out.shape(), &[2, 2, 2]);
        assert_eq!(out.index_axis(Axis(0), 0), field.slice(s![1, 0, .., ..]));
        assert_eq!(out.index_axis(Axis(0), 1), field.slice(s![2, 1, .., ..]));
        Ok(())
    }

    #[test]
    fn test_take_out_of_bounds() {
        let field = Array3::<i32>::zeros((2, 3, 1));

        let err = take(&field, &[0, 2, 1], &[0, 1, 2]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AcerBufferError>(),
            Some(&AcerBufferError::IndexOutOfBounds {
                field: "idx",
                index: 2,
                bound: 2
            })
        );

        let err = take(&field, &[0, 1, 1], &[0, 1, 3]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcerBufferError>(),
            Some(AcerBufferError::IndexOutOfBounds { field: "envx", .. })
        ));

        assert!(take(&field, &[0, 1], &[0, 1, 2]).is_err());
    }
}
