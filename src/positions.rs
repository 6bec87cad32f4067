use nalgebra::Vector3;

/// Indexable view over particle positions. Must not change while a build
/// reads it.
pub trait PositionSource: Sync {
    fn len(&self) -> usize;

    fn position(&self, i: usize) -> Vector3<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PositionSource for [Vector3<f64>] {
    #[inline]
    fn len(&self) -> usize {
        <[Vector3<f64>]>::len(self)
    }

    #[inline]
    fn position(&self, i: usize) -> Vector3<f64> {
        self[i]
    }
}

impl PositionSource for [[f64; 3]] {
    #[inline]
    fn len(&self) -> usize {
        <[[f64; 3]]>::len(self)
    }

    #[inline]
    fn position(&self, i: usize) -> Vector3<f64> {
        Vector3::from(self[i])
    }
}

impl<T: PositionSource + ?Sized> PositionSource for &T {
    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn position(&self, i: usize) -> Vector3<f64> {
        (**self).position(i)
    }
}

impl PositionSource for Vec<Vector3<f64>> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn position(&self, i: usize) -> Vector3<f64> {
        self[i]
    }
}

impl PositionSource for Vec<[f64; 3]> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn position(&self, i: usize) -> Vector3<f64> {
        Vector3::from(self[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_x<P: PositionSource + ?Sized>(p: &P) -> f64 {
        (0..p.len()).map(|i| p.position(i).x).sum()
    }

    #[test]
    fn test_sources_agree() {
        let arrays = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let vectors: Vec<Vector3<f64>> = arrays.iter().map(|&a| Vector3::from(a)).collect();

        assert_eq!(sum_x(&arrays), 5.0);
        assert_eq!(sum_x(arrays.as_slice()), 5.0);
        assert_eq!(sum_x(&vectors), 5.0);
        assert_eq!(sum_x(&&vectors[..]), 5.0);
        assert_eq!(vectors.as_slice().position(1), Vector3::new(4.0, 5.0, 6.0));
        assert!(!PositionSource::is_empty(arrays.as_slice()));
    }
}
