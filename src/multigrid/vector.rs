use num_traits::Float;

///
/// `x = a * x + b * y`
///
#[inline]
pub fn vect_add_mul<T: Float>(a: T, x: &mut [T], b: T, y: &[T])
{
    for (xi, &yi) in x.iter_mut().zip(y)
    {
        *xi = a * *xi + b * yi;
    }
}

///
/// `x = x - y`
///
#[inline]
pub fn vect_diff<T: Float>(x: &mut [T], y: &[T])
{
    vect_add_mul(T::one(), x, -T::one(), y);
}

#[inline]
pub fn vect_set_value<T: Float>(x: &mut [T], value: T)
{
    x.iter_mut().for_each(|xi| *xi = value);
}

#[inline]
pub fn scalar_product<T: Float>(x: &[T], y: &[T]) -> T
{
    x.iter().zip(y).fold(T::zero(), |acc, (&a, &b)| acc + a * b)
}

#[inline]
pub fn l2_norm<T: Float>(x: &[T]) -> T
{
    scalar_product(x, x).sqrt()
}

#[test]
fn check_vector_helpers()
{
    let mut x = vec![1.0, 2.0, 3.0];
    vect_add_mul(2.0, &mut x, -1.0, &[1.0, 1.0, 1.0]);
    assert_eq!(x, vec![1.0, 3.0, 5.0]);
    vect_diff(&mut x, &[1.0, 3.0, 1.0]);
    assert_eq!(x, vec![0.0, 0.0, 4.0]);
    assert_eq!(l2_norm(&x), 4.0);
    assert_eq!(scalar_product(&[1.0_f32, 2.0], &[3.0, 4.0]), 11.0);
    vect_set_value(&mut x, 0.5);
    assert_eq!(x, vec![0.5; 3]);
}
