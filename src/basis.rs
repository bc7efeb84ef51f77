pub mod base;
pub mod bspline;
pub mod bspline_modified;
pub mod lagrange_nak_spline;
pub mod linear;
pub mod linear_stretched;
pub mod nak_bspline;
pub mod wavelet;
