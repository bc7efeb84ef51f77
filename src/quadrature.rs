pub mod gauss_legendre;
