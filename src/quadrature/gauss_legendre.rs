use std::f64::consts::PI;

use static_init::dynamic;

use crate::errors::SGError;

/// Highest order kept in the precomputed table.
pub const GL_MAX_ORDER: usize = 20;

///
/// Gauss-Legendre rule on `(0, 1)`, nodes in increasing order. An `n`-point rule integrates
/// polynomials up to degree `2n - 1` exactly.
///
#[derive(Clone, Debug, PartialEq)]
pub struct GaussLegendreRule
{
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl GaussLegendreRule
{
    #[inline]
    pub fn order(&self) -> usize
    {
        self.nodes.len()
    }

    ///
    /// Applies the rule to `f` on `[lower, upper]`.
    ///
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, lower: f64, upper: f64) -> f64
    {
        let width = upper - lower;
        self.nodes.iter().zip(&self.weights).map(|(&node, &weight)| weight * f(lower + width * node)).sum::<f64>() * width
    }
}

/// Compute the Legendre polynomial P_n(x) and its derivative using recurrence
fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64)
{
    let mut p0 = 1.0;
    let mut p1 = x;
    let mut dp0 = 0.0;
    let mut dp1 = 1.0;
    for k in 2..=n
    {
        let kf = k as f64;
        let pk = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        let dpk = ((2.0 * kf - 1.0) * (p1 + x * dp1) - (kf - 1.0) * dp0) / kf;
        p0 = p1;
        p1 = pk;
        dp0 = dp1;
        dp1 = dpk;
    }
    (p1, dp1)
}

///
/// Newton iteration for the roots of P_n, started from the Chebyshev-like guesses.
///
fn compute_rule(n: usize) -> GaussLegendreRule
{
    let eps = 1e-15;
    let mut pairs = Vec::with_capacity(n);
    for i in 0..n
    {
        let theta = PI * (i as f64 + 0.75) / (n as f64 + 0.5);
        let mut x = theta.cos();
        for _ in 0..100
        {
            let (p, dp) = legendre_and_derivative(n, x);
            let dx = -p / dp;
            x += dx;
            if dx.abs() < eps
            {
                break;
            }
        }
        let (_, dp) = legendre_and_derivative(n, x);
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        // map from (-1, 1) to (0, 1)
        pairs.push((0.5 * (x + 1.0), 0.5 * w));
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (nodes, weights) = pairs.into_iter().unzip();
    GaussLegendreRule { nodes, weights }
}

#[dynamic]
static GL_TABLE: Vec<GaussLegendreRule> = (1..=GL_MAX_ORDER).map(compute_rule).collect();

///
/// Returns the precomputed `order`-point rule. Valid orders are `1..=GL_MAX_ORDER`.
///
pub fn gauss_legendre(order: usize) -> Result<&'static GaussLegendreRule, SGError>
{
    if order == 0 || order > GL_MAX_ORDER
    {
        return Err(SGError::InvalidQuadratureOrder(order));
    }
    Ok(&GL_TABLE[order - 1])
}

#[test]
fn test_gauss_legendre()
{
    let rule = gauss_legendre(10).unwrap();
    let expected_nodes = [0.0130467357414145,0.067468316655508,0.160295215850488,0.283302302935377,0.425562830509185,0.574437169490815,0.716697697064624,0.839704784149512,0.932531683344492,0.986953264258586];
    let expected_weights = [0.033335672154344,0.07472567457529,0.109543181257991,0.134633359654998,0.147762112357376,0.147762112357376,0.134633359654998,0.109543181257991,0.07472567457529,0.033335672154344];
    for (n1, n2) in rule.nodes.iter().zip(expected_nodes.iter())
    {
        assert!((n1 - n2).abs() < 1e-12);
    }
    for (w1, w2) in rule.weights.iter().zip(expected_weights.iter())
    {
        assert!((w1 - w2).abs() < 1e-12);
    }
}

#[test]
fn check_polynomial_exactness()
{
    for order in 1..=GL_MAX_ORDER
    {
        let rule = gauss_legendre(order).unwrap();
        assert_eq!(rule.order(), order);
        let degree = (2 * order - 1) as i32;
        let exact = 1.0 / (degree + 1) as f64;
        let approx = rule.integrate(|x| x.powi(degree), 0.0, 1.0);
        assert!((approx - exact).abs() < 1e-13, "order {}", order);
        assert!((rule.weights.iter().sum::<f64>() - 1.0).abs() < 1e-13);
    }
}

#[test]
fn check_invalid_order()
{
    assert_eq!(gauss_legendre(0), Err(SGError::InvalidQuadratureOrder(0)));
    assert_eq!(gauss_legendre(21), Err(SGError::InvalidQuadratureOrder(21)));
}
