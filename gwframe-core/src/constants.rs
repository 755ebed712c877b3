#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const PI: f64 = 3.141592653589793238462643;

#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const HALF_PI: f64 = 1.5707963267948966192313216;

#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const TWOPI: f64 = 6.283185307179586476925287;

#[allow(clippy::excessive_precision)]
pub const PI_SQUARED: f64 = 9.869604401089358618834491;

#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const SQRT2: f64 = 1.4142135623730950488;

/// Euler–Mascheroni constant γ_E, entering the 3PN flux.
#[allow(clippy::excessive_precision)]
pub const EULER_GAMMA: f64 = 0.5772156649015328606065121;

/// Lowest spherical-harmonic index carried by gravitational radiation.
pub const ELL_MIN: i32 = 2;

/// Highest `ℓ` the PN amplitude formulas provide.
pub const PN_ELL_MAX: i32 = 4;

/// Below this magnitude a complex rotor component is treated as zero in the
/// Wigner D evaluation.
pub const WIGNER_EPSILON: f64 = 1e-14;

/// Default tolerance for treating a quaternion as unit or identity.
pub const QUATERNION_TOLERANCE: f64 = 1e-12;

/// Default threshold below which a sample's selected mode norm is degenerate.
pub const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Default terminal PN parameter `v = (M ω)^{1/3}`.
pub const DEFAULT_V_MAX: f64 = 0.4;
