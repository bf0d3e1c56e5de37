//! Reference integration schemes for Strider simulations.
//!
//! | Scheme | Passes | Kind |
//! |--------|--------|------|
//! | [`Euler`] | 1 | explicit, 1st order |
//! | [`Rk2`] | 2 | explicit midpoint, 2nd order |
//! | [`Rkmm`] | 5 | Runge-Kutta-Merson, 4th order |
//! | [`Rk4`] | 4 | classical Runge-Kutta, 4th order |
//! | [`Dopri45`] | 6 | Dormand-Prince 5(4), adaptive, FSAL |
//! | [`Dopri87`] | 13 | Dormand-Prince 8(7), adaptive |
//! | [`Pc233`] | 3 | real-time predictor-corrector, 3rd order |
//! | [`Rtam2`] | 2 | real-time Adams-Moulton, 2nd order |
//! | [`Rtam4`] | 2 | real-time Adams-Moulton, 4th order |
//!
//! The predictor-corrector schemes need derivative history from earlier
//! steps and bootstrap through [`Rk4`] until they have it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod dopri45;
pub mod dopri87;
pub mod euler;
pub mod pc233;
pub mod rk2;
pub mod rk4;
pub mod rkmm;
pub mod rtam2;
pub mod rtam4;
mod tableau;

pub use dopri45::Dopri45;
pub use dopri87::Dopri87;
pub use euler::Euler;
pub use pc233::Pc233;
pub use rk2::Rk2;
pub use rk4::Rk4;
pub use rkmm::Rkmm;
pub use rtam2::Rtam2;
pub use rtam4::Rtam4;

use strider_integrator::Integrator;

/// Names accepted by [`by_name`].
pub const SCHEMES: [&str; 9] = [
    "euler", "rk2", "rkmm", "rk4", "dopri45", "dopri87", "pc233", "rtam2", "rtam4",
];

/// Look up a scheme prototype by its case-insensitive name.
///
/// ```
/// let rk4 = strider_integrators::by_name("RK4").unwrap();
/// assert_eq!(rk4.name(), "rk4");
/// assert!(strider_integrators::by_name("leapfrog").is_none());
/// ```
pub fn by_name(name: &str) -> Option<Box<dyn Integrator>> {
    let scheme: Box<dyn Integrator> = match name.to_ascii_lowercase().as_str() {
        "euler" => Box::new(Euler),
        "rk2" => Box::new(Rk2::default()),
        "rkmm" => Box::new(Rkmm::default()),
        "rk4" => Box::new(Rk4::default()),
        "dopri45" => Box::new(Dopri45::default()),
        "dopri87" => Box::new(Dopri87::default()),
        "pc233" => Box::new(Pc233::default()),
        "rtam2" => Box::new(Rtam2::default()),
        "rtam4" => Box::new(Rtam4::default()),
        _ => return None,
    };
    Some(scheme)
}
