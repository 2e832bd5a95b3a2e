use bls12_381_plus::ff::Field;
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;

use super::group::{invert, random_scalar, Scalar};

/// Polynomial over the scalar field, `coefficients[0]` being the constant
/// term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<Scalar>,
}

impl Polynomial {
    /// Samples a random polynomial of the given degree with `q(0) = secret`.
    pub fn random(rng: &mut impl CryptoRngCore, degree: usize, secret: Scalar) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret);
        coefficients.extend((0..degree).map(|_| random_scalar(rng)));
        Self { coefficients }
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Evaluates the polynomial using Horner's rule.
    #[must_use]
    pub fn evaluate(&self, x: &Scalar) -> Scalar {
        self.coefficients
            .iter()
            .rev()
            .fold(Scalar::ZERO, |acc, c| acc * x + c)
    }

    /// Evaluates the polynomial at the share index `i`, indices starting at 1.
    #[must_use]
    pub fn share(&self, i: usize) -> Scalar {
        self.evaluate(&index_to_scalar(i))
    }
}

fn index_to_scalar(i: usize) -> Scalar {
    Scalar::from(i as u64)
}

/// Lagrange coefficient `Δ_i(0) = Π_{j≠i} (0 - j) / (i - j)` of the index
/// `i` over the given set of distinct indices.
///
/// # Panics
///
/// Panics if `indices` holds duplicates, the coefficient is then undefined.
#[must_use]
pub fn lagrange_coefficient(i: usize, indices: &[usize]) -> Scalar {
    let x_i = index_to_scalar(i);
    let (numerator, denominator) = indices.iter().filter(|&&j| j != i).fold(
        (Scalar::ONE, Scalar::ONE),
        |(num, den), &j| {
            let x_j = index_to_scalar(j);
            (num * -x_j, den * (x_i - x_j))
        },
    );
    numerator
        * invert(&denominator)
            .unwrap_or_else(|| panic!("duplicate interpolation indices in {indices:?}"))
}
